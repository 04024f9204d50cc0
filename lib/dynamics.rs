//! Constructs to calculate the Hamiltonian and decay rates of a driven
//! multilevel atom.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    field::{ Decay, Field },
    hilbert::{ Basis, sigma },
    t_funcs::TimeFunc,
};

/// A single drive, as its peak Rabi frequency, envelope, and coupling
/// operator.
#[derive(Clone, Debug)]
struct Drive {
    rabi_freq: f64,
    t_func: TimeFunc,
    coupling: nd::Array2<C64>,
}

/// Builds the time-dependent Hamiltonian
/// ```text
/// H(t) = H_0 + H_Δ + Σ_f Ω_f(t) / 2 · Σ_k c_k (|l_k⟩⟨u_k| + |u_k⟩⟨l_k|)
/// ```
/// for a set of fields acting on a basis, in the rotating frame.
#[derive(Clone, Debug)]
pub struct HBuilder<'a> {
    basis: &'a Basis<usize>,
    h_static: nd::Array2<C64>,
    drives: Vec<Drive>,
}

impl<'a> HBuilder<'a> {
    /// Create a new `HBuilder`.
    ///
    /// `t_funcs` holds the parsed envelope of each field and must have the same
    /// length as `fields`. Every level index in `fields` must be in `basis`.
    pub fn new(
        basis: &'a Basis<usize>,
        fields: &[Field],
        t_funcs: &[TimeFunc],
    ) -> Self
    {
        let h_static = Self::gen_static(basis, fields);
        let drives: Vec<Drive>
            = fields.iter().zip(t_funcs)
            .map(|(field, t_func)| Drive {
                rabi_freq: field.rabi_freq,
                t_func: *t_func,
                coupling: Self::gen_coupling(basis.num_states(), field),
            })
            .collect();
        Self { basis, h_static, drives }
    }

    /// Get a reference to the basis.
    pub fn basis(&self) -> &Basis<usize> { self.basis }

    /// Compute the time-independent part of the Hamiltonian: level energies
    /// plus detunings.
    ///
    /// Each field shifts each of its distinct upper levels by minus its signed
    /// detuning.
    pub fn gen_static(basis: &Basis<usize>, fields: &[Field])
        -> nd::Array2<C64>
    {
        let mut H = basis.energy_matrix();
        for field in fields.iter() {
            let delta = field.signed_detuning();
            for u in field.upper_levels().into_iter() {
                H[[u, u]] -= delta;
            }
        }
        H
    }

    /// Compute the Hermitian coupling operator of a single field at unit Rabi
    /// frequency, `Σ_k c_k (|l_k⟩⟨u_k| + |u_k⟩⟨l_k|)`.
    pub fn gen_coupling(n: usize, field: &Field) -> nd::Array2<C64> {
        let mut C: nd::Array2<C64> = nd::Array2::zeros((n, n));
        for (k, &[l, u]) in field.coupled_levels.iter().enumerate() {
            let c = field.factor(k);
            C[[l, u]] += c;
            C[[u, l]] += c;
        }
        C
    }

    /// Compute the Hamiltonian at time `t`.
    pub fn gen_at(&self, t: f64) -> nd::Array2<C64> {
        let mut H = self.h_static.clone();
        for drive in self.drives.iter() {
            let W = drive.rabi_freq * drive.t_func.eval(t);
            if W == 0.0 { continue; }
            H.scaled_add(C64::from(W / 2.0), &drive.coupling);
        }
        H
    }

    /// Compute the time-dependent Hamiltonian as a 3D array, with the last axis
    /// corresponding to time.
    pub fn gen(&self, time: &nd::Array1<f64>) -> nd::Array3<C64> {
        let n = self.basis.num_states();
        let mut H: nd::Array3<C64> = nd::Array3::zeros((n, n, time.len()));
        H.axis_iter_mut(nd::Axis(2))
            .zip(time.iter())
            .for_each(|(mut Hk, &tk)| { Hk.assign(&self.gen_at(tk)); });
        H
    }
}

/// Builds the decay rate coupling matrix from a set of decay processes.
#[derive(Clone, Debug)]
pub struct YBuilder<'a> {
    num_states: usize,
    decays: &'a [Decay],
}

impl<'a> YBuilder<'a> {
    /// Create a new `YBuilder`.
    pub fn new(num_states: usize, decays: &'a [Decay]) -> Self {
        Self { num_states, decays }
    }

    /// Compute the decay rate coupling matrix, whose `(l, u)`-th element is the
    /// total rate of decay from level `u` into level `l`.
    pub fn gen(&self) -> nd::Array2<f64> {
        let n = self.num_states;
        let mut Y: nd::Array2<f64> = nd::Array2::zeros((n, n));
        for decay in self.decays.iter() {
            for &[l, u] in decay.channels.iter() {
                Y[[l, u]] += decay.rate;
            }
        }
        Y
    }

    /// Compute the collapse operator `sqrt(rate) |l⟩⟨u|` of every decay
    /// channel.
    pub fn collapse_ops(&self) -> Vec<nd::Array2<C64>> {
        self.decays.iter()
            .flat_map(|decay| {
                let n = self.num_states;
                let amp = C64::from(decay.rate.sqrt());
                decay.channels.iter()
                    .map(move |&[l, u]| sigma(l, u, n) * amp)
            })
            .collect()
    }
}
