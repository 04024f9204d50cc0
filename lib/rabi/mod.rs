//! Density matrices and numerical integration of the Lindblad equation.
//!
//! Where unspecified, the last index of a 3D array corresponds to time, all
//! Hamiltonians and decay rates are in units of angular frequency, and
//! integration is via fourth-order Runge-Kutta.

use std::hash::Hash;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::{
    hilbert::{ Basis, outer_prod },
    solver::SolverOptions,
};

pub mod lindblad;

/// Tolerance used when checking that a user-supplied matrix is Hermitian.
const HERMITIAN_TOL: f64 = 1e-12;

/// Compute the trace of a square matrix.
pub fn trace<S>(a: &nd::ArrayBase<S, nd::Ix2>) -> C64
where S: nd::Data<Elem = C64>
{
    a.diag().sum()
}

fn is_hermitian(a: &nd::Array2<C64>) -> bool {
    a.iter().zip(a.t().iter())
        .all(|(aij, aji)| (*aij - aji.conj()).norm() <= HERMITIAN_TOL)
}

/// Different descriptions for an initial density matrix, convertible to the
/// standard 2D complex-valued array representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Density {
    /// A single level, by index.
    Single(usize),
    /// A pre-constructed array. Will be renormalized.
    Array(nd::Array2<C64>),
    /// A pure state vector. Will be renormalized.
    Pure(nd::Array1<C64>),
    /// A classical mixture of levels given by their relative populations. Will
    /// be renormalized.
    Mixed(nd::Array1<f64>),
}

impl From<usize> for Density {
    fn from(level: usize) -> Self { Self::Single(level) }
}

impl From<nd::Array2<C64>> for Density {
    fn from(a: nd::Array2<C64>) -> Self { Self::Array(a) }
}

impl From<nd::Array1<C64>> for Density {
    fn from(psi: nd::Array1<C64>) -> Self { Self::Pure(psi) }
}

impl Density {
    /// Convert to a 2D complex-valued array, if possible.
    ///
    /// The following conditions must be met by the resulting array:
    /// - must be square with dimension equal to the size of `basis`
    /// - must have all real, non-negative main-diagonal elements
    /// - must have trace not equal to zero
    /// - must be Hermitian
    pub fn into_array<S>(self, basis: &Basis<S>) -> Option<nd::Array2<C64>>
    where S: Clone + Eq + Hash
    {
        let n = basis.num_states();
        match self {
            Self::Single(k) => basis.get_density_index(k),
            Self::Array(a) => {
                let norm = trace(&a);
                (
                    a.shape() == [n, n]
                    && a.diag().iter()
                        .all(|p| p.im.abs() <= HERMITIAN_TOL && p.re >= 0.0)
                    && norm != C64::zero()
                    && is_hermitian(&a)
                )
                .then_some(a)
                .map(|a| a / norm)
            },
            Self::Pure(psi) => {
                let norm: f64
                    = psi.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
                (psi.len() == n && norm > 0.0).then_some(psi)
                    .map(|psi| psi.mapv(|a| a / norm))
                    .map(|psi| outer_prod(&psi, &psi))
            },
            Self::Mixed(p) => {
                let total: f64 = p.sum();
                (
                    p.len() == n
                    && p.iter().all(|x| x.is_finite() && *x >= 0.0)
                    && total > 0.0
                )
                .then(|| nd::Array2::from_diag(&p.mapv(|x| C64::from(x / total))))
            },
        }
    }
}

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the dissipative part of the RHS of the Lindblad master equation.
///
/// Assumes that `Y` and `rho` are both square, and that every collapse
/// operator has the form `sqrt(y) |a⟩⟨b|`, so that the system's decay rates
/// are characterized by a single matrix `Y` whose `(a, b)`-th element is the
/// total decay rate from the `b`-th level into the `a`-th level.
pub fn lindbladian<SA, SB>(
    Y: &nd::ArrayBase<SA, nd::Ix2>,
    rho: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = C64>,
{
    let mut L: nd::Array2<C64> = nd::Array2::zeros(rho.raw_dim());
    let z = C64::zero();
    for ((a, b), &y) in Y.indexed_iter() {
        if y.abs() <= f64::EPSILON { continue; }
        for ((i, j), l) in L.indexed_iter_mut() {
            *l += y * (
                if i == a && j == a { rho[[b, b]] } else { z }
                - if i == b { rho[[i, j]] / 2.0 } else { z }
                - if j == b { rho[[i, j]] / 2.0 } else { z }
            );
        }
    }
    L
}

// fourth-order Runge-Kutta for a time-dependent Hamiltonian given by a
// function, with `opts.substeps` integration steps per interval of `t`
pub(crate) fn do_evolve_fn<H, F, P>(
    z0: &nd::Array2<C64>,
    h: H,
    rhs: F,
    t: &nd::Array1<f64>,
    opts: &SolverOptions,
    mut progress: P,
) -> nd::Array3<C64>
where
    H: Fn(f64) -> nd::Array2<C64>,
    F: Fn(&nd::Array2<C64>, &nd::Array2<C64>) -> nd::Array2<C64>,
    P: FnMut(usize, usize),
{
    let n = t.len();
    let substeps = opts.substeps.max(1);
    let mut z: nd::Array3<C64>
        = nd::Array3::zeros((z0.nrows(), z0.ncols(), n));
    if n == 0 { return z; }
    z.slice_mut(s![.., .., 0]).assign(z0);
    let mut z_old: nd::Array2<C64> = z0.clone();
    let mut hk: nd::Array2<C64>;
    let mut hkp1h: nd::Array2<C64>;
    let mut hkp1: nd::Array2<C64>;
    let mut k1: nd::Array2<C64>;
    let mut k2: nd::Array2<C64>;
    let mut k3: nd::Array2<C64>;
    let mut k4: nd::Array2<C64>;
    let mut z_new: nd::Array2<C64>;
    let mut norm: C64;
    let iter = t.iter().zip(t.iter().skip(1)).enumerate();
    for (k, (&tk, &tkp1)) in iter {
        let dt = (tkp1 - tk) / substeps as f64;
        for m in 0..substeps {
            let tm = tk + m as f64 * dt;
            hk = h(tm);
            hkp1h = h(tm + dt / 2.0);
            hkp1 = h(tm + dt);
            k1 = rhs(&hk, &z_old);
            k2 = rhs(&hkp1h, &(&z_old + &(&k1 * (dt / 2.0))));
            k3 = rhs(&hkp1h, &(&z_old + &(&k2 * (dt / 2.0))));
            k4 = rhs(&hkp1, &(&z_old + &(&k3 * dt)));
            z_new = &z_old + &((k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0));
            if opts.renormalize {
                norm = trace(&z_new);
                if norm != C64::zero() { z_new /= norm; }
            }
            z_old = z_new;
        }
        z.slice_mut(s![.., .., k + 1]).assign(&z_old);
        progress(k + 1, n - 1);
    }
    z
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use crate::hilbert::sigma;

    fn basis(n: usize) -> Basis<usize> {
        (0..n).map(|k| (k, 0.0)).collect()
    }

    fn dagger(a: &nd::Array2<C64>) -> nd::Array2<C64> {
        a.t().mapv(|z| z.conj())
    }

    #[test]
    fn single_level_density() {
        let rho = Density::Single(1).into_array(&basis(3)).unwrap();
        assert_eq!(rho, nd::Array2::from_diag(
            &nd::array![C64::zero(), C64::from(1.0), C64::zero()]));
        assert!(Density::Single(3).into_array(&basis(3)).is_none());
    }

    #[test]
    fn pure_state_is_normalized() {
        let psi: nd::Array1<C64> = nd::array![C64::from(1.0), C64::new(0.0, 1.0)];
        let rho = Density::Pure(psi).into_array(&basis(2)).unwrap();
        assert_relative_eq!(trace(&rho).re, 1.0, epsilon = 1e-15);
        assert_relative_eq!(rho[[0, 1]].im, -0.5, epsilon = 1e-15);
        assert_relative_eq!(rho[[1, 0]].im, 0.5, epsilon = 1e-15);
    }

    #[test]
    fn mixed_populations_are_normalized() {
        let rho = Density::Mixed(nd::array![1.0, 3.0])
            .into_array(&basis(2)).unwrap();
        assert_eq!(rho[[0, 0]], C64::from(0.25));
        assert_eq!(rho[[1, 1]], C64::from(0.75));
        assert!(Density::Mixed(nd::array![1.0, -1.0, 1.0])
            .into_array(&basis(3)).is_none());
    }

    #[test]
    fn invalid_arrays_are_rejected() {
        let mut a: nd::Array2<C64> = nd::Array2::zeros((2, 2));
        assert!(Density::Array(a.clone()).into_array(&basis(2)).is_none());
        a[[0, 0]] = C64::from(2.0);
        a[[0, 1]] = C64::new(0.0, 1.0);
        assert!(Density::Array(a.clone()).into_array(&basis(2)).is_none());
        a[[1, 0]] = C64::new(0.0, -1.0);
        let rho = Density::Array(a.clone()).into_array(&basis(2)).unwrap();
        assert_eq!(rho[[0, 0]], C64::from(1.0));
        assert!(Density::Array(a).into_array(&basis(3)).is_none());
    }

    #[test]
    fn lindbladian_matches_collapse_operators() {
        // three-level cascade with decays 2 -> 1, 2 -> 0, 1 -> 0 and a
        // dephasing channel on level 1
        let channels = [(2, 1, 0.7), (2, 0, 0.2), (1, 0, 1.3), (1, 1, 0.4)];
        let mut Y: nd::Array2<f64> = nd::Array2::zeros((3, 3));
        for &(from, to, y) in channels.iter() { Y[[to, from]] += y; }

        let psi: nd::Array1<C64>
            = nd::array![C64::new(0.3, 0.1), C64::new(-0.5, 0.4), C64::from(0.6)];
        let rho = outer_prod(&psi, &psi)
            + nd::Array2::from_diag(&nd::array![
                C64::from(0.1), C64::from(0.2), C64::from(0.3)]);

        let mut expected: nd::Array2<C64> = nd::Array2::zeros((3, 3));
        for &(from, to, y) in channels.iter() {
            let c = sigma(to, from, 3) * C64::from(y.sqrt());
            let cd = dagger(&c);
            let cdc = cd.dot(&c);
            expected = expected + c.dot(&rho).dot(&cd)
                - (cdc.dot(&rho) + rho.dot(&cdc)) * 0.5;
        }
        let L = lindbladian(&Y, &rho);
        for (l, e) in L.iter().zip(expected.iter()) {
            assert_relative_eq!(l.re, e.re, epsilon = 1e-12);
            assert_relative_eq!(l.im, e.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn commutator_of_pauli_matrices() {
        let sx = sigma(0, 1, 2) + sigma(1, 0, 2);
        let sz = sigma(0, 0, 2) - sigma(1, 1, 2);
        let c = commutator(&sx, &sz);
        // [σx, σz] = -2i σy
        assert_eq!(c[[0, 1]], C64::from(-2.0));
        assert_eq!(c[[1, 0]], C64::from(2.0));
    }
}
