//! Lindblad master equation for a density matrix under a time-dependent
//! Hamiltonian and a fixed set of spontaneous decay rates.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::solver::SolverOptions;
use super::{ commutator, lindbladian, do_evolve_fn };

/// Compute the full right-hand side of the Lindblad master equation,
/// `-i [H, ρ] + L[ρ]`.
pub fn rhs(
    H: &nd::Array2<C64>,
    Y: &nd::Array2<f64>,
    rho: &nd::Array2<C64>,
) -> nd::Array2<C64> {
    commutator(H, rho) * (-C64::i()) + lindbladian(Y, rho)
}

/// Numerically integrate the Lindblad equation using fourth-order Runge-Kutta
/// for a time-dependent Hamiltonian.
///
/// `H` is evaluated at every sub-step and half sub-step; `Y` holds the decay
/// rates (see [`lindbladian`]). The returned array has time along its last
/// axis, with `rho0` at index 0. `progress` is called with the number of
/// completed intervals and the total after each interval of `t`.
pub fn evolve_fn<F, P>(
    rho0: &nd::Array2<C64>,
    H: F,
    Y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
    opts: &SolverOptions,
    progress: P,
) -> nd::Array3<C64>
where
    F: Fn(f64) -> nd::Array2<C64>,
    P: FnMut(usize, usize),
{
    let f = |H: &nd::Array2<C64>, rho: &nd::Array2<C64>| rhs(H, Y, rho);
    do_evolve_fn(rho0, H, f, t, opts, progress)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use num_traits::Zero;
    use crate::hilbert::sigma;

    #[test]
    fn free_decay_is_exponential() {
        let mut Y: nd::Array2<f64> = nd::Array2::zeros((2, 2));
        Y[[0, 1]] = 2.0;
        let rho0 = sigma(1, 1, 2);
        let t = nd::Array1::linspace(0.0, 1.5, 151);
        let rho = evolve_fn(
            &rho0,
            |_| nd::Array2::zeros((2, 2)),
            &Y,
            &t,
            &SolverOptions::default(),
            |_, _| { },
        );
        assert_eq!(rho.shape(), &[2, 2, 151]);
        for (k, &tk) in t.iter().enumerate() {
            assert_relative_eq!(rho[[1, 1, k]].re, (-2.0 * tk).exp(), epsilon = 1e-8);
            assert_relative_eq!(
                rho[[0, 0, k]].re + rho[[1, 1, k]].re, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn substeps_improve_accuracy() {
        // resonant Rabi oscillation: P1(t) = sin²(Ω t / 2)
        let W = 5.0;
        let H = (sigma(0, 1, 2) + sigma(1, 0, 2)) * C64::from(W / 2.0);
        let Y: nd::Array2<f64> = nd::Array2::zeros((2, 2));
        let rho0 = sigma(0, 0, 2);
        let t = nd::Array1::linspace(0.0, 2.0, 11);
        let err = |substeps: usize| -> f64 {
            let opts = SolverOptions { substeps, renormalize: false };
            let rho = evolve_fn(&rho0, |_| H.clone(), &Y, &t, &opts, |_, _| { });
            t.iter().enumerate()
                .map(|(k, tk)| (rho[[1, 1, k]].re - (W * tk / 2.0).sin().powi(2)).abs())
                .fold(0.0, f64::max)
        };
        assert!(err(50) < err(1));
        assert!(err(50) < 1e-6);
    }

    #[test]
    fn progress_reports_every_interval() {
        let Y: nd::Array2<f64> = nd::Array2::zeros((1, 1));
        let rho0: nd::Array2<C64> = nd::Array2::ones((1, 1));
        let t = nd::Array1::linspace(0.0, 1.0, 5);
        let mut calls: Vec<(usize, usize)> = Vec::new();
        let rho = evolve_fn(
            &rho0,
            |_| nd::Array2::zeros((1, 1)),
            &Y,
            &t,
            &SolverOptions::default(),
            |k, n| calls.push((k, n)),
        );
        assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        assert!(rho.iter().all(|z| (*z - C64::from(1.0)).is_zero()));
    }
}
