//! The seam between solve orchestration and numerical integration.
//!
//! [`OBAtom::mesolve_with`][crate::ob_atom::OBAtom::mesolve_with] accepts any
//! [`MasterEquationSolver`]; [`Rk4Solver`] is the built-in default.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ ObError, Result },
    rabi::lindblad,
};

/// Options passed to a master equation solver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SolverOptions {
    /// Number of integration steps taken per interval of the time grid.
    pub substeps: usize,
    /// Renormalize the trace of the density matrix after every step.
    pub renormalize: bool,
}

impl Default for SolverOptions {
    fn default() -> Self { Self { substeps: 1, renormalize: true } }
}

/// Integrates the Lindblad master equation over a time grid.
pub trait MasterEquationSolver {
    /// Evolve `rho0` under the Hamiltonian `hamiltonian(t)` and decay-rate
    /// matrix `decay` (see [`lindbladian`][crate::rabi::lindbladian]),
    /// returning the density matrix at every point of `tlist` with time along
    /// the last axis.
    ///
    /// `progress` receives the number of completed grid intervals and their
    /// total.
    fn evolve(
        &self,
        rho0: &nd::Array2<C64>,
        hamiltonian: &dyn Fn(f64) -> nd::Array2<C64>,
        decay: &nd::Array2<f64>,
        tlist: &nd::Array1<f64>,
        opts: &SolverOptions,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<nd::Array3<C64>>;
}

/// Fixed-step fourth-order Runge-Kutta integration.
#[derive(Copy, Clone, Debug, Default)]
pub struct Rk4Solver;

impl MasterEquationSolver for Rk4Solver {
    fn evolve(
        &self,
        rho0: &nd::Array2<C64>,
        hamiltonian: &dyn Fn(f64) -> nd::Array2<C64>,
        decay: &nd::Array2<f64>,
        tlist: &nd::Array1<f64>,
        opts: &SolverOptions,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<nd::Array3<C64>>
    {
        let n = rho0.nrows();
        if rho0.ncols() != n {
            return Err(ObError::Solver(
                format!("initial state has shape {:?}", rho0.shape())));
        }
        if decay.shape() != [n, n] {
            return Err(ObError::Solver(format!(
                "decay matrix has shape {:?} for a {}-level system",
                decay.shape(), n,
            )));
        }
        if tlist.is_empty() {
            return Err(ObError::Solver("empty time grid".to_string()));
        }
        if opts.substeps == 0 {
            return Err(ObError::Solver("substeps must be at least 1".to_string()));
        }
        let rho = lindblad::evolve_fn(
            rho0, hamiltonian, decay, tlist, opts, progress);
        if rho.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
            Ok(rho)
        } else {
            Err(ObError::Solver("integration diverged".to_string()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_mismatched_inputs() {
        let rho0: nd::Array2<C64> = nd::Array2::eye(2);
        let h = |_: f64| nd::Array2::<C64>::zeros((2, 2));
        let t = nd::Array1::linspace(0.0, 1.0, 3);
        let bad_decay: nd::Array2<f64> = nd::Array2::zeros((3, 3));
        let res = Rk4Solver.evolve(
            &rho0, &h, &bad_decay, &t, &SolverOptions::default(), &mut |_, _| { });
        assert!(matches!(res, Err(ObError::Solver(_))));

        let decay: nd::Array2<f64> = nd::Array2::zeros((2, 2));
        let opts = SolverOptions { substeps: 0, ..Default::default() };
        let res = Rk4Solver.evolve(&rho0, &h, &decay, &t, &opts, &mut |_, _| { });
        assert!(matches!(res, Err(ObError::Solver(_))));

        let empty: nd::Array1<f64> = nd::Array1::zeros(0);
        let res = Rk4Solver.evolve(
            &rho0, &h, &decay, &empty, &SolverOptions::default(), &mut |_, _| { });
        assert!(matches!(res, Err(ObError::Solver(_))));
    }

    #[test]
    fn single_point_grid_returns_initial_state() {
        let rho0: nd::Array2<C64> = nd::Array2::eye(2) * C64::from(0.5);
        let h = |_: f64| nd::Array2::<C64>::eye(2);
        let decay: nd::Array2<f64> = nd::Array2::zeros((2, 2));
        let t = nd::array![0.0];
        let rho = Rk4Solver.evolve(
            &rho0, &h, &decay, &t, &SolverOptions::default(), &mut |_, _| { })
            .unwrap();
        assert_eq!(rho.shape(), &[2, 2, 1]);
        assert_eq!(rho.index_axis(nd::Axis(2), 0), rho0);
    }

    #[test]
    fn divergence_is_reported() {
        let rho0: nd::Array2<C64> = nd::Array2::eye(1);
        let h = |_: f64| nd::Array2::<C64>::zeros((1, 1));
        let mut decay: nd::Array2<f64> = nd::Array2::zeros((1, 1));
        decay[[0, 0]] = f64::INFINITY;
        let t = nd::Array1::linspace(0.0, 1.0, 3);
        let res = Rk4Solver.evolve(
            &rho0, &h, &decay, &t, &SolverOptions::default(), &mut |_, _| { });
        assert!(matches!(res, Err(ObError::Solver(_))));
    }
}
