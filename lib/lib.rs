#![allow(non_snake_case)]

//! Configuration and orchestration of optical-Bloch simulations of driven,
//! decaying multilevel atoms.
//!
//! An [`OBSolve`] holds a time grid, an [`OBAtom`], and a solver method, and
//! can be written to and read back from JSON:
//! ```no_run
//! use maxwell_bloch::OBSolve;
//!
//! let mut ob_solve = OBSolve::from_json("two_level.json")?;
//! ob_solve.solve(None, &[], false, true)?;
//! let rho = ob_solve.states_t();
//! # Ok::<(), maxwell_bloch::ObError>(())
//! ```

pub mod error;
pub mod hilbert;
pub mod t_funcs;
pub mod field;
pub mod dynamics;
pub mod rabi;
pub mod solver;
pub mod result;
pub mod ob_atom;
pub mod ob_solve;

pub use error::{ ObError, Result };
pub use field::{ Decay, Field };
pub use ob_atom::{ OBAtom, OBAtomParams };
pub use ob_solve::{ Method, OBSolve, OBSolveParams };
pub use result::ObResult;
pub use solver::{ MasterEquationSolver, Rk4Solver, SolverOptions };
