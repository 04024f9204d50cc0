//! An atom described by its levels, driving fields, and decays, which owns the
//! result of its most recent solve.

use std::path::{ Path, PathBuf };
use log::{ debug, info, warn };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    dynamics::{ HBuilder, YBuilder },
    error::{ ObError, Result },
    field::{ Decay, Field },
    hilbert::{ Basis, sigma },
    rabi::Density,
    result::ObResult,
    solver::{ MasterEquationSolver, Rk4Solver, SolverOptions },
    t_funcs::TimeFunc,
};

/// Configuration of an [`OBAtom`], as read from and written to JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OBAtomParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub num_states: usize,
    /// Level energies in units of angular frequency; all zero if empty.
    pub energies: Vec<f64>,
    pub decays: Vec<Decay>,
    pub fields: Vec<Field>,
}

impl Default for OBAtomParams {
    fn default() -> Self {
        Self {
            label: None,
            num_states: 1,
            energies: Vec::new(),
            decays: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Path of the result cache associated with a savefile.
pub fn cache_path(savefile: &Path) -> PathBuf {
    let mut path = savefile.as_os_str().to_owned();
    path.push(".npz");
    PathBuf::from(path)
}

// ways in which a loaded cache differs from the solve that requested it
fn cache_mismatches(result: &ObResult, n: usize, n_eops: usize, nt: usize)
    -> Vec<String>
{
    let mut msgs: Vec<String> = Vec::new();
    let n_cached = result.states().shape()[0];
    if n_cached != n {
        msgs.push(format!("has {} states; the atom has {}", n_cached, n));
    }
    if result.expect().nrows() != n_eops {
        msgs.push(format!(
            "has {} observables; {} were requested",
            result.expect().nrows(), n_eops,
        ));
    }
    if result.tlist().len() != nt {
        msgs.push(format!(
            "has {} time points; the current grid has {}",
            result.tlist().len(), nt,
        ));
    }
    msgs
}

/// A multilevel atom driven by classical fields and subject to spontaneous
/// decay.
#[derive(Clone, Debug, PartialEq)]
pub struct OBAtom {
    params: OBAtomParams,
    basis: Basis<usize>,
    t_funcs: Vec<TimeFunc>,
    result: Option<ObResult>,
}

impl Default for OBAtom {
    fn default() -> Self {
        let params = OBAtomParams::default();
        let basis: Basis<usize>
            = (0..params.num_states).map(|k| (k, 0.0)).collect();
        Self { params, basis, t_funcs: Vec::new(), result: None }
    }
}

impl OBAtom {
    /// Create a new atom, checking that its description is consistent.
    pub fn new(params: OBAtomParams) -> Result<Self> {
        let n = params.num_states;
        if n == 0 {
            return Err(ObError::Atom("num_states must be at least 1".to_string()));
        }
        if !params.energies.is_empty() && params.energies.len() != n {
            return Err(ObError::Atom(format!(
                "{} energies given for {} states", params.energies.len(), n)));
        }
        if !params.energies.iter().all(|e| e.is_finite()) {
            return Err(ObError::Atom("energies must be finite".to_string()));
        }
        params.decays.iter()
            .try_for_each(|decay| decay.validate(n))?;
        let t_funcs: Vec<TimeFunc>
            = params.fields.iter()
            .map(|field| field.validate(n))
            .collect::<Result<_>>()?;
        let basis: Basis<usize>
            = (0..n)
            .map(|k| (k, params.energies.get(k).copied().unwrap_or(0.0)))
            .collect();
        debug!(
            "built {}-level atom with {} fields and {} decays",
            n, params.fields.len(), params.decays.len(),
        );
        Ok(Self { params, basis, t_funcs, result: None })
    }

    /// Get a reference to the atom's configuration.
    pub fn params(&self) -> &OBAtomParams { &self.params }

    pub fn label(&self) -> Option<&str> { self.params.label.as_deref() }

    pub fn num_states(&self) -> usize { self.basis.num_states() }

    pub fn basis(&self) -> &Basis<usize> { &self.basis }

    pub fn energies(&self) -> Vec<f64> { self.basis.values().copied().collect() }

    pub fn decays(&self) -> &[Decay] { &self.params.decays }

    pub fn fields(&self) -> &[Field] { &self.params.fields }

    /// Get the parsed envelope of each field.
    pub fn t_funcs(&self) -> &[TimeFunc] { &self.t_funcs }

    /// Return the operator `|i⟩⟨j|`, if both levels exist.
    pub fn sigma(&self, i: usize, j: usize) -> Option<nd::Array2<C64>> {
        let n = self.num_states();
        (i < n && j < n).then(|| sigma(i, j, n))
    }

    /// Return the density matrix of level 0, used as the default initial state.
    pub fn ground_state(&self) -> nd::Array2<C64> {
        sigma(0, 0, self.num_states())
    }

    /// Get a Hamiltonian builder for the atom.
    pub fn hbuilder(&self) -> HBuilder<'_> {
        HBuilder::new(&self.basis, &self.params.fields, &self.t_funcs)
    }

    /// Compute the decay rate coupling matrix.
    pub fn decay_matrix(&self) -> nd::Array2<f64> {
        YBuilder::new(self.num_states(), &self.params.decays).gen()
    }

    /// Compute the collapse operator of every decay channel.
    pub fn c_ops(&self) -> Vec<nd::Array2<C64>> {
        YBuilder::new(self.num_states(), &self.params.decays).collapse_ops()
    }

    /// Get the result of the most recent solve, if any.
    pub fn result(&self) -> Option<&ObResult> { self.result.as_ref() }

    /// Get the density matrices of the most recent solve, if any, with time
    /// along the last axis.
    pub fn states_t(&self) -> Option<&nd::Array3<C64>> {
        self.result.as_ref().map(|res| res.states())
    }

    /// Regenerate the atom's configuration as a JSON value.
    pub fn get_json_dict(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.params)?)
    }

    /// Solve the master equation with the built-in [`Rk4Solver`].
    ///
    /// See [`Self::mesolve_with`].
    #[allow(clippy::too_many_arguments)]
    pub fn mesolve(
        &mut self,
        tlist: &nd::Array1<f64>,
        rho0: Option<Density>,
        e_ops: &[nd::Array2<C64>],
        opts: &SolverOptions,
        recalc: bool,
        savefile: Option<&Path>,
        show_pbar: bool,
    ) -> Result<&ObResult>
    {
        self.mesolve_with(
            &Rk4Solver, tlist, rho0, e_ops, opts, recalc, savefile, show_pbar)
    }

    /// Solve the master equation over `tlist`, starting from `rho0` (the ground
    /// state if `None`), and compute the expectation values of `e_ops`.
    ///
    /// If `savefile` is given, `<savefile>.npz` exists, and `recalc` is false,
    /// the cached result is loaded instead of solving. Otherwise the solve is
    /// performed and, if `savefile` is given, written to the cache. The result
    /// is stored on the atom and returned.
    #[allow(clippy::too_many_arguments)]
    pub fn mesolve_with<M>(
        &mut self,
        solver: &M,
        tlist: &nd::Array1<f64>,
        rho0: Option<Density>,
        e_ops: &[nd::Array2<C64>],
        opts: &SolverOptions,
        recalc: bool,
        savefile: Option<&Path>,
        show_pbar: bool,
    ) -> Result<&ObResult>
    where M: MasterEquationSolver + ?Sized
    {
        let n = self.num_states();
        if let Some(k) = e_ops.iter().position(|op| op.shape() != [n, n]) {
            return Err(ObError::Observable(k));
        }
        let cache = savefile.map(cache_path);

        if let Some(path) = cache.as_ref().filter(|p| !recalc && p.is_file()) {
            let result = ObResult::load(path)?;
            info!("loaded cached result from {}", path.display());
            cache_mismatches(&result, n, e_ops.len(), tlist.len())
                .into_iter()
                .for_each(|msg| { warn!("cached result {}", msg); });
            return Ok(self.result.insert(result));
        }

        let rho0: nd::Array2<C64>
            = match rho0 {
                Some(density) => density.into_array(&self.basis)
                    .ok_or(ObError::InitialState)?,
                None => self.ground_state(),
            };
        let hbuilder = self.hbuilder();
        let decay = self.decay_matrix();
        let mut last_decile: usize = 0;
        let mut progress = |k: usize, total: usize| {
            if !show_pbar || total == 0 { return; }
            let decile = 10 * k / total;
            if decile > last_decile || k == total {
                last_decile = decile;
                info!("mesolve: {:3}% ({}/{})", 100 * k / total, k, total);
            }
        };
        debug!("solving over {} time points", tlist.len());
        let states = solver.evolve(
            &rho0,
            &|t: f64| hbuilder.gen_at(t),
            &decay,
            tlist,
            opts,
            &mut progress,
        )?;
        let result = ObResult::new(tlist.clone(), states, e_ops);

        if let Some(path) = cache.as_ref() {
            result.save(path)?;
            info!("saved result to {}", path.display());
        }
        Ok(self.result.insert(result))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn two_level(rabi_freq: f64, rate: f64) -> OBAtom {
        let params = OBAtomParams {
            num_states: 2,
            decays: vec![Decay { rate, channels: vec![[0, 1]] }],
            fields: vec![Field {
                label: "drive".to_string(),
                coupled_levels: vec![[0, 1]],
                rabi_freq,
                ..Default::default()
            }],
            ..Default::default()
        };
        OBAtom::new(params).unwrap()
    }

    #[test]
    fn default_params_build_default_atom() {
        let atom = OBAtom::new(OBAtomParams::default()).unwrap();
        assert_eq!(atom, OBAtom::default());
        assert_eq!(atom.num_states(), 1);
        assert_eq!(atom.energies(), vec![0.0]);
    }

    #[test]
    fn empty_json_is_default() {
        let params: OBAtomParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, OBAtomParams::default());
    }

    #[test]
    fn inconsistent_params_are_rejected() {
        let params = OBAtomParams { num_states: 0, ..Default::default() };
        assert!(matches!(OBAtom::new(params), Err(ObError::Atom(_))));
        let params = OBAtomParams {
            num_states: 2,
            energies: vec![0.0, 1.0, 2.0],
            ..Default::default()
        };
        assert!(matches!(OBAtom::new(params), Err(ObError::Atom(_))));
        let params = OBAtomParams {
            num_states: 2,
            fields: vec![Field {
                coupled_levels: vec![[0, 1]],
                rabi_freq_t_func: Some("gaussian".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(OBAtom::new(params), Err(ObError::TimeFuncArg { .. })));
    }

    #[test]
    fn sigma_checks_bounds() {
        let atom = two_level(1.0, 0.0);
        assert!(atom.sigma(1, 0).is_some());
        assert!(atom.sigma(2, 0).is_none());
        assert_eq!(atom.ground_state()[[0, 0]], C64::from(1.0));
    }

    #[test]
    fn mesolve_stores_result() {
        let mut atom = two_level(0.0, 1.0);
        assert!(atom.result().is_none());
        let tlist = nd::Array1::linspace(0.0, 1.0, 101);
        let rho0 = Density::Single(1);
        let e_ops = vec![sigma(1, 1, 2)];
        let res = atom.mesolve(
            &tlist, Some(rho0), &e_ops, &SolverOptions::default(),
            false, None, false,
        ).unwrap();
        assert_relative_eq!(
            res.expect()[[0, 100]].re, (-1.0_f64).exp(), epsilon = 1e-8);
        assert_eq!(atom.states_t().unwrap().shape(), &[2, 2, 101]);
    }

    #[test]
    fn bad_inputs_are_rejected_before_solving() {
        let mut atom = two_level(1.0, 0.0);
        let tlist = nd::Array1::linspace(0.0, 1.0, 11);
        let opts = SolverOptions::default();
        let e_ops = vec![sigma(0, 0, 2), sigma(0, 0, 3)];
        let res = atom.mesolve(&tlist, None, &e_ops, &opts, false, None, false);
        assert!(matches!(res, Err(ObError::Observable(1))));
        let res = atom.mesolve(
            &tlist, Some(Density::Single(5)), &[], &opts, false, None, false);
        assert!(matches!(res, Err(ObError::InitialState)));
        assert!(atom.result().is_none());
    }

    #[test]
    fn mismatched_cache_is_detected() {
        let tlist = nd::Array1::linspace(0.0, 1.0, 5);
        let states: nd::Array3<C64> = nd::Array3::zeros((2, 2, 5));
        let cached = ObResult::new(tlist, states, &[sigma(0, 0, 2)]);
        assert!(cache_mismatches(&cached, 2, 1, 5).is_empty());
        let msgs = cache_mismatches(&cached, 3, 2, 7);
        assert_eq!(msgs.len(), 3);
        assert!(msgs[0].contains("2 states"));
        assert!(msgs[1].contains("1 observables"));
        assert!(msgs[2].contains("5 time points"));
    }

    #[test]
    fn cache_path_appends_suffix() {
        assert_eq!(
            cache_path(Path::new("out/run.v2")),
            PathBuf::from("out/run.v2.npz"),
        );
    }

    #[test]
    fn json_dict_skips_missing_label() {
        let atom = two_level(1.0, 0.5);
        let json = atom.get_json_dict().unwrap();
        assert!(json.get("label").is_none());
        assert_eq!(json["num_states"], 2);
        assert_eq!(json["decays"][0]["rate"], 0.5);
        assert!(atom.label().is_none());
        let c_ops = atom.c_ops();
        assert_eq!(c_ops.len(), 1);
        assert_eq!(c_ops[0][[0, 1]], C64::from(0.5_f64.sqrt()));
        assert_eq!(atom.decay_matrix()[[0, 1]], 0.5);
    }
}
