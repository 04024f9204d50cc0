//! Configuration and orchestration of a single optical-Bloch solve: a time
//! grid, an atom, and the solver method, with JSON (and TOML) persistence.

use std::{
    fmt,
    fs::{ self, File },
    io::{ BufWriter, Write },
    path::{ Path, PathBuf },
    str::FromStr,
};
use log::{ debug, info, warn };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use crate::{
    error::{ ObError, Result },
    ob_atom::{ OBAtom, OBAtomParams },
    rabi::Density,
    result::ObResult,
    solver::{ MasterEquationSolver, Rk4Solver, SolverOptions },
};

/// Solver method.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Lindblad master equation.
    #[default]
    Mesolve,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mesolve => "mesolve",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = ObError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mesolve" => Ok(Self::Mesolve),
            other => Err(ObError::Method(other.to_string())),
        }
    }
}

fn default_t_max() -> f64 { 1.0 }

fn default_t_steps() -> usize { 100 }

/// Configuration of an [`OBSolve`], as read from JSON or TOML.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OBSolveParams {
    #[serde(default)]
    pub ob_atom: OBAtomParams,
    #[serde(default)]
    pub t_min: f64,
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    #[serde(default = "default_t_steps")]
    pub t_steps: usize,
    #[serde(default)]
    pub method: Method,
    /// Accepted for compatibility and ignored; see [`OBSolve::build_opts`].
    #[serde(default)]
    pub opts: Value,
    #[serde(default)]
    pub savefile: Option<PathBuf>,
}

impl Default for OBSolveParams {
    fn default() -> Self {
        Self {
            ob_atom: OBAtomParams::default(),
            t_min: 0.0,
            t_max: default_t_max(),
            t_steps: default_t_steps(),
            method: Method::default(),
            opts: Value::Null,
            savefile: None,
        }
    }
}

/// Build a grid of `t_steps + 1` evenly spaced times from `t_min` to `t_max`,
/// inclusive at both ends.
///
/// The grid decreases if `t_max < t_min`. Fails if either bound is not finite
/// or if `t_steps` is zero.
pub fn time_grid(t_min: f64, t_max: f64, t_steps: usize)
    -> Result<nd::Array1<f64>>
{
    if !t_min.is_finite() || !t_max.is_finite() {
        return Err(ObError::TimeGrid(format!(
            "bounds must be finite, got [{}, {}]", t_min, t_max)));
    }
    if t_steps == 0 {
        return Err(ObError::TimeGrid("t_steps must be at least 1".to_string()));
    }
    let mut tlist: nd::Array1<f64>
        = if (t_max - t_min).is_finite() {
            nd::Array1::linspace(t_min, t_max, t_steps + 1)
        } else {
            // span overflows; weight the bounds separately
            let n = t_steps as f64;
            (0..=t_steps)
                .map(|k| {
                    let s = k as f64 / n;
                    t_min * (1.0 - s) + t_max * s
                })
                .collect()
        };
    tlist[0] = t_min;
    tlist[t_steps] = t_max;
    Ok(tlist)
}

fn opts_is_empty(opts: &Value) -> bool {
    match opts {
        Value::Null => true,
        Value::String(s) => s.trim() == "{}" || s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// An atom together with the time grid and method with which to solve its
/// master equation.
#[derive(Clone, Debug, PartialEq)]
pub struct OBSolve {
    ob_atom: OBAtom,
    t_min: f64,
    t_max: f64,
    t_steps: usize,
    tlist: nd::Array1<f64>,
    method: Method,
    opts: SolverOptions,
    savefile: Option<PathBuf>,
}

impl OBSolve {
    /// Create a new `OBSolve` from its configuration.
    pub fn new(params: OBSolveParams) -> Result<Self> {
        let OBSolveParams {
            ob_atom, t_min, t_max, t_steps, method, opts, savefile
        } = params;
        let mut new = Self {
            ob_atom: OBAtom::default(),
            t_min,
            t_max,
            t_steps,
            tlist: nd::Array1::zeros(0),
            method,
            opts: SolverOptions::default(),
            savefile: None,
        };
        new.build_ob_atom(ob_atom)?;
        new.build_tlist(t_min, t_max, t_steps)?;
        new.build_opts(&opts);
        new.build_savefile(savefile);
        Ok(new)
    }

    /// Replace the atom.
    pub fn build_ob_atom(&mut self, params: OBAtomParams) -> Result<&OBAtom> {
        self.ob_atom = OBAtom::new(params)?;
        Ok(&self.ob_atom)
    }

    /// Replace the time grid with `t_steps + 1` evenly spaced times from
    /// `t_min` to `t_max`; see [`time_grid`].
    ///
    /// Nothing is changed on failure.
    pub fn build_tlist(&mut self, t_min: f64, t_max: f64, t_steps: usize)
        -> Result<&nd::Array1<f64>>
    {
        let tlist = time_grid(t_min, t_max, t_steps)?;
        debug!(
            "time grid: {} points on [{}, {}]", tlist.len(), t_min, t_max);
        self.t_min = t_min;
        self.t_max = t_max;
        self.t_steps = t_steps;
        self.tlist = tlist;
        Ok(&self.tlist)
    }

    /// Install the default solver options.
    ///
    /// `opts` is not interpreted; a warning is logged if it is non-empty.
    pub fn build_opts(&mut self, opts: &Value) -> &SolverOptions {
        if !opts_is_empty(opts) {
            warn!("solver options are not configurable; ignoring {}", opts);
        }
        self.opts = SolverOptions::default();
        &self.opts
    }

    /// Set the path stem of the result cache.
    pub fn build_savefile(&mut self, savefile: Option<PathBuf>) {
        self.savefile = savefile;
    }

    pub fn ob_atom(&self) -> &OBAtom { &self.ob_atom }

    pub fn t_min(&self) -> f64 { self.t_min }

    pub fn t_max(&self) -> f64 { self.t_max }

    pub fn t_steps(&self) -> usize { self.t_steps }

    pub fn tlist(&self) -> &nd::Array1<f64> { &self.tlist }

    pub fn method(&self) -> Method { self.method }

    pub fn opts(&self) -> &SolverOptions { &self.opts }

    pub fn savefile(&self) -> Option<&Path> { self.savefile.as_deref() }

    /// Return the spacing of the time grid, `(t_max - t_min) / t_steps`.
    pub fn t_step(&self) -> f64 {
        (self.t_max - self.t_min) / self.t_steps as f64
    }

    /// Solve the atom's master equation over the time grid with the built-in
    /// [`Rk4Solver`].
    ///
    /// The initial state defaults to the ground state. If a savefile is set, a
    /// cached result is loaded when present unless `recalc` is true, and a new
    /// result is written to the cache. The result is owned by the atom.
    pub fn solve(
        &mut self,
        rho0: Option<Density>,
        e_ops: &[nd::Array2<C64>],
        recalc: bool,
        show_pbar: bool,
    ) -> Result<&ObResult>
    {
        self.solve_with(&Rk4Solver, rho0, e_ops, recalc, show_pbar)
    }

    /// Like [`Self::solve`], but with a caller-provided solver.
    pub fn solve_with<M>(
        &mut self,
        solver: &M,
        rho0: Option<Density>,
        e_ops: &[nd::Array2<C64>],
        recalc: bool,
        show_pbar: bool,
    ) -> Result<&ObResult>
    where M: MasterEquationSolver + ?Sized
    {
        match self.method {
            Method::Mesolve => self.ob_atom.mesolve_with(
                solver,
                &self.tlist,
                rho0,
                e_ops,
                &self.opts,
                recalc,
                self.savefile.as_deref(),
                show_pbar,
            ),
        }
    }

    /// Get the density matrices of the most recent solve, if any, with time
    /// along the last axis.
    pub fn states_t(&self) -> Option<&nd::Array3<C64>> {
        self.ob_atom.states_t()
    }

    /// Regenerate the configuration as a JSON value.
    ///
    /// `opts` is always the string `"{}"` and the savefile is not included.
    pub fn get_json_dict(&self) -> Result<Value> {
        Ok(json!({
            "ob_atom": self.ob_atom.get_json_dict()?,
            "t_min": self.t_min,
            "t_max": self.t_max,
            "t_steps": self.t_steps,
            "method": self.method.name(),
            "opts": "{}",
        }))
    }

    /// Serialize the configuration to a compact JSON string.
    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.get_json_dict()?)?)
    }

    /// Write the configuration to a JSON file with two-space indentation and
    /// sorted keys.
    pub fn to_json<P>(&self, path: P) -> Result<()>
    where P: AsRef<Path>
    {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut out, &self.get_json_dict()?)?;
        out.flush()?;
        Ok(())
    }

    /// Create a new `OBSolve` from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::new(serde_json::from_str(s)?)
    }

    /// Create a new `OBSolve` from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::new(toml::from_str(s)?)
    }

    /// Create a new `OBSolve` from a JSON file.
    ///
    /// If the file does not set `savefile`, the savefile is `path` with its
    /// extension removed.
    pub fn from_json<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let params: OBSolveParams = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::new(with_default_savefile(params, path))
    }

    /// Create a new `OBSolve` from a TOML file.
    ///
    /// If the file does not set `savefile`, the savefile is `path` with its
    /// extension removed.
    pub fn from_toml<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        let params: OBSolveParams = toml::from_str(&fs::read_to_string(path)?)?;
        Self::new(with_default_savefile(params, path))
    }

    /// Create a new `OBSolve` from a file, read as TOML if it has a `.toml`
    /// extension and JSON otherwise.
    pub fn from_file<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(path),
            _ => Self::from_json(path),
        }
    }
}

fn with_default_savefile(mut params: OBSolveParams, path: &Path)
    -> OBSolveParams
{
    if params.savefile.is_none() {
        let savefile = path.with_extension("");
        info!("savefile: {}", savefile.display());
        params.savefile = Some(savefile);
    }
    params
}

impl fmt::Display for OBSolve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ob_atom = self.ob_atom.get_json_dict()
            .map_err(|_| fmt::Error)?;
        write!(
            f,
            "OBSolve(ob_atom={}, t_min={}, t_max={}, t_steps={}, method={}, \
            opts={:?})",
            ob_atom, self.t_min, self.t_max, self.t_steps, self.method,
            self.opts,
        )
    }
}
