//! Driving fields and spontaneous decay channels of an atom.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ ObError, Result },
    t_funcs::TimeFunc,
};

/// A driving field coupling one or more pairs of levels.
///
/// Each entry of `coupled_levels` is a `[lower, upper]` pair of level indices.
/// The field's Rabi frequency, in units of angular frequency, is
/// `rabi_freq * f(t)` where `f` is named by `rabi_freq_t_func` (see
/// [`TimeFunc`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Field {
    pub label: String,
    pub coupled_levels: Vec<[usize; 2]>,
    /// Relative coupling strength of each pair; all 1 if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<Vec<f64>>,
    pub detuning: f64,
    /// Sign convention for `detuning` on the upper levels of this field.
    pub detuning_positive: bool,
    pub rabi_freq: f64,
    pub rabi_freq_t_func: Option<String>,
    pub rabi_freq_t_args: IndexMap<String, f64>,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            label: String::new(),
            coupled_levels: Vec::new(),
            factors: None,
            detuning: 0.0,
            detuning_positive: true,
            rabi_freq: 1.0,
            rabi_freq_t_func: None,
            rabi_freq_t_args: IndexMap::new(),
        }
    }
}

fn check_level(level: usize, num_states: usize, what: &str) -> Result<()> {
    if level < num_states {
        Ok(())
    } else {
        Err(ObError::Atom(format!(
            "{} refers to level {} but the atom has {} states",
            what, level, num_states,
        )))
    }
}

impl Field {
    /// Check the field against an atom with `num_states` levels and return its
    /// parsed time function.
    pub fn validate(&self, num_states: usize) -> Result<TimeFunc> {
        let what = format!("field '{}'", self.label);
        for &[lower, upper] in self.coupled_levels.iter() {
            check_level(lower, num_states, &what)?;
            check_level(upper, num_states, &what)?;
            if lower == upper {
                return Err(ObError::Atom(format!(
                    "{} couples level {} to itself", what, lower)));
            }
        }
        if let Some(factors) = &self.factors {
            if factors.len() != self.coupled_levels.len() {
                return Err(ObError::Atom(format!(
                    "{} has {} factors for {} coupled pairs",
                    what, factors.len(), self.coupled_levels.len(),
                )));
            }
            if !factors.iter().all(|f| f.is_finite()) {
                return Err(ObError::Atom(format!(
                    "{} has a non-finite factor", what)));
            }
        }
        if !self.detuning.is_finite() || !self.rabi_freq.is_finite() {
            return Err(ObError::Atom(format!(
                "{} has a non-finite detuning or Rabi frequency", what)));
        }
        TimeFunc::from_name(
            self.rabi_freq_t_func.as_deref(), &self.rabi_freq_t_args)
    }

    /// Coupling factor of the `k`-th level pair.
    pub fn factor(&self, k: usize) -> f64 {
        self.factors.as_ref()
            .and_then(|f| f.get(k).copied())
            .unwrap_or(1.0)
    }

    /// Signed detuning applied to each upper level.
    pub fn signed_detuning(&self) -> f64 {
        if self.detuning_positive { self.detuning } else { -self.detuning }
    }

    /// Distinct upper levels of all coupled pairs, in order of first
    /// appearance.
    pub fn upper_levels(&self) -> Vec<usize> {
        self.coupled_levels.iter().map(|[_, upper]| *upper).unique().collect()
    }
}

/// A spontaneous decay process with a single rate shared by all its channels.
///
/// Each entry of `channels` is a `[lower, upper]` pair; the population of
/// `upper` decays into `lower` at `rate`, in units of angular frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Decay {
    pub rate: f64,
    pub channels: Vec<[usize; 2]>,
}

impl Default for Decay {
    fn default() -> Self { Self { rate: 0.0, channels: Vec::new() } }
}

impl Decay {
    /// Check the decay against an atom with `num_states` levels.
    pub fn validate(&self, num_states: usize) -> Result<()> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(ObError::Atom(format!(
                "decay rate must be finite and non-negative, got {}",
                self.rate,
            )));
        }
        for &[lower, upper] in self.channels.iter() {
            check_level(lower, num_states, "decay channel")?;
            check_level(upper, num_states, "decay channel")?;
        }
        Ok(())
    }
}
