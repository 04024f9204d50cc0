//! Time dependence of field amplitudes.
//!
//! A field's Rabi frequency is `rabi_freq * f(t)`, where `f` is one of the
//! [`TimeFunc`] envelopes below. In configuration files a function is named by
//! `rabi_freq_t_func` and parameterized by the `rabi_freq_t_args` map, e.g.
//! ```text
//! "rabi_freq_t_func": "gaussian",
//! "rabi_freq_t_args": { "ampl": 1.0, "centre": 0.0, "fwhm": 1.0 }
//! ```

use std::f64::consts::LN_2;
use indexmap::IndexMap;
use crate::error::{ ObError, Result };

/// Envelope of a field's Rabi frequency.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum TimeFunc {
    /// Constant unit amplitude. Used when no function is named.
    #[default]
    Ones,
    /// `ampl` between `on` and `off` (inclusive), zero elsewhere.
    Square { ampl: f64, on: f64, off: f64 },
    /// Gaussian pulse with full width at half maximum `fwhm`.
    Gaussian { ampl: f64, centre: f64, fwhm: f64 },
    /// Gaussian rise centred on `on`, then constant.
    RampOn { ampl: f64, on: f64, fwhm: f64 },
    /// Constant, then a Gaussian fall centred on `off`.
    RampOff { ampl: f64, off: f64, fwhm: f64 },
    /// Gaussian rise at `on`, constant, Gaussian fall at `off`.
    RampOnOff { ampl: f64, on: f64, off: f64, fwhm: f64 },
    /// Hyperbolic-secant pulse.
    Sech { ampl: f64, centre: f64, width: f64 },
    /// `ampl * sin(width t) / (width t)`.
    Sinc { ampl: f64, width: f64 },
}

fn gaussian(t: f64, centre: f64, fwhm: f64) -> f64 {
    (-4.0 * LN_2 * ((t - centre) / fwhm).powi(2)).exp()
}

fn get_arg(args: &IndexMap<String, f64>, func: &str, arg: &str)
    -> Result<f64>
{
    args.get(arg).copied()
        .filter(|x| x.is_finite())
        .ok_or_else(|| ObError::TimeFuncArg {
            func: func.to_string(),
            arg: arg.to_string(),
        })
}

fn get_width(args: &IndexMap<String, f64>, func: &str, arg: &str)
    -> Result<f64>
{
    let w = get_arg(args, func, arg)?;
    if w > 0.0 {
        Ok(w)
    } else {
        Err(ObError::TimeFuncArg { func: func.to_string(), arg: arg.to_string() })
    }
}

impl TimeFunc {
    /// Build a function from its configuration name and arguments.
    ///
    /// `None` gives [`Self::Ones`]. Unused arguments are ignored.
    pub fn from_name(name: Option<&str>, args: &IndexMap<String, f64>)
        -> Result<Self>
    {
        let Some(name) = name else { return Ok(Self::Ones); };
        let func = match name {
            "ones" => Self::Ones,
            "square" => Self::Square {
                ampl: get_arg(args, name, "ampl")?,
                on: get_arg(args, name, "on")?,
                off: get_arg(args, name, "off")?,
            },
            "gaussian" => Self::Gaussian {
                ampl: get_arg(args, name, "ampl")?,
                centre: get_arg(args, name, "centre")?,
                fwhm: get_width(args, name, "fwhm")?,
            },
            "ramp_on" => Self::RampOn {
                ampl: get_arg(args, name, "ampl")?,
                on: get_arg(args, name, "on")?,
                fwhm: get_width(args, name, "fwhm")?,
            },
            "ramp_off" => Self::RampOff {
                ampl: get_arg(args, name, "ampl")?,
                off: get_arg(args, name, "off")?,
                fwhm: get_width(args, name, "fwhm")?,
            },
            "ramp_onoff" => Self::RampOnOff {
                ampl: get_arg(args, name, "ampl")?,
                on: get_arg(args, name, "on")?,
                off: get_arg(args, name, "off")?,
                fwhm: get_width(args, name, "fwhm")?,
            },
            "sech" => Self::Sech {
                ampl: get_arg(args, name, "ampl")?,
                centre: get_arg(args, name, "centre")?,
                width: get_width(args, name, "width")?,
            },
            "sinc" => Self::Sinc {
                ampl: get_arg(args, name, "ampl")?,
                width: get_arg(args, name, "width")?,
            },
            other => { return Err(ObError::TimeFunc(other.to_string())); },
        };
        Ok(func)
    }

    /// Return the configuration name of the function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ones => "ones",
            Self::Square { .. } => "square",
            Self::Gaussian { .. } => "gaussian",
            Self::RampOn { .. } => "ramp_on",
            Self::RampOff { .. } => "ramp_off",
            Self::RampOnOff { .. } => "ramp_onoff",
            Self::Sech { .. } => "sech",
            Self::Sinc { .. } => "sinc",
        }
    }

    /// Return the arguments of the function, keyed as in configuration files.
    pub fn args(&self) -> IndexMap<String, f64> {
        let pairs: Vec<(&str, f64)> = match *self {
            Self::Ones => Vec::new(),
            Self::Square { ampl, on, off }
                => vec![("ampl", ampl), ("on", on), ("off", off)],
            Self::Gaussian { ampl, centre, fwhm }
                => vec![("ampl", ampl), ("centre", centre), ("fwhm", fwhm)],
            Self::RampOn { ampl, on, fwhm }
                => vec![("ampl", ampl), ("on", on), ("fwhm", fwhm)],
            Self::RampOff { ampl, off, fwhm }
                => vec![("ampl", ampl), ("off", off), ("fwhm", fwhm)],
            Self::RampOnOff { ampl, on, off, fwhm }
                => vec![("ampl", ampl), ("on", on), ("off", off), ("fwhm", fwhm)],
            Self::Sech { ampl, centre, width }
                => vec![("ampl", ampl), ("centre", centre), ("width", width)],
            Self::Sinc { ampl, width }
                => vec![("ampl", ampl), ("width", width)],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Evaluate the envelope at time `t`.
    pub fn eval(&self, t: f64) -> f64 {
        match *self {
            Self::Ones => 1.0,
            Self::Square { ampl, on, off } => {
                if (on..=off).contains(&t) { ampl } else { 0.0 }
            },
            Self::Gaussian { ampl, centre, fwhm } => {
                ampl * gaussian(t, centre, fwhm)
            },
            Self::RampOn { ampl, on, fwhm } => {
                if t < on { ampl * gaussian(t, on, fwhm) } else { ampl }
            },
            Self::RampOff { ampl, off, fwhm } => {
                if t > off { ampl * gaussian(t, off, fwhm) } else { ampl }
            },
            Self::RampOnOff { ampl, on, off, fwhm } => {
                if t < on {
                    ampl * gaussian(t, on, fwhm)
                } else if t > off {
                    ampl * gaussian(t, off, fwhm)
                } else {
                    ampl
                }
            },
            Self::Sech { ampl, centre, width } => {
                ampl / ((t - centre) / width).cosh()
            },
            Self::Sinc { ampl, width } => {
                let x = width * t;
                if x == 0.0 { ampl } else { ampl * x.sin() / x }
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn args(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn missing_name_is_unit_amplitude() {
        let f = TimeFunc::from_name(None, &IndexMap::new()).unwrap();
        assert_eq!(f, TimeFunc::Ones);
        assert_eq!(f.eval(-3.0), 1.0);
        assert_eq!(f.name(), "ones");
    }

    #[test]
    fn gaussian_is_half_max_at_half_fwhm() {
        let f = TimeFunc::from_name(
            Some("gaussian"),
            &args(&[("ampl", 2.0), ("centre", 1.0), ("fwhm", 0.5)]),
        ).unwrap();
        assert_relative_eq!(f.eval(1.0), 2.0);
        assert_relative_eq!(f.eval(1.25), 1.0, epsilon = 1e-12);
        assert_relative_eq!(f.eval(0.75), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn name_and_args_rebuild_the_function() {
        let f = TimeFunc::RampOnOff { ampl: 1.0, on: 0.5, off: 2.0, fwhm: 0.2 };
        let g = TimeFunc::from_name(Some(f.name()), &f.args()).unwrap();
        assert_eq!(f, g);
        assert!(TimeFunc::Ones.args().is_empty());
    }

    #[test]
    fn square_window_is_inclusive() {
        let f = TimeFunc::from_name(
            Some("square"),
            &args(&[("ampl", 3.0), ("on", 0.0), ("off", 1.0)]),
        ).unwrap();
        assert_eq!(f.eval(0.0), 3.0);
        assert_eq!(f.eval(1.0), 3.0);
        assert_eq!(f.eval(1.0 + 1e-9), 0.0);
        assert_eq!(f.eval(-1e-9), 0.0);
    }

    #[test]
    fn ramp_onoff_is_flat_between_ramps() {
        let f = TimeFunc::from_name(
            Some("ramp_onoff"),
            &args(&[("ampl", 1.0), ("on", 1.0), ("off", 3.0), ("fwhm", 0.4)]),
        ).unwrap();
        assert_eq!(f.eval(2.0), 1.0);
        assert_relative_eq!(f.eval(0.8), 0.5, epsilon = 1e-12);
        assert_relative_eq!(f.eval(3.2), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn sech_and_sinc_peak_values() {
        let sech = TimeFunc::from_name(
            Some("sech"),
            &args(&[("ampl", 1.5), ("centre", 2.0), ("width", 0.3)]),
        ).unwrap();
        assert_relative_eq!(sech.eval(2.0), 1.5);
        let sinc = TimeFunc::from_name(
            Some("sinc"),
            &args(&[("ampl", 1.0), ("width", 2.0)]),
        ).unwrap();
        assert_eq!(sinc.eval(0.0), 1.0);
        assert_relative_eq!(
            sinc.eval(std::f64::consts::FRAC_PI_2), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = TimeFunc::from_name(Some("triangle"), &IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, ObError::TimeFunc(name) if name == "triangle"));
    }

    #[test]
    fn missing_or_bad_argument_is_rejected() {
        let err = TimeFunc::from_name(
            Some("gaussian"), &args(&[("ampl", 1.0), ("centre", 0.0)]))
            .unwrap_err();
        assert!(matches!(err, ObError::TimeFuncArg { ref arg, .. } if arg == "fwhm"));
        let err = TimeFunc::from_name(
            Some("sech"),
            &args(&[("ampl", 1.0), ("centre", 0.0), ("width", 0.0)]),
        ).unwrap_err();
        assert!(matches!(err, ObError::TimeFuncArg { ref arg, .. } if arg == "width"));
    }
}
