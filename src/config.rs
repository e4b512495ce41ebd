use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GpwError, Result};
use crate::mos_model::admittance::FluctuationMethod;
use crate::mos_model::physics::constant::ZERO_CELSIUS;
use crate::mos_model::physics::interface_traps::{CaptureCrossSection, DitModel};
use crate::mos_model::physics::semiconductor::band_gap;

pub const GPW_FILENAME: &str = "data/gpw.csv"; // outfile
pub const DATA_FILENAME: &str = "data/data.csv";
pub const PARAM_FILENAME: &str = "data/param.csv";
pub const USVG_FILENAME: &str = "data/usvg.csv";

pub const TEMPERATURE: f64 = 21.0; // T [°C]

pub const DOPING: f64 = 1e16; // nd [cm^-3], n-type
pub const T_OXIDE: f64 = 20e-7; // tox [cm]
pub const FIXED_CHARGE: f64 = 1e12; // qfbar [cm^-2]
pub const SIGMA_QF_RATIO: f64 = 0.2; // sigqf = 0.2 * qfbar

pub const TUNNEL_WIDTH: f64 = 0.0; // wtunnel [cm]

pub const N_FREQ: usize = 151; // nfreq
pub const START_FREQ: f64 = 1e-3; // fstart [Hz]
pub const POINTS_PER_DECADE: usize = 10;

pub const N_ET: usize = 11; // nufs
pub const ET_MIN: f64 = 0.2; // etmin [eV below Ec]
pub const ET_MAX: f64 = 0.8; // etmax [eV below Ec]

pub const DIT_MIDGAP: f64 = 0.0; // dmin [cm^-2 eV^-1]
pub const DIT_C0: f64 = 8.48e6; // dc0
pub const DIT_BETA_C: f64 = 0.207; // betac [eV]
pub const DIT_V0: f64 = 8.48e6; // dv0
pub const DIT_BETA_V: f64 = 0.207; // betav [eV]
pub const DIT_DA: u8 = 1; // da

pub const SIGN_MAX: f64 = 1e12; // signmax [cm^2]
pub const SIGN_CB0: f64 = 1e-16; // signcb0 [cm^2]
pub const SIGN_GAMMA_CB: f64 = 0.0; // gammacb [eV]
pub const SIGN_VB0: f64 = 1e-16; // signvb0 [cm^2]
pub const SIGN_GAMMA_VB: f64 = 0.0; // gammavb [eV]

pub const ENERGY_STEP: f64 = 0.002; // [eV]
pub const MIN_ENERGY_STEP: f64 = 1e-5; // [eV]

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    #[serde(alias = "outfile")]
    pub gpw: PathBuf,
    pub data: PathBuf,
    pub param: PathBuf,
    pub usvg: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            gpw: PathBuf::from(GPW_FILENAME),
            data: PathBuf::from(DATA_FILENAME),
            param: PathBuf::from(PARAM_FILENAME),
            usvg: PathBuf::from(USVG_FILENAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencySweep {
    #[serde(alias = "nfreq")]
    pub n_freq: usize,
    #[serde(alias = "fstart")]
    pub start_freq: f64,
    pub points_per_decade: usize,
}

impl Default for FrequencySweep {
    fn default() -> Self {
        Self {
            n_freq: N_FREQ,
            start_freq: START_FREQ,
            points_per_decade: POINTS_PER_DECADE,
        }
    }
}

impl FrequencySweep {
    // 対数等間隔[Hz]
    pub fn frequencies(&self) -> Array1<f64> {
        let ppd = self.points_per_decade as f64;
        Array1::from_iter((0..self.n_freq).map(|k| self.start_freq * 10f64.powf(k as f64 / ppd)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapLevelSweep {
    #[serde(alias = "nufs")]
    pub n_et: usize,
    #[serde(alias = "etmin")]
    pub et_min: f64,
    #[serde(alias = "etmax")]
    pub et_max: f64,
}

impl Default for TrapLevelSweep {
    fn default() -> Self {
        Self {
            n_et: N_ET,
            et_min: ET_MIN,
            et_max: ET_MAX,
        }
    }
}

impl TrapLevelSweep {
    // Ecからの深さ[eV]
    pub fn levels(&self) -> Array1<f64> {
        Array1::linspace(self.et_min, self.et_max, self.n_et)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSweep {
    pub vg_start: f64,
    pub vg_stop: f64,
    pub n_vg: usize,
}

impl Default for GateSweep {
    fn default() -> Self {
        Self {
            vg_start: -3.0,
            vg_stop: 3.0,
            n_vg: 121,
        }
    }
}

impl GateSweep {
    pub fn voltages(&self) -> Array1<f64> {
        Array1::linspace(self.vg_start, self.vg_stop, self.n_vg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub output: OutputPaths,
    #[serde(alias = "T")]
    pub temperature: f64,
    #[serde(alias = "nd")]
    pub doping: f64,
    #[serde(alias = "tox")]
    pub t_oxide: f64,
    #[serde(alias = "qfbar")]
    pub fixed_charge: f64,
    /// Absent means `SIGMA_QF_RATIO * fixed_charge`.
    #[serde(alias = "sigqf", skip_serializing_if = "Option::is_none")]
    pub sigma_qf: Option<f64>,
    #[serde(alias = "wtunnel")]
    pub tunnel_width: f64,
    pub workfunction_difference: f64,
    pub frequency: FrequencySweep,
    pub trap_levels: TrapLevelSweep,
    pub dit: DitModel,
    pub capture: CaptureCrossSection,
    pub fluctuation: FluctuationMethod,
    pub usvg: GateSweep,
    pub energy_step: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            output: OutputPaths::default(),
            temperature: TEMPERATURE,
            doping: DOPING,
            t_oxide: T_OXIDE,
            fixed_charge: FIXED_CHARGE,
            sigma_qf: None,
            tunnel_width: TUNNEL_WIDTH,
            workfunction_difference: 0.0,
            frequency: FrequencySweep::default(),
            trap_levels: TrapLevelSweep::default(),
            dit: DitModel::default(),
            capture: CaptureCrossSection::default(),
            fluctuation: FluctuationMethod::default(),
            usvg: GateSweep::default(),
            energy_step: ENERGY_STEP,
        }
    }
}

/// Values supplied at run time that take precedence over the parameter file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub sigma_qf: Option<f64>,
    pub tunnel_width: Option<f64>,
    pub outfile: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn sigma_qf(&self) -> f64 {
        self.sigma_qf
            .unwrap_or(SIGMA_QF_RATIO * self.fixed_charge)
    }

    pub fn apply(&mut self, overrides: &RunOverrides) {
        if let Some(s) = overrides.sigma_qf {
            self.sigma_qf = Some(s);
        }
        if let Some(w) = overrides.tunnel_width {
            self.tunnel_width = w;
        }
        if let Some(out) = &overrides.outfile {
            self.output.gpw = out.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &'static str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(GpwError::invalid(name, format!("must be positive, got {v}")))
            }
        }
        fn non_negative(name: &'static str, v: f64) -> Result<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(GpwError::invalid(name, format!("must be non-negative, got {v}")))
            }
        }
        fn at_least_one(name: &'static str, v: usize) -> Result<()> {
            if v >= 1 {
                Ok(())
            } else {
                Err(GpwError::invalid(name, "must be at least 1"))
            }
        }

        if !(self.temperature > -ZERO_CELSIUS) {
            return Err(GpwError::invalid(
                "temperature",
                format!("{} °C is below absolute zero", self.temperature),
            ));
        }
        positive("doping", self.doping)?;
        positive("t_oxide", self.t_oxide)?;
        non_negative("fixed_charge", self.fixed_charge)?;
        non_negative("sigma_qf", self.sigma_qf())?;
        non_negative("tunnel_width", self.tunnel_width)?;
        if self.tunnel_width > self.t_oxide {
            return Err(GpwError::invalid(
                "tunnel_width",
                format!(
                    "{} cm is deeper than the oxide ({} cm)",
                    self.tunnel_width, self.t_oxide
                ),
            ));
        }
        if !self.workfunction_difference.is_finite() {
            return Err(GpwError::invalid("workfunction_difference", "must be finite"));
        }

        at_least_one("n_freq", self.frequency.n_freq)?;
        positive("start_freq", self.frequency.start_freq)?;
        at_least_one("points_per_decade", self.frequency.points_per_decade)?;

        let levels = &self.trap_levels;
        at_least_one("n_et", levels.n_et)?;
        let eg = band_gap(self.temperature + ZERO_CELSIUS);
        if !(levels.et_min > 0.0 && levels.et_max < eg && levels.et_min <= levels.et_max) {
            return Err(GpwError::invalid(
                "trap_levels",
                format!(
                    "need 0 < et_min <= et_max < Eg = {eg:.3} eV, got [{}, {}]",
                    levels.et_min, levels.et_max
                ),
            ));
        }
        if !(self.energy_step >= MIN_ENERGY_STEP && self.energy_step <= 0.5 * eg) {
            return Err(GpwError::invalid(
                "energy_step",
                format!(
                    "need {MIN_ENERGY_STEP:e} <= energy_step <= Eg/2 = {:.3} eV, got {}",
                    0.5 * eg,
                    self.energy_step
                ),
            ));
        }
        if levels.n_et > 1 && levels.et_min == levels.et_max {
            return Err(GpwError::invalid("trap_levels", "et_min == et_max with n_et > 1"));
        }

        non_negative("dit.midgap", self.dit.midgap)?;
        non_negative("dit.c0", self.dit.c0)?;
        non_negative("dit.v0", self.dit.v0)?;
        positive("dit.beta_c", self.dit.beta_c)?;
        positive("dit.beta_v", self.dit.beta_v)?;
        if self.dit.da > 1 {
            return Err(GpwError::invalid("dit.da", format!("must be 0 or 1, got {}", self.dit.da)));
        }

        positive("capture.max", self.capture.max)?;
        positive("capture.cb0", self.capture.cb0)?;
        positive("capture.vb0", self.capture.vb0)?;
        non_negative("capture.gamma_cb", self.capture.gamma_cb)?;
        non_negative("capture.gamma_vb", self.capture.gamma_vb)?;

        match self.fluctuation {
            FluctuationMethod::Quadrature { points } => at_least_one("fluctuation.points", points)?,
            FluctuationMethod::MonteCarlo { samples, .. } => {
                at_least_one("fluctuation.samples", samples)?
            }
        }
        at_least_one("usvg.n_vg", self.usvg.n_vg)?;

        Ok(())
    }
}

#[test]
fn test_defaults_match_parameter_set() {
    let c = SimulationConfig::default();
    assert_eq!(c.output.gpw, PathBuf::from("data/gpw.csv"));
    assert_eq!(c.output.data, PathBuf::from("data/data.csv"));
    assert_eq!(c.output.param, PathBuf::from("data/param.csv"));
    assert_eq!(c.output.usvg, PathBuf::from("data/usvg.csv"));
    assert_eq!(c.temperature, 21.0);
    assert_eq!(c.doping, 1e16);
    assert_eq!(c.t_oxide, 20e-7);
    assert_eq!(c.fixed_charge, 1e12);
    assert_eq!(c.sigma_qf(), 0.2 * 1e12);
    assert_eq!(c.tunnel_width, 0.0);
    assert_eq!(c.frequency.n_freq, 151);
    assert_eq!(c.frequency.start_freq, 1e-3);
    assert_eq!(c.trap_levels.n_et, 11);
    assert_eq!(c.trap_levels.et_min, 0.2);
    assert_eq!(c.trap_levels.et_max, 0.8);
    assert_eq!(c.dit.midgap, 0.0);
    assert_eq!(c.dit.c0, 8.48e6);
    assert_eq!(c.dit.beta_c, 0.207);
    assert_eq!(c.dit.v0, 8.48e6);
    assert_eq!(c.dit.beta_v, 0.207);
    assert_eq!(c.dit.da, 1);
    assert_eq!(c.capture.max, 1e12);
    assert_eq!(c.capture.cb0, 1e-16);
    assert_eq!(c.capture.gamma_cb, 0.0);
    assert_eq!(c.capture.vb0, 1e-16);
    assert_eq!(c.capture.gamma_vb, 0.0);
    assert!(c.validate().is_ok());
}

#[test]
fn test_frequency_grid() {
    let f = FrequencySweep::default().frequencies();
    assert_eq!(f.len(), 151);
    assert_eq!(f[0], 1e-3);
    assert!((f[10] / 1e-2 - 1.0).abs() < 1e-12);
    assert!((f[150] / 1e12 - 1.0).abs() < 1e-9);
}

#[test]
fn test_trap_level_grid() {
    let et = TrapLevelSweep::default().levels();
    assert_eq!(et.len(), 11);
    assert!((et[0] - 0.2).abs() < 1e-12);
    assert!((et[1] - 0.26).abs() < 1e-12);
    assert!((et[10] - 0.8).abs() < 1e-12);
}

#[test]
fn test_short_names_and_partial_files() {
    let json = r#"{
        "nd": 2e17,
        "tox": 17e-7,
        "qfbar": 1e13,
        "sigqf": 8e11,
        "wtunnel": 1e-7,
        "output": { "outfile": "test.csv" },
        "dit": { "dmin": 3e10, "dc0": 1.36e7 },
        "fluctuation": { "method": "monte_carlo", "samples": 100, "seed": 3 }
    }"#;
    let c = SimulationConfig::from_json(json).unwrap();
    assert_eq!(c.doping, 2e17);
    assert_eq!(c.t_oxide, 17e-7);
    assert_eq!(c.sigma_qf(), 8e11);
    assert_eq!(c.tunnel_width, 1e-7);
    assert_eq!(c.output.gpw, PathBuf::from("test.csv"));
    assert_eq!(c.output.data, PathBuf::from(DATA_FILENAME));
    assert_eq!(c.dit.midgap, 3e10);
    assert_eq!(c.dit.v0, DIT_V0);
    assert_eq!(
        c.fluctuation,
        FluctuationMethod::MonteCarlo {
            samples: 100,
            seed: 3
        }
    );
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut c = SimulationConfig::default();
    c.doping = 0.0;
    assert!(matches!(
        c.validate(),
        Err(GpwError::InvalidParameter { name: "doping", .. })
    ));

    let mut c = SimulationConfig::default();
    c.trap_levels.et_max = 1.5;
    assert!(c.validate().is_err());

    let mut c = SimulationConfig::default();
    c.dit.da = 2;
    assert!(c.validate().is_err());

    let mut c = SimulationConfig::default();
    c.frequency.n_freq = 0;
    assert!(c.validate().is_err());

    let mut c = SimulationConfig::default();
    c.tunnel_width = 2.0 * c.t_oxide;
    assert!(matches!(
        c.validate(),
        Err(GpwError::InvalidParameter { name: "tunnel_width", .. })
    ));
    c.tunnel_width = c.t_oxide;
    assert!(c.validate().is_ok());

    let mut c = SimulationConfig::default();
    for step in [1e-12, 0.0, 0.9, f64::NAN] {
        c.energy_step = step;
        assert!(matches!(
            c.validate(),
            Err(GpwError::InvalidParameter { name: "energy_step", .. })
        ));
    }
    c.energy_step = MIN_ENERGY_STEP;
    assert!(c.validate().is_ok());

    let mut c = SimulationConfig::default();
    c.trap_levels.et_max = c.trap_levels.et_min;
    assert!(c.validate().is_err());
    c.trap_levels.n_et = 1;
    assert!(c.validate().is_ok());
}

#[test]
fn test_overrides() {
    let mut c = SimulationConfig::default();
    c.apply(&RunOverrides {
        sigma_qf: Some(1e11),
        tunnel_width: Some(2e-7),
        outfile: Some(PathBuf::from("out/gpw.csv")),
    });
    assert_eq!(c.sigma_qf(), 1e11);
    assert_eq!(c.tunnel_width, 2e-7);
    assert_eq!(c.output.gpw, PathBuf::from("out/gpw.csv"));
    assert_eq!(c.output.param, PathBuf::from(PARAM_FILENAME));
}
