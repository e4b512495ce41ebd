use log::info;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::mos_model::admittance::attenuation_length;
use crate::mos_model::physics::surface_potential::{MosCapacitor, UsVgPoint};
use crate::simulation::{LevelSummary, SimulationResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpwRow {
    pub et: f64,
    pub psi_s: f64,
    pub freq: f64,
    pub omega: f64,
    pub gp_w: f64,
    pub gp_qw: f64,
    pub cm: f64,
    pub gm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRow {
    pub name: String,
    pub value: f64,
    pub unit: &'static str,
}

fn create<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            create_dir_all(dir)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_rows<W: Write, T: Serialize>(w: W, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn gpw_rows(result: &SimulationResult) -> Vec<GpwRow> {
    let gp_qw = result.gp_qw();
    let mut rows = Vec::with_capacity(gp_qw.len());
    for (i, level) in result.levels.iter().enumerate() {
        for (k, &freq) in result.frequencies.iter().enumerate() {
            rows.push(GpwRow {
                et: level.et,
                psi_s: level.psi_s,
                freq: freq,
                omega: 2.0 * std::f64::consts::PI * freq,
                gp_w: result.gp_w[[i, k]],
                gp_qw: gp_qw[[i, k]],
                cm: result.cm[[i, k]],
                gm: result.gm[[i, k]],
            });
        }
    }
    rows
}

pub fn param_rows(config: &SimulationConfig, mos: &MosCapacitor) -> Vec<ParamRow> {
    let si = mos.substrate();
    let row = |name: &str, value: f64, unit: &'static str| ParamRow {
        name: name.to_owned(),
        value: value,
        unit: unit,
    };
    let (fluct_method, fluct_n) = match config.fluctuation {
        crate::mos_model::admittance::FluctuationMethod::Quadrature { points } => (0.0, points),
        crate::mos_model::admittance::FluctuationMethod::MonteCarlo { samples, .. } => {
            (1.0, samples)
        }
    };

    vec![
        row("temperature", config.temperature, "C"),
        row("doping", config.doping, "cm^-3"),
        row("t_oxide", config.t_oxide, "cm"),
        row("fixed_charge", config.fixed_charge, "cm^-2"),
        row("sigma_qf", config.sigma_qf(), "cm^-2"),
        row("tunnel_width", config.tunnel_width, "cm"),
        row("workfunction_difference", config.workfunction_difference, "V"),
        row("n_freq", config.frequency.n_freq as f64, ""),
        row("start_freq", config.frequency.start_freq, "Hz"),
        row("points_per_decade", config.frequency.points_per_decade as f64, ""),
        row("n_et", config.trap_levels.n_et as f64, ""),
        row("et_min", config.trap_levels.et_min, "eV"),
        row("et_max", config.trap_levels.et_max, "eV"),
        row("dit_midgap", config.dit.midgap, "cm^-2 eV^-1"),
        row("dit_c0", config.dit.c0, "cm^-2 eV^-1"),
        row("dit_beta_c", config.dit.beta_c, "eV"),
        row("dit_v0", config.dit.v0, "cm^-2 eV^-1"),
        row("dit_beta_v", config.dit.beta_v, "eV"),
        row("dit_da", config.dit.da as f64, ""),
        row("sign_max", config.capture.max, "cm^2"),
        row("sign_cb0", config.capture.cb0, "cm^2"),
        row("sign_gamma_cb", config.capture.gamma_cb, "eV"),
        row("sign_vb0", config.capture.vb0, "cm^2"),
        row("sign_gamma_vb", config.capture.gamma_vb, "eV"),
        row("fluctuation_method", fluct_method, "0=quadrature 1=monte_carlo"),
        row("fluctuation_points", fluct_n as f64, ""),
        row("energy_step", config.energy_step, "eV"),
        row("temperature_k", si.temperature(), "K"),
        row("thermal_voltage", si.thermal_voltage(), "V"),
        row("band_gap", si.band_gap(), "eV"),
        row("nc", si.nc(), "cm^-3"),
        row("nv", si.nv(), "cm^-3"),
        row("ni", si.intrinsic_density(), "cm^-3"),
        row("n0", si.electron_density(), "cm^-3"),
        row("p0", si.hole_density(), "cm^-3"),
        row("ec_minus_ef", si.fermi_depth(), "eV"),
        row("ec_minus_ei", si.midgap_depth(), "eV"),
        row("thermal_velocity", si.thermal_velocity(), "cm/s"),
        row("debye_length", si.debye_length(), "cm"),
        row("cox", mos.cox(), "F/cm^2"),
        row("vfb", mos.flat_band_voltage(), "V"),
        row("tunnel_attenuation_length", attenuation_length(), "cm"),
    ]
}

pub fn write_gpw<P: AsRef<Path>>(path: P, result: &SimulationResult) -> Result<()> {
    write_rows(create(path)?, gpw_rows(result))
}

pub fn write_data<P: AsRef<Path>>(path: P, levels: &[LevelSummary]) -> Result<()> {
    write_rows(create(path)?, levels.iter())
}

pub fn write_params<P: AsRef<Path>>(
    path: P,
    config: &SimulationConfig,
    mos: &MosCapacitor,
) -> Result<()> {
    write_rows(create(path)?, param_rows(config, mos))
}

pub fn write_usvg<P: AsRef<Path>>(path: P, points: &[UsVgPoint]) -> Result<()> {
    write_rows(create(path)?, points.iter())
}

pub fn write_all(config: &SimulationConfig, mos: &MosCapacitor, result: &SimulationResult) -> Result<()> {
    let out = &config.output;
    write_gpw(&out.gpw, result)?;
    write_data(&out.data, &result.levels)?;
    write_params(&out.param, config, mos)?;
    write_usvg(&out.usvg, &result.usvg)?;
    info!(
        "wrote {}, {}, {}, {}",
        out.gpw.display(),
        out.data.display(),
        out.param.display(),
        out.usvg.display()
    );
    Ok(())
}

#[test]
fn test_param_rows_cover_inputs() {
    let config = SimulationConfig::default();
    let mos = MosCapacitor::from_config(&config);
    let rows = param_rows(&config, &mos);
    let get = |name: &str| rows.iter().find(|r| r.name == name).map(|r| r.value);
    assert_eq!(get("doping"), Some(1e16));
    assert_eq!(get("sigma_qf"), Some(2e11));
    assert_eq!(get("dit_da"), Some(1.0));
    assert_eq!(get("vfb"), Some(mos.flat_band_voltage()));
    assert!(get("missing").is_none());
}

#[test]
fn test_write_rows_header() {
    let mut buf = Vec::new();
    write_rows(
        &mut buf,
        vec![ParamRow {
            name: "doping".to_owned(),
            value: 1e16,
            unit: "cm^-3",
        }],
    )
    .unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("name,value,unit"));
    let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(fields[0], "doping");
    assert_eq!(fields[1].parse::<f64>().unwrap(), 1e16);
    assert_eq!(fields[2], "cm^-3");
}
