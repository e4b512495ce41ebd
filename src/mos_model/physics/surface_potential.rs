use log::debug;
use rand::distributions::Uniform;
use rand::Rng;
use serde::Serialize;

use super::constant::{EOX, Q};
use super::interface_traps::{EnergyGrid, InterfaceTraps};
use super::semiconductor::Substrate;
use super::traits::{EnergyProfile, Tunable};
use crate::config::SimulationConfig;
use crate::error::{GpwError, Result};

const BISECTION_TOL: f64 = 1e-12;
const MAX_BISECTION: usize = 200;
const MAX_BRACKET_GROWTH: usize = 8;

/// Metal / oxide / n-type silicon capacitor with interface traps.
#[derive(Clone, Debug)]
pub struct MosCapacitor {
    substrate: Substrate,
    // 酸化膜容量[F/cm^2]
    cox: f64,
    // 仕事関数差[V]
    phi_ms: f64,
    // 固定電荷密度[個/cm^2]
    nf: f64,
    traps: InterfaceTraps,
    grid: EnergyGrid,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsVgPoint {
    pub vg: f64,
    pub psi_s: f64,
    pub us: f64,
    pub qs: f64,
    pub qit: f64,
    pub cs: f64,
    pub cit: f64,
    pub c_lf: f64,
    pub c_hf: f64,
}

impl MosCapacitor {
    pub fn new(
        substrate: Substrate,
        tox: f64,
        phi_ms: f64,
        nf: f64,
        traps: InterfaceTraps,
        energy_step: f64,
    ) -> Self {
        let grid = EnergyGrid::new(substrate.band_gap(), energy_step);
        Self {
            substrate: substrate,
            cox: EOX / tox,
            phi_ms: phi_ms,
            nf: nf,
            traps: traps,
            grid: grid,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            Substrate::new(config.doping, config.temperature),
            config.t_oxide,
            config.workfunction_difference,
            config.fixed_charge,
            InterfaceTraps::new(config.dit.clone(), config.capture.clone()),
            config.energy_step,
        )
    }

    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }

    pub fn traps(&self) -> &InterfaceTraps {
        &self.traps
    }

    pub fn grid(&self) -> &EnergyGrid {
        &self.grid
    }

    pub fn cox(&self) -> f64 {
        self.cox
    }

    pub fn flat_band_voltage(&self) -> f64 {
        self.phi_ms - Q * self.nf / self.cox
    }

    /// Band bending that puts the surface Fermi level `et` below Ec.
    pub fn surface_potential_for_level(&self, et: f64) -> f64 {
        self.substrate.fermi_depth() - et
    }

    pub fn trap_charge(&self, psi: f64) -> f64 {
        self.traps.charge(&self.substrate, psi, &self.grid)
    }

    pub fn trap_capacitance(&self, psi: f64) -> f64 {
        self.traps.capacitance(&self.substrate, psi, &self.grid)
    }

    pub fn gate_voltage(&self, psi: f64) -> f64 {
        let qs = self.substrate.charge(psi);
        let qit = self.trap_charge(psi);
        self.flat_band_voltage() + psi - (qs + qit) / self.cox
    }

    // 二分法
    pub fn solve_surface_potential(&self, vg: f64) -> Result<f64> {
        if !vg.is_finite() {
            return Err(GpwError::invalid("vg", format!("{vg} is not finite")));
        }
        let eg = self.substrate.band_gap();
        let mut lo = -eg;
        let mut hi = self.substrate.fermi_depth();
        let mut grown = 0;
        while !(self.gate_voltage(lo) <= vg && vg <= self.gate_voltage(hi)) {
            if grown == MAX_BRACKET_GROWTH {
                return Err(GpwError::NoConvergence(format!(
                    "gate voltage {vg} V outside [{:.3}, {:.3}] V",
                    self.gate_voltage(lo),
                    self.gate_voltage(hi)
                )));
            }
            lo -= 0.25 * eg;
            hi += 0.05;
            grown += 1;
        }

        for _ in 0..MAX_BISECTION {
            let mid = 0.5 * (lo + hi);
            if self.gate_voltage(mid) < vg {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < BISECTION_TOL {
                break;
            }
        }

        Ok(0.5 * (lo + hi))
    }

    pub fn usvg_point(&self, vg: f64) -> Result<UsVgPoint> {
        let psi = self.solve_surface_potential(vg)?;
        let cs = self.substrate.capacitance(psi);
        let cit = self.trap_capacitance(psi);
        let cs_hf = self.substrate.hf_capacitance(psi);
        let series = |c: f64| self.cox * c / (self.cox + c);

        Ok(UsVgPoint {
            vg: vg,
            psi_s: psi,
            us: psi / self.substrate.thermal_voltage(),
            qs: self.substrate.charge(psi),
            qit: self.trap_charge(psi),
            cs: cs,
            cit: cit,
            c_lf: series(cs + cit),
            c_hf: series(cs_hf),
        })
    }

    pub fn usvg_sweep(&self, voltages: &[f64]) -> Result<Vec<UsVgPoint>> {
        voltages.iter().map(|&vg| self.usvg_point(vg)).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnealingSchedule {
    pub start_temp: f64,
    pub end_temp: f64,
    pub epoch: usize,
}

impl Default for AnnealingSchedule {
    fn default() -> Self {
        Self {
            start_temp: 10.0,
            end_temp: 0.05,
            epoch: 20000,
        }
    }
}

/// Minimizes `objective` over the model's tunable parameters, leaving the best
/// candidate in `model`. Returns (initial score, best score).
pub fn simulated_annealing<M, F, R>(
    model: &mut M,
    objective: F,
    schedule: &AnnealingSchedule,
    rng: &mut R,
) -> (f64, f64)
where
    M: Tunable,
    F: Fn(&M) -> f64,
    R: Rng,
{
    let uni = Uniform::new_inclusive(-1.0, 1.0);
    let sensitivity = model.sensitivity();

    let initial_score = objective(model);
    let mut best_param = model.params();
    let mut best_score = initial_score;
    let mut pre_score = initial_score;

    for e in 0..schedule.epoch {
        let temp = schedule.start_temp
            + (schedule.end_temp - schedule.start_temp) * (e as f64 / schedule.epoch as f64);
        let rate = f64::exp(-1.0 / temp);

        let pre_param = model.params();

        // 遷移関数
        let new_param: Vec<f64> = pre_param
            .iter()
            .zip(sensitivity.iter())
            .map(|(p, s)| p + rng.sample(uni) * s * rate)
            .collect();
        model.set_params(&new_param);
        model.constrain();

        let new_score = objective(model);
        if new_score < best_score {
            best_score = new_score;
            best_param = model.params();
        }

        let prob = f64::exp((pre_score - new_score) / temp);
        if prob <= rng.gen::<f64>() {
            model.set_params(&pre_param);
        } else {
            pre_score = new_score;
        }
    }

    model.set_params(&best_param);
    debug!("annealing: score {initial_score:.4e} -> {best_score:.4e}");

    (initial_score, best_score)
}

/// Mean squared log10 error of a trap-density profile against (E - Ei, Dit) points.
pub fn log_dit_error<P: EnergyProfile>(profile: &P, energy: &[f64], dit: &[f64]) -> f64 {
    let (sum, n) = energy
        .iter()
        .zip(dit.iter())
        .filter(|pair| *pair.1 > 0.0)
        .fold((0.0, 0usize), |(acc, n), (&e, &d)| {
            let pred = profile.value(e).max(f64::MIN_POSITIVE);
            let diff = pred.log10() - d.log10();
            (acc + diff * diff, n + 1)
        });
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[test]
fn test_flat_band_voltage() {
    let config = SimulationConfig::default();
    let mos = MosCapacitor::from_config(&config);
    let cox = EOX / 20e-7;
    assert!((mos.cox() / cox - 1.0).abs() < 1e-12);
    assert!((mos.flat_band_voltage() + Q * 1e12 / cox).abs() < 1e-12);
}

#[test]
fn test_gate_voltage_is_monotonic_and_inverted() {
    let mut config = SimulationConfig::default();
    config.dit = super::interface_traps::DitModel::constant(5e10);
    let mos = MosCapacitor::from_config(&config);

    let psis: Vec<f64> = (0..40).map(|i| -0.9 + 0.03 * i as f64).collect();
    let vgs: Vec<f64> = psis.iter().map(|&p| mos.gate_voltage(p)).collect();
    for w in vgs.windows(2) {
        assert!(w[1] > w[0]);
    }

    for (&psi, &vg) in psis.iter().zip(vgs.iter()) {
        let solved = mos.solve_surface_potential(vg).unwrap();
        assert!((solved - psi).abs() < 1e-9, "{solved} vs {psi}");
    }
}

#[test]
fn test_upper_acceptor_traps_invert() {
    let mut config = SimulationConfig::default();
    config.dit = super::interface_traps::DitModel::constant(2e11);
    config.dit.da = 0;
    let mos = MosCapacitor::from_config(&config);
    config.dit.da = 1;
    let donors = MosCapacitor::from_config(&config);

    let mut previous = f64::NEG_INFINITY;
    for i in 0..30 {
        let psi = -0.8 + 0.03 * i as f64;
        let vg = mos.gate_voltage(psi);
        assert!(vg > previous);
        previous = vg;
        let solved = mos.solve_surface_potential(vg).unwrap();
        assert!((solved - psi).abs() < 1e-9);
        // upper-half acceptors hold more negative charge: more gate voltage
        assert!(vg > donors.gate_voltage(psi));
    }
}

#[test]
fn test_usvg_point_capacitances() {
    let mos = MosCapacitor::from_config(&SimulationConfig::default());
    let p = mos.usvg_point(mos.flat_band_voltage()).unwrap();
    assert!(p.c_lf < mos.cox());
    assert!(p.c_hf <= p.c_lf + 1e-18);
    assert!((p.us - p.psi_s / mos.substrate().thermal_voltage()).abs() < 1e-12);
}

#[test]
fn test_annealing_keeps_best() {
    use super::interface_traps::DitModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let truth = DitModel {
        midgap: 2e10,
        c0: 1e8,
        beta_c: 0.1,
        v0: 1e8,
        beta_v: 0.12,
        da: 1,
    };
    let energy: Vec<f64> = (0..13).map(|i| -0.3 + 0.05 * i as f64).collect();
    let dit: Vec<f64> = energy.iter().map(|&e| truth.value(e)).collect();

    let mut model = DitModel::constant(1e12);
    let mut rng = StdRng::seed_from_u64(42);
    let (initial, best) = simulated_annealing(
        &mut model,
        |m| log_dit_error(m, &energy, &dit),
        &AnnealingSchedule::default(),
        &mut rng,
    );

    assert!(best <= initial);
    assert!(best < 0.1 * initial, "{initial} -> {best}");
    assert!((log_dit_error(&model, &energy, &dit) - best).abs() < 1e-9);
}
