use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::physics::constant::{BARRIER_OX, HBAR, M_OX, Q};
use super::physics::interface_traps::{occupancy_derivative, InterfaceTraps};
use super::physics::surface_potential::MosCapacitor;
use super::physics::traits::EnergyProfile;
use crate::error::{GpwError, Result};

// ±4σ
const QUADRATURE_SPAN: f64 = 4.0;

/// Gp/w of a continuum of traps with constant Dit peaks at w tau = 1.98.
pub const CONTINUUM_PEAK_WTAU: f64 = 1.98;
pub const CONTINUUM_PEAK_FACTOR: f64 = 0.402;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FluctuationMethod {
    Quadrature { points: usize },
    MonteCarlo { samples: usize, seed: u64 },
}

impl Default for FluctuationMethod {
    fn default() -> Self {
        FluctuationMethod::Quadrature { points: 41 }
    }
}

/// Traps spread uniformly in depth into the oxide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunneling {
    width: f64,
    lambda: f64,
}

impl Tunneling {
    /// `None` for a zero width: pure interface traps.
    pub fn new(width: f64) -> Option<Self> {
        if width > 0.0 {
            Some(Self {
                width: width,
                lambda: attenuation_length(),
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Depth average of 1 / (1 + a exp(x / lambda)) over [0, width].
    fn response(&self, a: Complex64) -> Complex64 {
        // ln(1 + a e^s) = s + ln(a + e^-s), finite for any width
        let s = self.width / self.lambda;
        let log_ratio = s + (a + (-s).exp()).ln() - (1.0 + a).ln();
        (self.width - self.lambda * log_ratio) / self.width
    }
}

/// Tunneling attenuation length lambda = hbar / (2 sqrt(2 m q Phi_b)) [cm].
pub fn attenuation_length() -> f64 {
    let kappa = (2.0 * M_OX * Q * BARRIER_OX).sqrt() / HBAR; // [1/m]
    1.0 / (2.0 * kappa) * 100.0
}

/// One RC branch per grid node: C_T = q Dit f(1-f)/Vt, tau = 1/(sigma_n vth (ns + n1)).
#[derive(Clone, Debug)]
pub struct TrapBranches {
    cap: Vec<f64>,
    tau: Vec<f64>,
}

impl TrapBranches {
    pub fn new(mos: &MosCapacitor, psi: f64) -> Self {
        let si = mos.substrate();
        let traps = mos.traps();
        let grid = mos.grid();
        let vt = si.thermal_voltage();
        let vth = si.thermal_velocity();
        let ns = si.surface_electron_density(psi);
        let last = grid.points() - 1;

        let mut cap = Vec::with_capacity(grid.points());
        let mut tau = Vec::with_capacity(grid.points());
        for (i, depth) in grid.depths().enumerate() {
            let (e, x) = InterfaceTraps::locate(si, psi, depth);
            let w = if i == 0 || i == last { 0.5 } else { 1.0 };
            let n1 = si.nc() * (-depth / vt).exp();
            cap.push(w * grid.step() * Q * traps.dit.value(e) * occupancy_derivative(x) / vt);
            tau.push(1.0 / (traps.capture.value(e) * vth * (ns + n1)));
        }

        Self { cap: cap, tau: tau }
    }

    pub fn capacitance(&self) -> f64 {
        self.cap.iter().sum()
    }

    // Y_it[S/cm^2]
    pub fn admittance(&self, omega: f64, tunneling: Option<&Tunneling>) -> Complex64 {
        let jw = Complex64::new(0.0, omega);
        self.cap
            .iter()
            .zip(self.tau.iter())
            .filter(|pair| *pair.0 > 0.0)
            .map(|(&c, &tau)| {
                let a = jw * tau;
                let response = match tunneling {
                    Some(t) => t.response(a),
                    None => 1.0 / (1.0 + a),
                };
                jw * c * response
            })
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceSamples {
    pub psi: Vec<f64>,
    pub weight: Vec<f64>,
}

impl SurfaceSamples {
    pub fn single(psi: f64) -> Self {
        Self {
            psi: vec![psi],
            weight: vec![1.0],
        }
    }

    /// Gaussian samples around `mean`; `stream` decorrelates Monte Carlo streams.
    pub fn gaussian(
        mean: f64,
        sigma: f64,
        method: &FluctuationMethod,
        stream: u64,
    ) -> Result<Self> {
        if sigma <= 0.0 {
            return Ok(Self::single(mean));
        }
        match *method {
            FluctuationMethod::Quadrature { points } => {
                if points <= 1 {
                    return Ok(Self::single(mean));
                }
                let step = 2.0 * QUADRATURE_SPAN / (points - 1) as f64;
                let z: Vec<f64> = (0..points)
                    .map(|i| -QUADRATURE_SPAN + step * i as f64)
                    .collect();
                let raw: Vec<f64> = z.iter().map(|z| (-0.5 * z * z).exp()).collect();
                let total: f64 = raw.iter().sum();
                Ok(Self {
                    psi: z.iter().map(|z| mean + sigma * z).collect(),
                    weight: raw.iter().map(|w| w / total).collect(),
                })
            }
            FluctuationMethod::MonteCarlo { samples, seed } => {
                let normal = Normal::new(mean, sigma)
                    .map_err(|e| GpwError::invalid("sigma_psi", e.to_string()))?;
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(stream));
                let n = samples.max(1);
                Ok(Self {
                    psi: (0..n).map(|_| normal.sample(&mut rng)).collect(),
                    weight: vec![1.0 / n as f64; n],
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.psi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.psi.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct AveragedAdmittance {
    branches: Vec<(f64, TrapBranches)>,
    tunneling: Option<Tunneling>,
}

impl AveragedAdmittance {
    pub fn new(mos: &MosCapacitor, samples: &SurfaceSamples, tunneling: Option<Tunneling>) -> Self {
        let branches = samples
            .psi
            .iter()
            .zip(samples.weight.iter())
            .map(|(&psi, &w)| (w, TrapBranches::new(mos, psi)))
            .collect();
        Self {
            branches: branches,
            tunneling: tunneling,
        }
    }

    pub fn admittance(&self, omega: f64) -> Complex64 {
        self.branches
            .iter()
            .map(|(w, b)| b.admittance(omega, self.tunneling.as_ref()) * *w)
            .sum()
    }

    pub fn gp_over_omega(&self, omega: f64) -> f64 {
        self.admittance(omega).re / omega
    }
}

/// Terminal admittance with the oxide in series: 1/Ym = 1/(jw Cox) + 1/(jw Cs + Yit).
pub fn terminal_admittance(cox: f64, cs: f64, yit: Complex64, omega: f64) -> Complex64 {
    let jw = Complex64::new(0.0, omega);
    let ys = jw * cs + yit;
    1.0 / (1.0 / (jw * cox) + 1.0 / ys)
}

/// Standard deviation of the band bending [V] produced by a fixed-charge
/// spread `sigma_qf` [cm^-2].
pub fn surface_potential_spread(mos: &MosCapacitor, psi: f64, sigma_qf: f64) -> f64 {
    let c_total = mos.cox() + mos.substrate().capacitance(psi) + mos.trap_capacitance(psi);
    Q * sigma_qf / c_total
}

#[cfg(test)]
fn constant_trap_device(dit: f64, sigma_n: f64) -> MosCapacitor {
    use super::physics::interface_traps::{CaptureCrossSection, DitModel};
    use super::physics::semiconductor::Substrate;

    MosCapacitor::new(
        Substrate::new(1e16, 21.0),
        20e-7,
        0.0,
        0.0,
        InterfaceTraps::new(DitModel::constant(dit), CaptureCrossSection::constant(sigma_n)),
        0.0005,
    )
}

#[test]
fn test_continuum_peak() {
    let mos = constant_trap_device(1e11, 1e-16);
    let si = mos.substrate();
    let psi = mos.surface_potential_for_level(0.4);
    let tau0 = 1.0 / (1e-16 * si.thermal_velocity() * si.surface_electron_density(psi));

    let y = AveragedAdmittance::new(&mos, &SurfaceSamples::single(psi), None);
    let omega = CONTINUUM_PEAK_WTAU / tau0;
    let peak = y.gp_over_omega(omega) / Q;
    assert!((peak / (CONTINUUM_PEAK_FACTOR * 1e11) - 1.0).abs() < 1e-2, "{peak}");

    let closed = |w: f64| 1e11 / (2.0 * w * tau0) * (1.0 + (w * tau0).powi(2)).ln();
    for k in [-2.0, -1.0, 0.5, 1.0] {
        let w = 10f64.powf(k) / tau0;
        let g = y.gp_over_omega(w) / Q;
        assert!((g / closed(w) - 1.0).abs() < 1e-2, "w tau = {}", w * tau0);
    }
}

#[test]
fn test_low_frequency_capacitance() {
    let mos = constant_trap_device(1e11, 1e-16);
    let psi = mos.surface_potential_for_level(0.45);
    let branches = TrapBranches::new(&mos, psi);
    let cit = mos.trap_capacitance(psi);
    assert!((branches.capacitance() / cit - 1.0).abs() < 1e-9);
    // at very low frequency every branch follows: Y ~ jw Cit
    let y = branches.admittance(1e-6, None);
    assert!((y.im / 1e-6 / cit - 1.0).abs() < 1e-6);
}

#[test]
fn test_fluctuations_lower_and_broaden_peak() {
    let mos = constant_trap_device(1e11, 1e-16);
    let psi = mos.surface_potential_for_level(0.4);
    let omegas: Vec<f64> = (0..121).map(|k| 10f64.powf(-2.0 + 0.1 * k as f64)).collect();

    let sharp = AveragedAdmittance::new(&mos, &SurfaceSamples::single(psi), None);
    let method = FluctuationMethod::Quadrature { points: 41 };
    let samples = SurfaceSamples::gaussian(psi, 0.05, &method, 0).unwrap();
    let broad = AveragedAdmittance::new(&mos, &samples, None);

    let peak = |y: &AveragedAdmittance| {
        omegas
            .iter()
            .map(|&w| y.gp_over_omega(w))
            .fold(0.0, f64::max)
    };
    assert!(peak(&broad) < 0.9 * peak(&sharp));

    // at frequencies far below the peak the fluctuating surface responds more
    let w_low = omegas[0];
    assert!(broad.gp_over_omega(w_low) > sharp.gp_over_omega(w_low));
}

#[test]
fn test_tunneling_lowers_peak() {
    let mos = constant_trap_device(1e11, 1e-16);
    let psi = mos.surface_potential_for_level(0.4);
    let si = mos.substrate();
    let tau0 = 1.0 / (1e-16 * si.thermal_velocity() * si.surface_electron_density(psi));
    let omega = CONTINUUM_PEAK_WTAU / tau0;
    let samples = SurfaceSamples::single(psi);

    let interface = AveragedAdmittance::new(&mos, &samples, None);
    let buried = AveragedAdmittance::new(&mos, &samples, Tunneling::new(1e-7));
    assert!(buried.gp_over_omega(omega) < interface.gp_over_omega(omega));

    // buried traps answer over a wider band: relative to their own maximum
    // they still conduct two decades below the interface peak
    let omegas: Vec<f64> = (0..101).map(|k| 10f64.powf(-8.0 + 0.1 * k as f64) / tau0).collect();
    let peak = |y: &AveragedAdmittance| {
        omegas
            .iter()
            .map(|&w| y.gp_over_omega(w))
            .fold(0.0, f64::max)
    };
    let w_low = 0.01 / tau0;
    let interface_low = interface.gp_over_omega(w_low) / peak(&interface);
    let buried_low = buried.gp_over_omega(w_low) / peak(&buried);
    assert!(buried_low > 10.0 * interface_low, "{buried_low} vs {interface_low}");

    // a vanishing width reduces to the interface response
    let thin = AveragedAdmittance::new(&mos, &samples, Tunneling::new(1e-12));
    let ratio = thin.gp_over_omega(omega) / interface.gp_over_omega(omega);
    assert!((ratio - 1.0).abs() < 1e-3, "{ratio}");
}

#[test]
fn test_tunneling_response_for_wide_oxide_layers() {
    let a = Complex64::new(0.0, 0.3);
    let moderate = Tunneling::new(5e-8).unwrap();
    let s = moderate.width() / moderate.lambda();
    let direct = (1.0 + a * s.exp()).ln() - (1.0 + a).ln();
    let expected = (moderate.width() - moderate.lambda() * direct) / moderate.width();
    assert!((moderate.response(a) - expected).norm() < 1e-12);

    // e^(w/lambda) overflows here
    let wide = Tunneling::new(1e-4).unwrap();
    assert!(wide.width() / wide.lambda() > 710.0);
    let r = wide.response(a);
    assert!(r.re.is_finite() && r.im.is_finite());
    assert!(r.norm() > 0.0 && r.norm() < 1.0);
}

#[test]
fn test_attenuation_length() {
    let lambda = attenuation_length();
    assert!(lambda > 5e-9 && lambda < 1.2e-8, "{lambda}");
    assert!(Tunneling::new(0.0).is_none());
}

#[test]
fn test_monte_carlo_matches_quadrature() {
    let mos = constant_trap_device(1e11, 1e-16);
    let psi = mos.surface_potential_for_level(0.4);
    let si = mos.substrate();
    let tau0 = 1.0 / (1e-16 * si.thermal_velocity() * si.surface_electron_density(psi));
    let omega = 1.0 / tau0;

    let quad = SurfaceSamples::gaussian(psi, 0.03, &FluctuationMethod::Quadrature { points: 61 }, 0)
        .unwrap();
    let mc = SurfaceSamples::gaussian(
        psi,
        0.03,
        &FluctuationMethod::MonteCarlo {
            samples: 4000,
            seed: 7,
        },
        0,
    )
    .unwrap();
    assert_eq!(mc.len(), 4000);

    let gq = AveragedAdmittance::new(&mos, &quad, None).gp_over_omega(omega);
    let gm = AveragedAdmittance::new(&mos, &mc, None).gp_over_omega(omega);
    assert!((gm / gq - 1.0).abs() < 0.05, "{gm} vs {gq}");
}

#[test]
fn test_quadrature_weights() {
    let s = SurfaceSamples::gaussian(0.1, 0.02, &FluctuationMethod::default(), 0).unwrap();
    assert_eq!(s.len(), 41);
    assert!((s.weight.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    let mean: f64 = s.psi.iter().zip(s.weight.iter()).map(|(p, w)| p * w).sum();
    assert!((mean - 0.1).abs() < 1e-12);
    assert_eq!(SurfaceSamples::gaussian(0.1, 0.0, &FluctuationMethod::default(), 0).unwrap().len(), 1);
}

#[test]
fn test_terminal_admittance_limits() {
    let cox = 1.7e-7;
    let cs = 3e-8;
    let omega = 1e4;
    let ym = terminal_admittance(cox, cs, Complex64::new(0.0, 0.0), omega);
    let series = cox * cs / (cox + cs);
    assert!((ym.im / omega / series - 1.0).abs() < 1e-12);
    assert!(ym.re.abs() < 1e-20);
}
