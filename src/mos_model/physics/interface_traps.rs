use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

use super::constant::Q;
use super::semiconductor::Substrate;
use super::traits::{EnergyProfile, Tunable};
use crate::config;

/// U-shaped interface trap density [cm^-2 eV^-1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DitModel {
    #[serde(alias = "dmin")]
    pub midgap: f64,
    #[serde(alias = "dc0")]
    pub c0: f64,
    #[serde(alias = "betac")]
    pub beta_c: f64,
    #[serde(alias = "dv0")]
    pub v0: f64,
    #[serde(alias = "betav")]
    pub beta_v: f64,
    pub da: u8,
}

impl Default for DitModel {
    fn default() -> Self {
        Self {
            midgap: config::DIT_MIDGAP,
            c0: config::DIT_C0,
            beta_c: config::DIT_BETA_C,
            v0: config::DIT_V0,
            beta_v: config::DIT_BETA_V,
            da: config::DIT_DA,
        }
    }
}

impl DitModel {
    pub fn constant(dit: f64) -> Self {
        Self {
            midgap: dit,
            c0: 0.0,
            v0: 0.0,
            ..Self::default()
        }
    }

    pub fn character(&self) -> TrapCharacter {
        if self.da == 0 {
            TrapCharacter::UpperAcceptorLowerDonor
        } else {
            TrapCharacter::UpperDonorLowerAcceptor
        }
    }
}

impl EnergyProfile for DitModel {
    fn value(&self, e: f64) -> f64 {
        if e >= 0.0 {
            self.midgap + self.c0 * (e / self.beta_c).exp()
        } else {
            self.midgap + self.v0 * (-e / self.beta_v).exp()
        }
    }
}

impl Tunable for DitModel {
    // densities are annealed in log10 space
    fn params(&self) -> Vec<f64> {
        let lg = |x: f64| x.max(1.0).log10();
        vec![
            lg(self.midgap),
            lg(self.c0),
            self.beta_c,
            lg(self.v0),
            self.beta_v,
        ]
    }

    fn set_params(&mut self, params: &[f64]) {
        self.midgap = 10f64.powf(params[0]);
        self.c0 = 10f64.powf(params[1]);
        self.beta_c = params[2];
        self.v0 = 10f64.powf(params[3]);
        self.beta_v = params[4];
    }

    fn sensitivity(&self) -> Vec<f64> {
        vec![0.5, 0.5, 0.02, 0.5, 0.02]
    }

    fn constrain(&mut self) {
        self.midgap = self.midgap.max(1.0);
        self.c0 = self.c0.max(1.0);
        self.v0 = self.v0.max(1.0);
        self.beta_c = self.beta_c.clamp(1e-3, 10.0);
        self.beta_v = self.beta_v.clamp(1e-3, 10.0);
    }
}

/// Electron capture cross section [cm^2]; a zero slope means constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureCrossSection {
    #[serde(alias = "signmax")]
    pub max: f64,
    #[serde(alias = "signcb0")]
    pub cb0: f64,
    #[serde(alias = "gammacb")]
    pub gamma_cb: f64,
    #[serde(alias = "signvb0")]
    pub vb0: f64,
    #[serde(alias = "gammavb")]
    pub gamma_vb: f64,
}

impl Default for CaptureCrossSection {
    fn default() -> Self {
        Self {
            max: config::SIGN_MAX,
            cb0: config::SIGN_CB0,
            gamma_cb: config::SIGN_GAMMA_CB,
            vb0: config::SIGN_VB0,
            gamma_vb: config::SIGN_GAMMA_VB,
        }
    }
}

impl CaptureCrossSection {
    pub fn constant(sigma: f64) -> Self {
        Self {
            max: sigma.max(config::SIGN_MAX),
            cb0: sigma,
            gamma_cb: 0.0,
            vb0: sigma,
            gamma_vb: 0.0,
        }
    }
}

impl EnergyProfile for CaptureCrossSection {
    fn value(&self, e: f64) -> f64 {
        let sigma = if e >= 0.0 {
            if self.gamma_cb > 0.0 {
                self.cb0 * (e / self.gamma_cb).exp()
            } else {
                self.cb0
            }
        } else if self.gamma_vb > 0.0 {
            self.vb0 * (-e / self.gamma_vb).exp()
        } else {
            self.vb0
        };
        sigma.min(self.max)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TrapCharacter {
    /// da = 1
    UpperDonorLowerAcceptor,
    /// da = 0
    UpperAcceptorLowerDonor,
}

impl TrapCharacter {
    pub fn is_donor(&self, e: f64) -> bool {
        match self {
            TrapCharacter::UpperDonorLowerAcceptor => e >= 0.0,
            TrapCharacter::UpperAcceptorLowerDonor => e < 0.0,
        }
    }
}

// Ec - E in [0, Eg]
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyGrid {
    n: usize,
    step: f64,
}

impl EnergyGrid {
    pub fn new(eg: f64, step: f64) -> Self {
        let n = (eg / step).ceil().max(2.0) as usize;
        Self {
            n: n,
            step: eg / n as f64,
        }
    }

    pub fn points(&self) -> usize {
        self.n + 1
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn depths(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=self.n).map(move |i| i as f64 * self.step)
    }

    pub fn integrate<T, F>(&self, f: F) -> T
    where
        T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
        F: Fn(f64) -> T,
    {
        let mut acc = T::default();
        for (i, depth) in self.depths().enumerate() {
            let w = if i == 0 || i == self.n { 0.5 } else { 1.0 };
            acc = acc + f(depth) * w;
        }
        acc * self.step
    }
}

/// f(1 - f) for a level `x` thermal voltages above the Fermi level.
pub(crate) fn occupancy_derivative(x: f64) -> f64 {
    let c = (0.5 * x).cosh();
    0.25 / (c * c)
}

pub(crate) fn occupancy(x: f64) -> f64 {
    1.0 / (1.0 + x.exp())
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceTraps {
    pub dit: DitModel,
    pub capture: CaptureCrossSection,
}

impl InterfaceTraps {
    pub fn new(dit: DitModel, capture: CaptureCrossSection) -> Self {
        Self {
            dit: dit,
            capture: capture,
        }
    }

    /// (E - Ei, (E - EF)/Vt) for a trap `depth` below the surface Ec at band bending `psi`.
    pub(crate) fn locate(si: &Substrate, psi: f64, depth: f64) -> (f64, f64) {
        let e_mid = si.midgap_depth() - depth;
        let x = (si.fermi_depth() - psi - depth) / si.thermal_voltage();
        (e_mid, x)
    }

    // トラップ電荷[C/cm^2]
    pub fn charge(&self, si: &Substrate, psi: f64, grid: &EnergyGrid) -> f64 {
        let character = self.dit.character();
        Q * grid.integrate(|depth| {
            let (e, x) = Self::locate(si, psi, depth);
            let f = occupancy(x);
            let d = self.dit.value(e);
            if character.is_donor(e) {
                d * (1.0 - f)
            } else {
                -d * f
            }
        })
    }

    pub fn capacitance(&self, si: &Substrate, psi: f64, grid: &EnergyGrid) -> f64 {
        let vt = si.thermal_voltage();
        Q / vt
            * grid.integrate(|depth| {
                let (e, x) = Self::locate(si, psi, depth);
                self.dit.value(e) * occupancy_derivative(x)
            })
    }
}

#[test]
fn test_dit_profile() {
    let dit = DitModel {
        midgap: 1e10,
        c0: 1e7,
        beta_c: 0.1,
        v0: 2e7,
        beta_v: 0.2,
        da: 1,
    };
    assert_eq!(dit.value(0.0), 1e10 + 1e7);
    assert!((dit.value(0.3) - (1e10 + 1e7 * 3.0f64.exp())).abs() < 1.0);
    assert!((dit.value(-0.4) - (1e10 + 2e7 * 2.0f64.exp())).abs() < 1.0);
    assert!(dit.value(0.5) > dit.value(0.2));
    assert!(dit.value(-0.5) > dit.value(-0.2));
}

#[test]
fn test_capture_cross_section() {
    let constant = CaptureCrossSection::default();
    assert_eq!(constant.value(0.4), 1e-16);
    assert_eq!(constant.value(-0.4), 1e-16);

    let sloped = CaptureCrossSection {
        max: 1e-15,
        cb0: 1e-16,
        gamma_cb: 0.1,
        vb0: 1e-16,
        gamma_vb: 0.0,
    };
    assert!((sloped.value(0.1) / (1e-16 * 1.0f64.exp()) - 1.0).abs() < 1e-12);
    assert_eq!(sloped.value(0.5), 1e-15);
    assert_eq!(sloped.value(-0.5), 1e-16);
}

#[test]
fn test_trap_character() {
    let mut dit = DitModel::default();
    assert_eq!(dit.character(), TrapCharacter::UpperDonorLowerAcceptor);
    assert!(dit.character().is_donor(0.2));
    assert!(!dit.character().is_donor(-0.2));
    dit.da = 0;
    assert!(!dit.character().is_donor(0.2));
    assert!(dit.character().is_donor(-0.2));
}

#[test]
fn test_constant_dit_capacitance() {
    // ∫ f(1-f)/Vt dE = 1 when the Fermi level is far from the band edges
    let si = Substrate::new(1e16, 21.0);
    let traps = InterfaceTraps::new(DitModel::constant(1e11), CaptureCrossSection::default());
    let grid = EnergyGrid::new(si.band_gap(), 0.001);
    let psi = si.fermi_depth() - 0.5;
    let cit = traps.capacitance(&si, psi, &grid);
    assert!((cit / (Q * 1e11) - 1.0).abs() < 1e-3, "cit = {cit}");
}

#[test]
fn test_trap_charge_follows_fermi_level() {
    let si = Substrate::new(1e16, 21.0);
    let traps = InterfaceTraps::new(DitModel::constant(1e11), CaptureCrossSection::default());
    let grid = EnergyGrid::new(si.band_gap(), 0.002);
    // upper-half donors empty, lower-half acceptors full: more band bending
    // towards depletion empties more donors
    let deep = traps.charge(&si, -0.6, &grid);
    let shallow = traps.charge(&si, 0.0, &grid);
    assert!(deep > shallow);
}

#[test]
fn test_swapped_character_shifts_charge_by_a_constant() {
    // swapping donors and acceptors moves q(N_upper - N_lower) of charge,
    // whatever the band bending
    let si = Substrate::new(1e16, 21.0);
    let grid = EnergyGrid::new(si.band_gap(), 0.002);
    let mut dit = DitModel::constant(1e11);
    let upper = InterfaceTraps::new(dit.clone(), CaptureCrossSection::default());
    dit.da = 0;
    let lower = InterfaceTraps::new(dit, CaptureCrossSection::default());

    let shift = |psi: f64| upper.charge(&si, psi, &grid) - lower.charge(&si, psi, &grid);
    let reference = shift(0.0);
    for psi in [-0.8, -0.5, -0.2, 0.1] {
        assert!((shift(psi) - reference).abs() < 1e-6 * Q * 1e11, "psi = {psi}");
    }
    // charge still falls as the Fermi level rises, and Cit is unchanged
    assert!(lower.charge(&si, -0.5, &grid) > lower.charge(&si, 0.0, &grid));
    assert_eq!(
        lower.capacitance(&si, -0.3, &grid),
        upper.capacitance(&si, -0.3, &grid)
    );
}

#[test]
fn test_energy_grid_nodes() {
    let grid = EnergyGrid::new(1.0, 0.125);
    assert_eq!(grid.points(), 9);
    assert_eq!(grid.depths().count(), grid.points());
    assert_eq!(grid.depths().last(), Some(1.0));
    assert!((grid.integrate(|_| 1.0) - 1.0).abs() < 1e-12);
    // a non-dividing step is shrunk so the last node sits on the band edge
    let grid = EnergyGrid::new(1.12, 0.3);
    assert_eq!(grid.points(), 5);
    assert!((grid.step() * 4.0 - 1.12).abs() < 1e-12);
    // a step wider than the gap still yields both edges and the midpoint
    assert_eq!(EnergyGrid::new(1.12, 5.0).points(), 3);
}
