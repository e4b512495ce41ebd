use super::constant::{
    EG_0, EG_ALPHA, EG_BETA, ESI, K, M_THERMAL, NC_300, NV_300, Q, ZERO_CELSIUS,
};

/// Below this |u| the charge expression is replaced by its series limit.
const SMALL_U: f64 = 1e-6;

/// Varshni band gap of silicon [eV] at `t` kelvin.
pub fn band_gap(t: f64) -> f64 {
    EG_0 - EG_ALPHA * t * t / (t + EG_BETA)
}

/// Uniformly doped n-type silicon substrate in thermal equilibrium.
#[derive(Clone, Debug, PartialEq)]
pub struct Substrate {
    // ドナー濃度[個/cm^3]
    nd: f64,
    // 絶対温度[K]
    t: f64,
    // 熱電圧 kT/q [V]
    vt: f64,
    eg: f64,
    nc: f64,
    nv: f64,
    ni: f64,
    n0: f64,
    p0: f64,
}

impl Substrate {
    pub fn new(nd: f64, temperature_c: f64) -> Self {
        let t = temperature_c + ZERO_CELSIUS;
        let vt = K * t / Q;
        let eg = band_gap(t);
        let scale = (t / 300.0).powf(1.5);
        let nc = NC_300 * scale;
        let nv = NV_300 * scale;
        let ni = (nc * nv).sqrt() * (-eg / (2.0 * vt)).exp();
        let half = 0.5 * nd;
        let n0 = half + (half * half + ni * ni).sqrt();
        let p0 = ni * ni / n0;

        Self {
            nd: nd,
            t: t,
            vt: vt,
            eg: eg,
            nc: nc,
            nv: nv,
            ni: ni,
            n0: n0,
            p0: p0,
        }
    }

    pub fn doping(&self) -> f64 {
        self.nd
    }

    pub fn temperature(&self) -> f64 {
        self.t
    }

    pub fn thermal_voltage(&self) -> f64 {
        self.vt
    }

    pub fn band_gap(&self) -> f64 {
        self.eg
    }

    pub fn nc(&self) -> f64 {
        self.nc
    }

    pub fn nv(&self) -> f64 {
        self.nv
    }

    pub fn intrinsic_density(&self) -> f64 {
        self.ni
    }

    pub fn electron_density(&self) -> f64 {
        self.n0
    }

    pub fn hole_density(&self) -> f64 {
        self.p0
    }

    // Ec - EF [eV]
    pub fn fermi_depth(&self) -> f64 {
        self.vt * (self.nc / self.n0).ln()
    }

    // Ec - Ei [eV]
    pub fn midgap_depth(&self) -> f64 {
        0.5 * self.eg + 0.5 * self.vt * (self.nc / self.nv).ln()
    }

    pub fn bulk_potential(&self) -> f64 {
        self.midgap_depth() - self.fermi_depth()
    }

    // 電子の熱速度[cm/s]
    pub fn thermal_velocity(&self) -> f64 {
        (3.0 * K * self.t / M_THERMAL).sqrt() * 100.0
    }

    // デバイ長[cm]
    pub fn debye_length(&self) -> f64 {
        (ESI * self.vt / (Q * self.n0)).sqrt()
    }

    // 表面の電子密度[個/cm^3]
    pub fn surface_electron_density(&self, psi: f64) -> f64 {
        self.nc * (-(self.fermi_depth() - psi) / self.vt).exp()
    }

    pub fn inversion_onset(&self) -> f64 {
        -2.0 * self.bulk_potential()
    }

    fn charge_scale(&self) -> f64 {
        (2.0 * ESI * K * self.t * self.n0).sqrt()
    }

    fn field_function(&self, u: f64, minority: bool) -> (f64, f64) {
        let r = if minority { self.p0 / self.n0 } else { 0.0 };
        let f = (u.exp_m1() - u) + r * ((-u).exp_m1() + u);
        let df = u.exp_m1() - r * (-u).exp_m1();
        (f.max(0.0), df)
    }

    // 半導体の電荷[C/cm^2]
    pub fn charge(&self, psi: f64) -> f64 {
        let u = psi / self.vt;
        let (f, _) = self.field_function(u, true);
        -u.signum() * self.charge_scale() * f.sqrt()
    }

    fn capacitance_with(&self, psi: f64, minority: bool) -> f64 {
        let u = psi / self.vt;
        let r = if minority { self.p0 / self.n0 } else { 0.0 };
        if u.abs() < SMALL_U {
            return self.charge_scale() / self.vt * (0.5 * (1.0 + r)).sqrt();
        }
        let (f, df) = self.field_function(u, minority);
        self.charge_scale() / self.vt * df.abs() / (2.0 * f.sqrt())
    }

    pub fn capacitance(&self, psi: f64) -> f64 {
        self.capacitance_with(psi, true)
    }

    /// High-frequency capacitance: minority carriers frozen, depletion width
    /// pinned once strong inversion is reached.
    pub fn hf_capacitance(&self, psi: f64) -> f64 {
        self.capacitance_with(psi.max(self.inversion_onset()), false)
    }
}

#[test]
fn test_intrinsic_density_at_room_temperature() {
    let si = Substrate::new(1e16, 26.85);
    let ni = si.intrinsic_density();
    assert!(ni > 5e9 && ni < 2e10, "ni = {ni}");
    assert!((si.band_gap() - 1.1245).abs() < 5e-3);
}

#[test]
fn test_carrier_densities() {
    let si = Substrate::new(1e16, 21.0);
    assert!((si.electron_density() / 1e16 - 1.0).abs() < 1e-9);
    let ni = si.intrinsic_density();
    assert!((si.electron_density() * si.hole_density() / (ni * ni) - 1.0).abs() < 1e-9);
    assert!((si.surface_electron_density(0.0) / si.electron_density() - 1.0).abs() < 1e-9);
    assert!(si.fermi_depth() > 0.0 && si.fermi_depth() < si.midgap_depth());
}

#[test]
fn test_flatband_capacitance_is_debye() {
    let si = Substrate::new(1e16, 21.0);
    let expected = ESI / si.debye_length();
    let cs = si.capacitance(0.0);
    assert!((cs / expected - 1.0).abs() < 1e-6, "{cs} vs {expected}");
    // continuous across the series cut-off
    let near = si.capacitance(10.0 * SMALL_U * si.thermal_voltage());
    assert!((near / cs - 1.0).abs() < 1e-3);
}

#[test]
fn test_charge_sign() {
    let si = Substrate::new(1e16, 21.0);
    assert!(si.charge(0.1) < 0.0);
    assert!(si.charge(-0.3) > 0.0);
    assert_eq!(si.charge(0.0), 0.0);
    // depletion: Qs ~ sqrt(2 q eps nd (|psi| - vt))
    let psi: f64 = -0.3;
    let depletion = (2.0 * Q * ESI * 1e16 * (psi.abs() - si.thermal_voltage())).sqrt();
    assert!((si.charge(psi) / depletion - 1.0).abs() < 1e-2);
}

#[test]
fn test_hf_capacitance_pins_in_inversion() {
    let si = Substrate::new(1e16, 21.0);
    let onset = si.inversion_onset();
    let pinned = si.hf_capacitance(onset);
    assert_eq!(si.hf_capacitance(onset - 0.3), pinned);
    assert!(si.capacitance(onset - 0.3) > pinned);
}
