//! Property-based tests for the trap and MOS models.

use gpwexact::config::SimulationConfig;
use gpwexact::mos_model::admittance::{FluctuationMethod, SurfaceSamples, TrapBranches};
use gpwexact::mos_model::physics::interface_traps::{CaptureCrossSection, DitModel};
use gpwexact::mos_model::physics::surface_potential::MosCapacitor;
use gpwexact::mos_model::physics::traits::EnergyProfile;
use proptest::prelude::*;

fn dit_model() -> impl Strategy<Value = DitModel> {
    (8.0f64..12.0, 5.0f64..10.0, 0.05f64..0.4, 5.0f64..10.0, 0.05f64..0.4, 0u8..2).prop_map(
        |(m, c0, bc, v0, bv, da)| DitModel {
            midgap: 10f64.powf(m),
            c0: 10f64.powf(c0),
            beta_c: bc,
            v0: 10f64.powf(v0),
            beta_v: bv,
            da: da,
        },
    )
}

proptest! {
    /// Dit never drops below its midgap value and grows towards both band edges.
    #[test]
    fn dit_is_u_shaped(model in dit_model(), e in 1e-3f64..0.55, de in 1e-3f64..0.05) {
        prop_assert!(model.value(e) >= model.midgap);
        prop_assert!(model.value(-e) >= model.midgap);
        prop_assert!(model.value(e + de) > model.value(e));
        prop_assert!(model.value(-e - de) > model.value(-e));
    }

    /// The capture cross section is capped.
    #[test]
    fn capture_cross_section_is_capped(
        log_cb0 in -18.0f64..-12.0,
        gamma in 0.0f64..0.3,
        log_max in -16.0f64..-13.0,
        e in -0.6f64..0.6,
    ) {
        let capture = CaptureCrossSection {
            max: 10f64.powf(log_max),
            cb0: 10f64.powf(log_cb0),
            gamma_cb: gamma,
            vb0: 10f64.powf(log_cb0),
            gamma_vb: gamma,
        };
        let sigma = capture.value(e);
        prop_assert!(sigma > 0.0);
        prop_assert!(sigma <= capture.max);
    }

    /// Quadrature weights are normalized and centred on the mean.
    #[test]
    fn quadrature_is_normalized(
        mean in -0.8f64..0.2,
        sigma in 1e-4f64..0.05,
        half in 1usize..40,
    ) {
        let method = FluctuationMethod::Quadrature { points: 2 * half + 1 };
        let s = SurfaceSamples::gaussian(mean, sigma, &method, 0).unwrap();
        let total: f64 = s.weight.iter().sum();
        let centre: f64 = s.psi.iter().zip(s.weight.iter()).map(|(p, w)| p * w).sum();
        prop_assert!((total - 1.0).abs() < 1e-12);
        prop_assert!((centre - mean).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Vg(psi_s) increases with psi_s and the solver inverts it.
    #[test]
    fn gate_voltage_is_invertible(
        log_nd in 14.5f64..18.0,
        tox_nm in 5.0f64..50.0,
        psi in -0.7f64..0.2,
        dit in dit_model(),
    ) {
        let config = SimulationConfig {
            doping: 10f64.powf(log_nd),
            t_oxide: tox_nm * 1e-7,
            dit: dit,
            ..SimulationConfig::default()
        };
        let mos = MosCapacitor::from_config(&config);
        let vg = mos.gate_voltage(psi);
        prop_assert!(mos.gate_voltage(psi + 1e-3) > vg);
        let solved = mos.solve_surface_potential(vg).unwrap();
        prop_assert!((solved - psi).abs() < 1e-7, "{} vs {}", solved, psi);
    }

    /// Trap admittance is passive: non-negative conductance at every frequency.
    #[test]
    fn trap_conductance_is_non_negative(
        psi in -0.6f64..0.1,
        log_omega in -2.0f64..8.0,
        dit in dit_model(),
    ) {
        let config = SimulationConfig { dit: dit, ..SimulationConfig::default() };
        let mos = MosCapacitor::from_config(&config);
        let branches = TrapBranches::new(&mos, psi);
        let y = branches.admittance(10f64.powf(log_omega), None);
        prop_assert!(y.re >= 0.0);
        prop_assert!(y.im >= 0.0);
        prop_assert!(branches.capacitance() > 0.0);
    }
}
