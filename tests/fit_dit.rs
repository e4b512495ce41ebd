#[test]
fn test_fit_recovers_profile_from_estimates() {
    use gpwexact::config::{SimulationConfig, TrapLevelSweep};
    use gpwexact::loader::DitMeasurements;
    use gpwexact::mos_model::physics::interface_traps::DitModel;
    use gpwexact::mos_model::physics::surface_potential::{
        log_dit_error, simulated_annealing, AnnealingSchedule,
    };
    use gpwexact::Simulation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let truth = DitModel {
        midgap: 5e10,
        c0: 2e8,
        beta_c: 0.12,
        v0: 2e8,
        beta_v: 0.12,
        da: 1,
    };
    let config = SimulationConfig {
        trap_levels: TrapLevelSweep {
            n_et: 7,
            et_min: 0.2,
            et_max: 0.8,
        },
        dit: truth.clone(),
        sigma_qf: Some(0.0),
        ..SimulationConfig::default()
    };
    let result = Simulation::new(config).unwrap().run().unwrap();
    let all = DitMeasurements {
        et: result.levels.iter().map(|l| l.et).collect(),
        e_minus_ei: result.levels.iter().map(|l| l.e_minus_ei).collect(),
        dit: result.levels.iter().map(|l| l.dit_estimate).collect(),
        peak_resolved: result.levels.iter().map(|l| l.peak_resolved).collect(),
    };
    // the 0.8 eV peak falls below the lowest frequency
    assert!(!all.peak_resolved[6]);
    let data = all.resolved();
    assert_eq!(data.len(), 6);

    let mut model = DitModel::constant(1e11);
    let mut rng = StdRng::seed_from_u64(7);
    let (initial, best) = simulated_annealing(
        &mut model,
        |m| log_dit_error(m, &data.e_minus_ei, &data.dit),
        &AnnealingSchedule::default(),
        &mut rng,
    );
    assert!(best < initial);
    // estimates follow the true profile to a few percent
    assert!(best < 1e-2, "{best}");
    assert!(log_dit_error(&truth, &data.e_minus_ei, &data.dit) < 1e-3);
}
