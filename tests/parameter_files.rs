#[test]
fn test_current_parameter_file_matches_defaults() {
    use gpwexact::config::SimulationConfig;

    let config = SimulationConfig::from_file("params/gpwexact5.json").unwrap();
    assert_eq!(config, {
        let mut d = SimulationConfig::default();
        d.sigma_qf = Some(2e11);
        d
    });
}

#[test]
fn test_previous_parameter_file() {
    use gpwexact::config::SimulationConfig;
    use std::path::PathBuf;

    let config = SimulationConfig::from_file("params/gpwexact5_test.json").unwrap();
    assert_eq!(config.output.gpw, PathBuf::from("test.csv"));
    assert_eq!(config.doping, 2e17);
    assert_eq!(config.t_oxide, 17e-7);
    assert_eq!(config.fixed_charge, 1e13);
    assert_eq!(config.sigma_qf(), 8e11);
    assert_eq!(config.tunnel_width, 1e-7);
    assert_eq!(config.frequency.points_per_decade, 10);
    assert_eq!(config.dit.midgap, 3e10);
    assert_eq!(config.dit.c0, 1.36e7);
    assert_eq!(config.capture.cb0, 1.867e4);
    assert_eq!(config.capture.gamma_cb, 0.785);
    assert_eq!(config.capture.vb0, 1e12);
}

#[test]
fn test_previous_parameter_file_runs() {
    use gpwexact::config::SimulationConfig;
    use gpwexact::Simulation;

    let mut config = SimulationConfig::from_file("params/gpwexact5_test.json").unwrap();
    config.frequency.n_freq = 31;
    config.trap_levels.n_et = 2;
    config.usvg.n_vg = 5;
    let result = Simulation::new(config).unwrap().run().unwrap();
    assert_eq!(result.levels.len(), 2);
    assert!(result.gp_w.iter().all(|g| g.is_finite()));
}
