use gpwexact::config::{FrequencySweep, GateSweep, SimulationConfig, TrapLevelSweep};
use std::path::PathBuf;

fn scratch_config(tag: &str) -> (PathBuf, SimulationConfig) {
    let dir = std::env::temp_dir().join(format!("gpwexact_{}_{}", tag, std::process::id()));
    let mut config = SimulationConfig {
        frequency: FrequencySweep {
            n_freq: 41,
            start_freq: 1.0,
            points_per_decade: 5,
        },
        trap_levels: TrapLevelSweep {
            n_et: 4,
            et_min: 0.25,
            et_max: 0.55,
        },
        usvg: GateSweep {
            vg_start: -2.0,
            vg_stop: 1.0,
            n_vg: 13,
        },
        ..SimulationConfig::default()
    };
    config.output.gpw = dir.join("gpw.csv");
    config.output.data = dir.join("data.csv");
    config.output.param = dir.join("param.csv");
    config.output.usvg = dir.join("usvg.csv");
    (dir, config)
}

fn read_table(path: &PathBuf) -> (Vec<String>, Vec<csv::StringRecord>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let header = rdr.headers().unwrap().iter().map(|s| s.to_owned()).collect();
    let rows = rdr.records().map(|r| r.unwrap()).collect();
    (header, rows)
}

#[test]
fn test_full_run_writes_all_files() {
    use gpwexact::{output, Simulation};

    let (dir, config) = scratch_config("run");
    let sim = Simulation::new(config).unwrap();
    let result = sim.run().unwrap();
    output::write_all(sim.config(), sim.device(), &result).unwrap();
    let out = &sim.config().output;

    let (header, rows) = read_table(&out.gpw);
    assert_eq!(header, ["et", "psi_s", "freq", "omega", "gp_w", "gp_qw", "cm", "gm"]);
    assert_eq!(rows.len(), 4 * 41);

    let (header, rows) = read_table(&out.data);
    assert_eq!(
        header,
        [
            "et",
            "e_minus_ei",
            "psi_s",
            "vg",
            "sigma_psi",
            "dit",
            "sigma_n",
            "tau",
            "f_peak",
            "gp_qw_peak",
            "dit_estimate",
            "peak_resolved"
        ]
    );
    assert_eq!(rows.len(), 4);

    let (header, rows) = read_table(&out.param);
    assert_eq!(header, ["name", "value", "unit"]);
    assert!(rows.iter().any(|r| &r[0] == "sigma_qf"));

    let (header, rows) = read_table(&out.usvg);
    assert_eq!(header, ["vg", "psi_s", "us", "qs", "qit", "cs", "cit", "c_lf", "c_hf"]);
    assert_eq!(rows.len(), 13);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_data_file_round_trips_through_loader() {
    use gpwexact::{loader, output, Simulation};

    let (dir, config) = scratch_config("loader");
    let sim = Simulation::new(config).unwrap();
    let result = sim.run().unwrap();
    output::write_data(&sim.config().output.data, &result.levels).unwrap();

    let m = loader::read_csv(&sim.config().output.data).unwrap();
    assert_eq!(m.len(), result.levels.len());
    for (i, level) in result.levels.iter().enumerate() {
        assert!((m.et[i] - level.et).abs() <= 1e-12 * level.et.abs());
        assert!((m.dit[i] - level.dit_estimate).abs() <= 1e-9 * level.dit_estimate.abs());
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_gp_w_peak_moves_to_lower_frequency_for_deeper_levels() {
    use gpwexact::Simulation;

    let (_, mut config) = scratch_config("peak");
    config.sigma_qf = Some(0.0);
    let result = Simulation::new(config).unwrap().run().unwrap();
    let gp_qw = result.gp_qw();
    for (i, level) in result.levels.iter().enumerate() {
        assert!(gp_qw.row(i).iter().all(|&g| g >= 0.0));
        assert!(level.gp_qw_peak > 0.0);
    }
    for w in result.levels.windows(2) {
        assert!(w[0].f_peak >= w[1].f_peak);
    }
}
