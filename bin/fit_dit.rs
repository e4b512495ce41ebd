use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use gpwexact::config::SimulationConfig;
use gpwexact::loader;
use gpwexact::mos_model::physics::interface_traps::DitModel;
use gpwexact::mos_model::physics::surface_potential::{
    log_dit_error, simulated_annealing, AnnealingSchedule,
};

/// Fits the U-shaped Dit profile to the Dit estimates of a data file.
#[derive(Parser)]
#[command(name = "fit-dit")]
struct Cli {
    /// Data CSV written by gpwexact
    #[arg(default_value = gpwexact::config::DATA_FILENAME)]
    data: PathBuf,

    /// Parameter file holding the starting profile
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 20000)]
    epoch: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Write the fitted profile as JSON
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let all = loader::read_csv(&cli.data)
        .with_context(|| format!("failed to read {}", cli.data.display()))?;
    let measurements = all.resolved();
    if measurements.len() < all.len() {
        warn!(
            "skipping {} levels whose Gp/w peak lies outside the sweep",
            all.len() - measurements.len()
        );
    }
    if measurements.is_empty() {
        bail!("{} has no resolved rows", cli.data.display());
    }

    let mut model: DitModel = match &cli.config {
        Some(path) => {
            SimulationConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?
                .dit
        }
        None => DitModel::default(),
    };
    let schedule = AnnealingSchedule {
        epoch: cli.epoch,
        ..AnnealingSchedule::default()
    };
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let (initial, best) = simulated_annealing(
        &mut model,
        |m| log_dit_error(m, &measurements.e_minus_ei, &measurements.dit),
        &schedule,
        &mut rng,
    );
    info!(
        "fitted {} points: log10 error {:.4e} -> {:.4e}",
        measurements.len(),
        initial,
        best
    );

    let json = serde_json::to_string_pretty(&model)?;
    match &cli.output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?
        }
        None => println!("{json}"),
    }

    Ok(())
}
