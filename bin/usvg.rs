use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use gpwexact::config::SimulationConfig;
use gpwexact::{output, plot, Simulation};

/// Surface potential against gate voltage, without the admittance sweep.
#[derive(Parser)]
#[command(name = "usvg")]
struct Cli {
    /// JSON parameter file; built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output CSV, overrides `output.usvg`
    #[arg(short, long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Write a PNG plot to this file
    #[arg(long, value_name = "FILE")]
    plot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(out) = &cli.outfile {
        config.output.usvg = out.clone();
    }

    let sim = Simulation::new(config).context("invalid parameters")?;
    let points = sim.usvg().context("gate sweep failed")?;
    let path = &sim.config().output.usvg;
    output::write_usvg(path, &points)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("{} points written to {}", points.len(), path.display());

    if let Some(png) = &cli.plot {
        plot::plot_usvg(png, &points)
            .with_context(|| format!("failed to plot {}", png.display()))?;
    }

    Ok(())
}
