use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use gpwexact::config::{RunOverrides, SimulationConfig};
use gpwexact::{output, plot, Simulation};

/// Exact Gp/w of an n-type MOS capacitor with interface traps.
#[derive(Parser)]
#[command(name = "gpwexact")]
#[command(version)]
struct Cli {
    /// JSON parameter file; built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Standard deviation of the fixed charge [cm^-2]
    #[arg(long)]
    sigqf: Option<f64>,

    /// Tunneling depth of the traps into the oxide [cm]
    #[arg(long)]
    wtunnel: Option<f64>,

    /// Gp/w output file
    #[arg(short, long, value_name = "FILE")]
    outfile: Option<PathBuf>,

    /// Write PNG plots into this directory
    #[arg(long, value_name = "DIR")]
    plot: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    config.apply(&RunOverrides {
        sigma_qf: cli.sigqf,
        tunnel_width: cli.wtunnel,
        outfile: cli.outfile.clone(),
    });

    let sim = Simulation::new(config).context("invalid parameters")?;
    let result = sim.run().context("simulation failed")?;
    output::write_all(sim.config(), sim.device(), &result).context("failed to write results")?;

    if let Some(dir) = &cli.plot {
        plot::plot_all(dir, &result)
            .with_context(|| format!("failed to plot into {}", dir.display()))?;
        info!("plots written to {}", dir.display());
    }

    for level in &result.levels {
        println!(
            "Et = {:.3} eV  f_peak = {:.3e} Hz  Gp/qw max = {:.3e}  Dit = {:.3e} (est. {:.3e}{})",
            level.et,
            level.f_peak,
            level.gp_qw_peak,
            level.dit,
            level.dit_estimate,
            if level.peak_resolved { "" } else { ", unresolved" }
        );
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
