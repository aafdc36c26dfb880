//! Headless chase: the player car hunts NPC cars around a walled arena

use std::path::PathBuf;

use chase::prelude::*;
use clap::Parser;
use log::info;

/// Run the chase simulation without a window
#[derive(Parser)]
#[command(name = "chase")]
#[command(about = "Headless vehicle chase simulation")]
#[command(version)]
struct Cli {
    /// Configuration file (.ron or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticks to run (overrides the configuration)
    #[arg(short, long)]
    ticks: Option<u32>,

    /// Random seed (overrides the configuration)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Leave the player parked instead of chasing
    #[arg(long)]
    parked: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.sim.seed = seed;
    }
    let ticks = cli.ticks.unwrap_or(config.sim.ticks);

    let driver: Box<dyn IntentSource> = if cli.parked {
        Box::new(ScriptedIntent(SteeringIntent::NEUTRAL))
    } else {
        Box::new(PursuitAutopilot::default())
    };

    info!("running {ticks} ticks");
    let mut sim = Simulation::new(config, driver)?;
    sim.run(ticks);

    let seconds = ticks as f32 * sim.config().sim.dt;
    info!("final score {} after {seconds:.1}s", sim.score());
    info!("{}", sim.stats().format_stats());
    for (state, count) in sim.stats().histogram() {
        info!("  {state:<14} {count}");
    }
    Ok(())
}
