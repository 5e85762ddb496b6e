use anyhow::Context;
use clap::Parser;
use single_lane_bridge::adapters::outbound::{init_combined_logger, init_console_logger};
use single_lane_bridge::application::{ArrivalMode, SimulationService};
use single_lane_bridge::domains::bridge::AdmissionPolicy;
use single_lane_bridge::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Farmers crossing a single-lane bridge from both ends.
#[derive(Parser, Debug)]
#[command(name = "single-lane-bridge")]
#[command(version)]
#[command(about = "Simulate northbound and southbound farmers sharing a single-lane bridge", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Number of northbound farmers
    #[arg(long)]
    north: Option<usize>,

    /// Number of southbound farmers
    #[arg(long)]
    south: Option<usize>,

    /// Arrival order: staggered or grouped
    #[arg(long)]
    arrival: Option<ArrivalMode>,

    /// Admission policy: classic or drain-first
    #[arg(long)]
    policy: Option<AdmissionPolicy>,

    /// Seed for crossing times and arrival order
    #[arg(long)]
    seed: Option<u64>,

    /// Shortest crossing time in milliseconds
    #[arg(long)]
    min_ms: Option<u64>,

    /// Longest crossing time in milliseconds
    #[arg(long)]
    max_ms: Option<u64>,

    /// Longest pause between two arrivals in milliseconds
    #[arg(long)]
    stagger_ms: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(north) = self.north {
            config.simulation.northbound_agents = north;
        }
        if let Some(south) = self.south {
            config.simulation.southbound_agents = south;
        }
        if let Some(policy) = self.policy {
            config.simulation.policy = policy;
        }
        if let Some(mode) = self.arrival {
            config.arrival.mode = mode;
        }
        if let Some(seed) = self.seed {
            config.arrival.seed = Some(seed);
        }
        if let Some(stagger_ms) = self.stagger_ms {
            config.arrival.max_stagger_ms = stagger_ms;
        }
        if let Some(min_ms) = self.min_ms {
            config.crossing.min_ms = min_ms;
        }
        if let Some(max_ms) = self.max_ms {
            config.crossing.max_ms = max_ms;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("invalid logging filter")?;
    // Not `fmt().init()`: that would claim the `log` backend the file narrator needs.
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt().with_env_filter(filter).finish(),
    )?;

    let logger = match &config.logging.file {
        Some(path) => init_combined_logger(path, config.log_level()),
        None => init_console_logger(),
    };

    info!(
        north = config.simulation.northbound_agents,
        south = config.simulation.southbound_agents,
        policy = ?config.simulation.policy,
        arrival = ?config.arrival.mode,
        "configuration loaded"
    );

    println!("Single-Lane Bridge Simulation ({:?} arrivals)", config.arrival.mode);
    println!("------------------------------------------------------------");

    let service = SimulationService::from_config(&config, logger)?;
    let report = service.run().await?;

    println!("------------------------------------------------------------");
    println!(
        "Single-Lane Bridge Simulation Finished. {} northbound and {} southbound crossings, {} direction changes.",
        report.crossings.north, report.crossings.south, report.direction_changes
    );

    Ok(())
}
