//! hgw: batch scheduler console.
//!
//! Subcommands:
//! - `run`: per-target batch loops plus optional grinding
//! - `scan`: read-only status table
//! - `weaken`: weaken-only even split across targets

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hgw_exec::{ExecutionAgent, SimulatedCluster, WorldFile};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // merged before logging starts so the file's debug/trace take effect
    let config = match &cli.command {
        Command::Run(args) => {
            let base = commands::load_config(args.config.as_deref())?;
            Some(args.apply(&cli, base))
        }
        _ => None,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(cli.log_level(config.as_ref()))
        }))
        .with_target(false)
        .init();

    let world = WorldFile::load(&cli.world)
        .with_context(|| format!("failed to load world file {}", cli.world.display()))?;
    let agent: Arc<dyn ExecutionAgent> = Arc::new(SimulatedCluster::from_world(world));

    match &cli.command {
        // always merged above
        Command::Run(_) => commands::run(agent, config.unwrap_or_default()).await,
        Command::Scan { json } => commands::scan(agent.as_ref(), &cli.home_node, *json).await,
        Command::Weaken { targets } => commands::weaken(agent, targets, &cli.home_node).await,
    }
}
