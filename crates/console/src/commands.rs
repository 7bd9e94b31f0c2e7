use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use hgw_batcher::tools::{
    resolve_spread_targets, spread_weaken, status_report, SpreadSelection, StatusRow,
};
use hgw_batcher::Scheduler;
use hgw_exec::ExecutionAgent;
use hgw_model::SchedulerConfig;

/// Scheduler options from a TOML file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SchedulerConfig> {
    let Some(path) = path else {
        return Ok(SchedulerConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

pub async fn run(agent: Arc<dyn ExecutionAgent>, config: SchedulerConfig) -> Result<()> {
    config.log_summary();
    let scheduler = Scheduler::new(agent, config)
        .await
        .context("failed to start scheduler")?;
    Arc::new(scheduler).run().await.context("scheduler stopped")?;
    Ok(())
}

pub async fn scan(agent: &dyn ExecutionAgent, home_node: &str, json: bool) -> Result<()> {
    let rows = status_report(agent, home_node)
        .await
        .context("failed to read cluster state")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    println!("{}", StatusRow::header());
    for row in &rows {
        println!("{}", row);
    }
    Ok(())
}

pub async fn weaken(
    agent: Arc<dyn ExecutionAgent>,
    args: &[String],
    home_node: &str,
) -> Result<()> {
    let selection = SpreadSelection::from_args(args);
    let targets = resolve_spread_targets(agent.as_ref(), &selection, home_node)
        .await
        .context("failed to resolve weaken targets")?;
    if targets.is_empty() {
        warn!(?selection, "nothing to weaken");
        return Ok(());
    }

    let plan = spread_weaken(agent, &targets)
        .await
        .context("weaken dispatch failed")?;
    info!(
        total_threads = plan.total_threads,
        per_target = plan.per_target,
        dispatches = plan.placed.len(),
        "weaken workers spawned"
    );
    Ok(())
}
