use std::sync::Arc;

use tracing::{debug, info, warn};

use hgw_exec::ExecutionAgent;
use hgw_model::{HgwError, Operation};

use crate::pool::WorkerPool;
use crate::targets::{best_grind_target, servers};

/// Money floor for the `all` selection.
const ALL_MIN_MONEY: f64 = 1_000_000.0;
/// Purchased servers are workers, never weaken targets.
const PURCHASED_PREFIX: &str = "pserv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadSelection {
    /// The grind heuristic's pick.
    Best,
    /// Every rich target below the current skill.
    All,
    Named(Vec<String>),
}

impl SpreadSelection {
    /// No arguments means `best`.
    pub fn from_args(args: &[String]) -> Self {
        match args {
            [] => Self::Best,
            [one] if one == "best" => Self::Best,
            [one] if one == "all" => Self::All,
            names => Self::Named(names.to_vec()),
        }
    }
}

pub async fn resolve_spread_targets(
    agent: &dyn ExecutionAgent,
    selection: &SpreadSelection,
    home_node: &str,
) -> Result<Vec<String>, HgwError> {
    match selection {
        SpreadSelection::Best => Ok(best_grind_target(agent, home_node).await?.into_iter().collect()),
        SpreadSelection::All => {
            let skill = agent.current_skill().await?;
            Ok(servers(agent)
                .await?
                .into_iter()
                .map(|(_, target)| target)
                .filter(|t| {
                    t.required_skill < skill
                        && t.name != home_node
                        && !t.name.starts_with(PURCHASED_PREFIX)
                        && t.max_money > ALL_MIN_MONEY
                })
                .map(|t| t.name)
                .collect())
        }
        SpreadSelection::Named(names) => Ok(names.clone()),
    }
}

/// Result of one even split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadPlan {
    pub total_threads: u64,
    pub per_target: u64,
    /// `(target, node, threads)` per dispatch.
    pub placed: Vec<(String, String, u64)>,
}

/// Split every free weaken thread in the pool evenly across `targets`,
/// filling workers in listing order.
pub async fn spread_weaken(
    agent: Arc<dyn ExecutionAgent>,
    targets: &[String],
) -> Result<SpreadPlan, HgwError> {
    if targets.is_empty() {
        warn!("no weaken targets");
        return Ok(SpreadPlan::default());
    }

    let cost = agent.memory_cost(Operation::Weaken).await?;
    let workers = WorkerPool::new(Arc::clone(&agent)).list_workers().await?;
    let total_threads: u64 = workers
        .iter()
        .map(|w| (w.free_memory() / cost).floor() as u64)
        .sum();
    let per_target = total_threads / targets.len() as u64;
    info!(total_threads, per_target, targets = ?targets, "spawning weaken workers");

    let mut plan = SpreadPlan {
        total_threads,
        per_target,
        placed: Vec::new(),
    };
    for target in targets {
        let mut remaining = per_target;
        for worker in &workers {
            if remaining == 0 {
                break;
            }
            // earlier targets may already have used this node
            let node = agent.node_state(&worker.name).await?;
            let threads = remaining.min((node.free_memory() / cost).floor() as u64);
            if threads == 0 {
                continue;
            }
            agent.transfer_payload(Operation::Weaken, &node.name).await?;
            let pid = agent.dispatch(Operation::Weaken, &node.name, threads, target).await?;
            debug!(target = %target, node = %node.name, threads, pid, "weaken dispatched");
            remaining -= threads;
            plan.placed.push((target.clone(), node.name, threads));
        }
        if remaining > 0 {
            warn!(target = %target, remaining, "pool exhausted before target was filled");
        }
    }
    Ok(plan)
}
