//! Batch dispatcher: packs threads onto the worker pool.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use hgw_exec::ExecutionAgent;
use hgw_model::{MemoryCosts, NodeState, Operation};

use crate::error::SchedulerError;
use crate::pool::WorkerPool;

/// Where the threads of one dispatch go.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub requested: u64,
    pub assignments: Vec<(String, u64)>,
    pub remaining: u64,
}

/// Pack `requested` threads onto `pool`, smallest free memory first.
///
/// Weaken and grow take partial fills on any node. Hack only takes a
/// partial fill on the last (largest) node and skips smaller nodes that
/// cannot hold the whole remainder.
pub fn allocate(
    op: Operation,
    requested: u64,
    mut pool: Vec<NodeState>,
    cost: f64,
    home_node: &str,
    reserved: f64,
) -> Allocation {
    pool.sort_by(|a, b| a.free_memory().total_cmp(&b.free_memory()));

    let mut remaining = requested;
    let mut assignments = Vec::new();
    let last = pool.len().saturating_sub(1);

    for (i, node) in pool.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let mut usable = node.max_memory;
        if node.name == home_node {
            usable -= reserved;
        }
        let capacity = ((usable - node.used_memory) / cost).floor().max(0.0) as u64;

        let local = if op.allows_partial_fill() {
            remaining.min(capacity)
        } else if remaining > capacity {
            if i == last {
                capacity
            } else {
                continue;
            }
        } else {
            remaining
        };

        if local < 1 {
            continue;
        }
        remaining -= local;
        assignments.push((node.name.clone(), local));
    }

    Allocation {
        requested,
        assignments,
        remaining,
    }
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub op: Operation,
    pub argument: String,
    pub requested: u64,
    /// Threads actually started, per node.
    pub placed: Vec<(String, u64)>,
    pub remaining: u64,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn placed_threads(&self) -> u64 {
        self.placed.iter().map(|(_, t)| t).sum()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    agent: Arc<dyn ExecutionAgent>,
    pool: WorkerPool,
    costs: MemoryCosts,
    home_node: String,
    reserved: f64,
}

impl Dispatcher {
    pub fn new(
        agent: Arc<dyn ExecutionAgent>,
        costs: MemoryCosts,
        home_node: impl Into<String>,
        reserved: f64,
    ) -> Self {
        Self {
            pool: WorkerPool::new(Arc::clone(&agent)),
            agent,
            costs,
            home_node: home_node.into(),
            reserved,
        }
    }

    /// Start `threads` (rounded up) threads of `op` against `argument`.
    ///
    /// An under-filled dispatch is logged and reported, not an error: jobs
    /// already started keep running and the next cycle re-attempts.
    pub async fn dispatch(
        &self,
        op: Operation,
        threads: f64,
        argument: &str,
    ) -> Result<DispatchReport, SchedulerError> {
        let rounded = threads.ceil();
        if rounded.is_nan() || rounded == f64::INFINITY {
            error!(%op, threads, target = argument, "refusing non-finite thread count");
            return Ok(DispatchReport {
                op,
                argument: argument.to_string(),
                requested: u64::MAX,
                placed: Vec::new(),
                remaining: u64::MAX,
            });
        }
        let requested = rounded.max(0.0) as u64;
        let cost = self.costs.of(op);

        let workers = self.pool.list_workers().await?;
        let free: f64 = workers.iter().map(NodeState::free_memory).sum();
        let allocation = allocate(op, requested, workers, cost, &self.home_node, self.reserved);

        let mut remaining = allocation.remaining;
        let mut placed = Vec::with_capacity(allocation.assignments.len());
        for (node, count) in allocation.assignments {
            let started = match self.agent.transfer_payload(op, &node).await {
                Ok(()) => self.agent.dispatch(op, &node, count, argument).await,
                Err(e) => Err(e),
            };
            match started {
                Ok(pid) => {
                    debug!(%op, node = %node, threads = count, target = argument, pid, "dispatched");
                    placed.push((node, count));
                }
                Err(e) => {
                    // another cycle may have taken the memory since the poll
                    warn!(%op, node = %node, threads = count, error = %e, "dispatch rejected");
                    remaining += count;
                }
            }
        }

        if remaining > 0 {
            error!(
                %op,
                threads = requested,
                remaining,
                target = argument,
                required = cost * requested as f64,
                free,
                "spawn failed"
            );
        }

        Ok(DispatchReport {
            op,
            argument: argument.to_string(),
            requested,
            placed,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, max: f64, used: f64) -> NodeState {
        NodeState {
            name: name.into(),
            max_memory: max,
            used_memory: used,
            has_rights: true,
            processes: 0,
        }
    }

    /// Free capacity of 10, 10 and 100 threads at 10 units per thread.
    fn pool() -> Vec<NodeState> {
        vec![
            node("large", 1_000.0, 0.0),
            node("small-a", 100.0, 0.0),
            node("small-b", 150.0, 50.0),
        ]
    }

    fn assigned(a: &Allocation) -> Vec<(&str, u64)> {
        a.assignments.iter().map(|(n, t)| (n.as_str(), *t)).collect()
    }

    #[test]
    fn weaken_fills_small_nodes_first() {
        let a = allocate(Operation::Weaken, 15, pool(), 10.0, "home", 0.0);
        assert_eq!(assigned(&a), vec![("small-a", 10), ("small-b", 5)]);
        assert_eq!(a.remaining, 0);
    }

    #[test]
    fn grow_partial_fills_across_nodes() {
        let a = allocate(Operation::Grow, 115, pool(), 10.0, "home", 0.0);
        assert_eq!(assigned(&a), vec![("small-a", 10), ("small-b", 10), ("large", 95)]);
        assert_eq!(a.remaining, 0);
    }

    #[test]
    fn hack_skips_small_nodes() {
        let a = allocate(Operation::Hack, 25, pool(), 10.0, "home", 0.0);
        assert_eq!(assigned(&a), vec![("large", 25)]);
        assert_eq!(a.remaining, 0);
    }

    #[test]
    fn hack_takes_small_node_that_fits() {
        let a = allocate(Operation::Hack, 10, pool(), 10.0, "home", 0.0);
        assert_eq!(assigned(&a), vec![("small-a", 10)]);
    }

    #[test]
    fn hack_partial_only_on_largest() {
        let nodes = vec![
            node("a", 100.0, 0.0),
            node("b", 100.0, 0.0),
            node("c", 200.0, 0.0),
        ];
        let a = allocate(Operation::Hack, 25, nodes, 10.0, "home", 0.0);
        assert_eq!(assigned(&a), vec![("c", 20)]);
        assert_eq!(a.remaining, 5);
    }

    #[test]
    fn reserve_applies_to_home_only() {
        let nodes = vec![node("home", 100.0, 0.0), node("other", 100.0, 0.0)];
        let a = allocate(Operation::Weaken, 20, nodes, 10.0, "home", 40.0);
        let total: u64 = a.assignments.iter().map(|(_, t)| t).sum();
        assert_eq!(total, 16);
        assert_eq!(a.remaining, 4);
        assert!(a.assignments.contains(&("home".to_string(), 6)));
    }

    #[test]
    fn empty_pool_leaves_everything() {
        let a = allocate(Operation::Weaken, 7, Vec::new(), 1.0, "home", 0.0);
        assert!(a.assignments.is_empty());
        assert_eq!(a.remaining, 7);
    }

    #[test]
    fn zero_request_allocates_nothing() {
        let a = allocate(Operation::Grow, 0, pool(), 10.0, "home", 0.0);
        assert!(a.assignments.is_empty());
        assert_eq!(a.remaining, 0);
    }
}
