//! Worker pool accounting. Nothing is cached: every call re-polls every node.

use std::sync::Arc;

use serde::Serialize;

use hgw_exec::ExecutionAgent;
use hgw_model::{HgwError, NodeState};

/// One consistent poll of the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub free: f64,
    pub used: f64,
    pub installed: f64,
    pub processes: usize,
}

#[derive(Clone)]
pub struct WorkerPool {
    agent: Arc<dyn ExecutionAgent>,
}

impl WorkerPool {
    pub fn new(agent: Arc<dyn ExecutionAgent>) -> Self {
        Self { agent }
    }

    /// Nodes with execution rights and non-zero capacity.
    pub async fn list_workers(&self) -> Result<Vec<NodeState>, HgwError> {
        let mut workers = Vec::new();
        for name in self.agent.list_nodes().await? {
            let node = self.agent.node_state(&name).await?;
            if node.is_worker() {
                workers.push(node);
            }
        }
        Ok(workers)
    }

    pub async fn stats(&self) -> Result<PoolStats, HgwError> {
        let workers = self.list_workers().await?;
        Ok(workers.iter().fold(
            PoolStats {
                workers: workers.len(),
                ..PoolStats::default()
            },
            |mut acc, node| {
                acc.free += node.free_memory();
                acc.used += node.used_memory;
                acc.installed += node.max_memory;
                acc.processes += node.processes;
                acc
            },
        ))
    }

    pub async fn free_memory(&self) -> Result<f64, HgwError> {
        Ok(self.stats().await?.free)
    }

    pub async fn used_memory(&self) -> Result<f64, HgwError> {
        Ok(self.stats().await?.used)
    }

    pub async fn installed_memory(&self) -> Result<f64, HgwError> {
        Ok(self.stats().await?.installed)
    }

    pub async fn active_process_count(&self) -> Result<usize, HgwError> {
        Ok(self.stats().await?.processes)
    }
}

#[cfg(test)]
mod tests {
    use hgw_exec::{SimulatedCluster, WorldFile};

    use super::*;

    const WORLD: &str = r#"
[[server]]
name = "home"
max_memory = 64
used_memory = 4

[[server]]
name = "locked"
max_memory = 32
rights = false

[[server]]
name = "empty"
max_memory = 0

[[server]]
name = "pserv-0"
max_memory = 16
"#;

    fn pool() -> WorkerPool {
        let sim = SimulatedCluster::from_world(WorldFile::from_toml_str(WORLD).unwrap());
        WorkerPool::new(Arc::new(sim))
    }

    #[tokio::test]
    async fn skips_nodes_without_rights_or_memory() {
        let names: Vec<_> = pool()
            .list_workers()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["home".to_string(), "pserv-0".to_string()]);
    }

    #[tokio::test]
    async fn sums_memory_over_workers() {
        let pool = pool();
        assert_eq!(pool.installed_memory().await.unwrap(), 80.0);
        assert_eq!(pool.used_memory().await.unwrap(), 4.0);
        assert_eq!(pool.free_memory().await.unwrap(), 76.0);
        assert_eq!(pool.active_process_count().await.unwrap(), 0);
    }
}
