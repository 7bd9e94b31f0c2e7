use serde::{Deserialize, Serialize};

/// Point-in-time view of a compute node, as reported by the execution agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub name: String,
    /// Installed memory capacity.
    pub max_memory: f64,
    /// Memory currently held by running jobs (ours or anyone else's).
    pub used_memory: f64,
    /// Whether jobs may be started on this node.
    pub has_rights: bool,
    /// Number of running jobs.
    pub processes: usize,
}

impl NodeState {
    pub fn free_memory(&self) -> f64 {
        (self.max_memory - self.used_memory).max(0.0)
    }

    /// Nodes that can host work: execution rights and non-zero capacity.
    pub fn is_worker(&self) -> bool {
        self.has_rights && self.max_memory > 0.0
    }
}
