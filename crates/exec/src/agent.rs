use async_trait::async_trait;

use hgw_model::{HgwError, NodeState, Operation, TargetState};

use crate::formulas::Formulas;
use crate::ports::LogPorts;

/// Everything the scheduler needs from the environment that runs its jobs.
///
/// Implementations own node and target state; the scheduler never caches
/// it and re-polls before every decision.
#[async_trait]
pub trait ExecutionAgent: Send + Sync {
    /// Names of every known node, eligible or not.
    async fn list_nodes(&self) -> Result<Vec<String>, HgwError>;

    async fn node_state(&self, name: &str) -> Result<NodeState, HgwError>;

    async fn target_state(&self, name: &str) -> Result<TargetState, HgwError>;

    /// The operator's current skill level.
    async fn current_skill(&self) -> Result<u32, HgwError>;

    /// Memory one thread of `op` holds while running.
    async fn memory_cost(&self, op: Operation) -> Result<f64, HgwError>;

    /// Memory held by the scheduler process itself.
    async fn self_memory(&self) -> Result<f64, HgwError> {
        Ok(0.0)
    }

    /// Copy the payload for `op` onto `node`.
    async fn transfer_payload(&self, op: Operation, node: &str) -> Result<(), HgwError>;

    /// Start `threads` threads of `op` on `node` against `argument`.
    /// Returns the id of the started job.
    async fn dispatch(
        &self,
        op: Operation,
        node: &str,
        threads: u64,
        argument: &str,
    ) -> Result<u64, HgwError>;

    /// Analysis formulas matching this environment.
    fn formulas(&self) -> &dyn Formulas;

    /// Log-forwarding ports written by running jobs.
    fn ports(&self) -> &LogPorts;
}
