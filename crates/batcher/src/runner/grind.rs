use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use hgw_model::Operation;

use crate::error::SchedulerError;
use crate::targets::best_grind_target;

use super::Scheduler;

impl Scheduler {
    /// Weaken threads left over once every target's budget is committed,
    /// discounted by the oversubscription factor. Never negative.
    pub async fn grinding_threads(&self) -> Result<f64, SchedulerError> {
        let installed = self.pool.installed_memory().await?;
        let committed = self.budget.total() * (1.0 - self.config.memory_oversubscription);
        // whole threads only: the dispatcher rounds up, which would ask for
        // one thread more than the leftover holds
        Ok(((installed - committed) / self.costs.weaken).floor().max(0.0))
    }

    /// One grinding step. Returns how long to wait before the next one, or
    /// `None` when no grind target qualifies.
    pub async fn grind_once(&self) -> Result<Option<Duration>, SchedulerError> {
        let Some(name) = best_grind_target(self.agent.as_ref(), &self.config.home_node).await?
        else {
            return Ok(None);
        };

        let threads = self.grinding_threads().await?;
        let report = self
            .dispatcher
            .dispatch(Operation::Weaken, threads, &name)
            .await?;

        let target = self.agent.target_state(&name).await?;
        let skill = self.agent.current_skill().await?;
        let weaken = self.agent.formulas().durations(&target, skill).weaken;
        debug!(
            target = %name,
            threads = report.placed_threads(),
            remaining = report.remaining,
            ?weaken,
            "grinding"
        );
        Ok(Some(weaken + self.config.margin()))
    }

    /// Fill leftover memory with weaken jobs against the easiest target.
    pub async fn grind_loop(self: Arc<Self>) {
        info!("grinding enabled");
        loop {
            let delay = match self.grind_once().await {
                Ok(Some(delay)) => delay,
                Ok(None) => {
                    debug!("no grind target available");
                    self.config.grind_retry()
                }
                Err(e) => {
                    warn!(error = %e, "grinding step failed");
                    self.config.grind_retry()
                }
            };
            sleep(delay).await;
            if self.config.once {
                return;
            }
        }
    }
}
