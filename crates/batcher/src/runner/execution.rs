use std::sync::Arc;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, info, warn};

use hgw_exec::LogPort;

use crate::error::SchedulerError;
use crate::monitor::{monitoring_loop, relay};
use crate::targets::valid_targets;

use super::Scheduler;

impl Scheduler {
    /// Configured targets, or every valid target when none were named.
    pub async fn resolve_targets(&self) -> Result<Vec<String>, SchedulerError> {
        if !self.config.targets.is_empty() {
            return Ok(self.config.targets.clone());
        }
        Ok(valid_targets(
            self.agent.as_ref(),
            &self.config.home_node,
            self.config.eligibility_ratio,
        )
        .await?)
    }

    fn spawn_background(&self) -> Result<Vec<AbortHandle>, SchedulerError> {
        let ports = self.agent.ports();
        let mut handles = Vec::with_capacity(4);
        for (port, enabled) in [
            (LogPort::Trace, self.config.trace),
            (LogPort::Debug, self.config.debug_enabled()),
            (LogPort::Info, true),
        ] {
            let reader = ports.reader(port)?;
            handles.push(tokio::spawn(relay(reader, enabled)).abort_handle());
        }
        handles.push(
            tokio::spawn(monitoring_loop(
                self.pool.clone(),
                self.memory_budget(),
                self.config.monitor_interval(),
                Arc::clone(&self.monitor),
            ))
            .abort_handle(),
        );
        Ok(handles)
    }

    /// Run the scheduler: preflight, relays and monitor, then one loop per
    /// target plus the grinding loop. Returns once every loop has returned,
    /// which only happens in `once` mode.
    pub async fn run(self: Arc<Self>) -> Result<(), SchedulerError> {
        self.preflight().await?;

        let background = self.spawn_background()?;
        // let the relays attach before the first dispatch
        tokio::time::sleep(Duration::from_millis(10)).await;

        let targets = self.resolve_targets().await?;
        if targets.is_empty() && !self.config.grind {
            warn!("no targets to schedule");
        }

        // prime the budget so grinding does not claim memory the target
        // loops are about to use
        for name in &targets {
            match self.plan_threads(name).await {
                Ok(Ok(plan)) => debug!(target = %name, budget = plan.budget, "primed budget"),
                Ok(Err(skip)) => debug!(target = %name, reason = %skip, "no budget yet"),
                Err(e) => warn!(target = %name, error = %e, "failed to prime budget"),
            }
        }
        info!(
            targets = ?targets,
            committed = self.budget.total(),
            budgets = ?self.budget.snapshot(),
            grind = self.config.grind,
            "starting loops"
        );

        let mut loops = JoinSet::new();
        for name in targets {
            loops.spawn(Arc::clone(&self).target_loop(name));
        }
        if self.config.grind {
            loops.spawn(Arc::clone(&self).grind_loop());
        }
        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "loop task failed");
            }
        }

        for handle in background {
            handle.abort();
        }
        info!("scheduler stopped");
        Ok(())
    }
}
