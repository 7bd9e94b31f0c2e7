use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use hgw_model::HgwError;

use crate::error::SchedulerError;
use crate::timing::calculate_times;

use super::{BatchOutcome, Scheduler};

impl Scheduler {
    async fn is_eligible(&self, name: &str) -> Result<bool, SchedulerError> {
        let target = self.agent.target_state(name).await?;
        let skill = self.agent.current_skill().await?;
        let eligible =
            target.required_skill as f64 <= skill as f64 * self.config.eligibility_ratio;
        if !eligible {
            debug!(
                target = name,
                required = target.required_skill,
                skill,
                "waiting for eligibility"
            );
        }
        Ok(eligible)
    }

    /// Park until the target's required skill is within reach, re-polling
    /// every `eligibility_poll`. Returns `false` if the target does not exist.
    pub async fn wait_until_eligible(&self, name: &str) -> bool {
        loop {
            match self.is_eligible(name).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(SchedulerError::Agent(HgwError::TargetNotFound(_))) => {
                    error!(target = name, "unknown target, dropping it");
                    return false;
                }
                Err(e) => warn!(target = name, error = %e, "eligibility poll failed"),
            }
            sleep(self.config.eligibility_poll()).await;
        }
    }

    /// How long to wait before starting the next overlapping cycle:
    /// `max(4 x margin [+ weaken time while prepping], batch length / concurrency)`.
    pub async fn next_cycle_delay(&self, name: &str) -> Result<Duration, SchedulerError> {
        let target = self.agent.target_state(name).await?;
        let skill = self.agent.current_skill().await?;
        let durations = self.agent.formulas().durations(&target, skill);
        let times = calculate_times(&durations, self.config.margin());

        let mut floor = times.trailing_margin;
        if target.needs_prep(self.config.prep_thresh) {
            floor += times.weaken_time;
        }
        let share = times.batch_length() / self.config.concurrency;
        Ok(floor.max(share))
    }

    /// Drive one target forever: wait for eligibility, then keep launching
    /// batches, letting up to `concurrency` of them overlap. An unknown
    /// target ends only its own loop.
    ///
    /// A batch that outlives the next-cycle deadline keeps running in its own
    /// task. With `once` set the loop runs a single batch to completion.
    pub async fn target_loop(self: Arc<Self>, name: String) {
        if !self.wait_until_eligible(&name).await {
            return;
        }
        info!(target = %name, "target eligible, starting cycles");

        let mut batch_id: u64 = 0;
        loop {
            batch_id += 1;
            let delay = match self.next_cycle_delay(&name).await {
                Ok(delay) => delay,
                Err(e) => {
                    warn!(target = %name, error = %e, "failed to compute next cycle delay");
                    self.config.eligibility_poll()
                }
            };

            let scheduler = Arc::clone(&self);
            let target = name.clone();
            let mut batch = tokio::spawn(async move {
                match scheduler.run_batch(batch_id, &target).await {
                    Ok(BatchOutcome::Skipped(_)) => false,
                    Ok(_) => true,
                    Err(e) => {
                        warn!(batch_id, target = %target, error = %e, "batch failed");
                        false
                    }
                }
            });

            if self.config.once {
                if let Err(e) = batch.await {
                    error!(batch_id, target = %name, error = %e, "batch task panicked");
                }
                return;
            }

            let deadline = sleep(delay);
            tokio::pin!(deadline);
            tokio::select! {
                finished = &mut batch => {
                    let productive = match finished {
                        Ok(productive) => productive,
                        Err(e) => {
                            error!(batch_id, target = %name, error = %e, "batch task panicked");
                            false
                        }
                    };
                    // nothing was dispatched, so wait out the deadline
                    // instead of spinning
                    if !productive {
                        deadline.await;
                    }
                }
                _ = &mut deadline => {
                    debug!(batch_id, target = %name, ?delay, "overlapping next cycle");
                }
            }
        }
    }
}
