use tokio::time::sleep;
use tracing::{debug, info};

use hgw_model::{CyclePhase, Operation, TargetState, ThreadPlan};

use crate::dispatch::DispatchReport;
use crate::error::SchedulerError;
use crate::threads::PlanSkip;
use crate::timing::calculate_times;

use super::Scheduler;

/// What one batch did.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// No plan: the cycle was skipped entirely.
    Skipped(PlanSkip),
    /// Weaken-only cycle.
    Prep(DispatchReport),
    /// Hack-weaken, grow-weaken, grow and (unless skipped) hack, in order.
    Money(Vec<DispatchReport>),
}

fn log_state(stage: &str, batch_id: u64, target: &TargetState) {
    debug!(
        batch_id,
        target = %target.name,
        min_security = target.min_security,
        security = target.security,
        money = target.money,
        max_money = target.max_money,
        "loop.{}",
        stage
    );
}

fn log_threads(batch_id: u64, target: &str, plan: &ThreadPlan) {
    debug!(
        batch_id,
        target,
        phase = ?plan.phase,
        hack = plan.hack,
        grow = plan.grow,
        prep_weaken = plan.prep_weaken,
        grow_weaken = plan.grow_weaken,
        hack_weaken = plan.hack_weaken,
        budget = plan.budget,
        "loop.threads"
    );
}

impl Scheduler {
    /// Run one batch against `name`, sleeping between dispatches so the
    /// effects land in order. Under-filled dispatches do not stop the batch.
    pub async fn run_batch(&self, batch_id: u64, name: &str) -> Result<BatchOutcome, SchedulerError> {
        let target = self.agent.target_state(name).await?;
        let skill = self.agent.current_skill().await?;
        let durations = self.agent.formulas().durations(&target, skill);
        let times = calculate_times(&durations, self.config.margin());

        let plan = match self.size_cycle(&target, skill) {
            Ok(plan) => plan,
            Err(skip) => {
                debug!(batch_id, target = name, reason = %skip, "batch skipped");
                return Ok(BatchOutcome::Skipped(skip));
            }
        };

        let verbose = self.config.debug_enabled();
        if verbose {
            log_threads(batch_id, name, &plan);
            log_state("start", batch_id, &target);
        }

        let outcome = match plan.phase {
            CyclePhase::Prep => {
                let report = self
                    .dispatcher
                    .dispatch(Operation::Weaken, plan.prep_weaken as f64, name)
                    .await?;
                info!(batch_id, target = name, "weakening {} for {:?}", name, times.weaken_time);
                sleep(times.weaken_time + times.margin).await;
                BatchOutcome::Prep(report)
            }
            CyclePhase::Money => {
                let mut reports = Vec::with_capacity(4);
                reports.push(
                    self.dispatcher
                        .dispatch(Operation::Weaken, plan.hack_weaken as f64, name)
                        .await?,
                );
                sleep(times.weaken_lead).await;

                reports.push(
                    self.dispatcher
                        .dispatch(Operation::Weaken, plan.grow_weaken as f64, name)
                        .await?,
                );
                sleep(times.grow_lead).await;

                reports.push(
                    self.dispatcher
                        .dispatch(Operation::Grow, plan.grow as f64, name)
                        .await?,
                );
                sleep(times.hack_after_grow()).await;

                if target.money_ratio() >= self.config.hack_money_thresh {
                    reports.push(
                        self.dispatcher
                            .dispatch(Operation::Hack, plan.hack as f64, name)
                            .await?,
                    );
                } else {
                    debug!(
                        batch_id,
                        target = name,
                        money_ratio = target.money_ratio(),
                        "hack skipped, money below threshold"
                    );
                }
                sleep(times.hack_time + times.trailing_margin).await;
                BatchOutcome::Money(reports)
            }
        };

        if verbose {
            let end = self.agent.target_state(name).await?;
            log_state("end", batch_id, &end);
        }
        Ok(outcome)
    }
}
