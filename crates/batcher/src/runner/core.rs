use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use hgw_exec::ExecutionAgent;
use hgw_model::{MemoryCosts, Operation, SchedulerConfig, TargetState, ThreadPlan, TimingPlan};

use crate::budget::MemoryBudget;
use crate::dispatch::Dispatcher;
use crate::error::SchedulerError;
use crate::monitor::MonitorStats;
use crate::pool::WorkerPool;
use crate::threads::{PlanSkip, ThreadCalculator};
use crate::timing::calculate_times;

/// The batch scheduler. Owns the shared memory budget and drives one loop
/// per target against an [`ExecutionAgent`].
pub struct Scheduler {
    pub(super) agent: Arc<dyn ExecutionAgent>,
    pub(super) config: SchedulerConfig,
    /// Per-thread memory costs, fixed for the run.
    pub(super) costs: MemoryCosts,
    pub(super) pool: WorkerPool,
    pub(super) dispatcher: Dispatcher,
    pub(super) budget: MemoryBudget,
    pub(super) monitor: Arc<RwLock<MonitorStats>>,
}

impl Scheduler {
    /// Validate the config and query per-thread memory costs once.
    pub async fn new(
        agent: Arc<dyn ExecutionAgent>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let costs = MemoryCosts {
            weaken: agent.memory_cost(Operation::Weaken).await?,
            grow: agent.memory_cost(Operation::Grow).await?,
            hack: agent.memory_cost(Operation::Hack).await?,
        };
        costs.validate()?;
        debug!(?costs, "memory costs");

        let dispatcher = Dispatcher::new(
            Arc::clone(&agent),
            costs,
            config.home_node.clone(),
            config.reserved,
        );
        Ok(Self {
            pool: WorkerPool::new(Arc::clone(&agent)),
            agent,
            config,
            costs,
            dispatcher,
            budget: MemoryBudget::new(),
            monitor: Arc::new(RwLock::new(MonitorStats::default())),
        })
    }

    /// Refuse to run when unrelated jobs already hold more memory than the
    /// reserve (plus our own footprint) allows.
    pub async fn preflight(&self) -> Result<(), SchedulerError> {
        let used = self.pool.used_memory().await?;
        let allowed = self.config.reserved + self.agent.self_memory().await?;
        if used > allowed {
            return Err(SchedulerError::ExternalMemoryUsage { used, allowed });
        }
        info!(used, allowed, "preflight passed");
        Ok(())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Handle to the shared budget map.
    pub fn memory_budget(&self) -> MemoryBudget {
        self.budget.clone()
    }

    /// Latest pool snapshot taken by the monitoring loop.
    pub fn monitor_stats(&self) -> MonitorStats {
        self.monitor.read().map(|s| *s).unwrap_or_default()
    }

    pub(crate) fn calculator(&self) -> ThreadCalculator<'_> {
        ThreadCalculator::new(&self.config, self.costs, self.agent.formulas())
    }

    /// Size a cycle from a snapshot. A successful plan's budget is recorded,
    /// rounded up, under the target's name.
    pub(crate) fn size_cycle(&self, target: &TargetState, skill: u32) -> Result<ThreadPlan, PlanSkip> {
        let plan = self.calculator().plan(target, skill)?;
        self.budget.record(&target.name, plan.budget.ceil());
        Ok(plan)
    }

    /// Poll the target and size a cycle.
    pub async fn plan_threads(
        &self,
        name: &str,
    ) -> Result<Result<ThreadPlan, PlanSkip>, SchedulerError> {
        let target = self.agent.target_state(name).await?;
        let skill = self.agent.current_skill().await?;
        Ok(self.size_cycle(&target, skill))
    }

    /// Poll the target and compute this instant's delay offsets.
    pub async fn plan_times(&self, name: &str) -> Result<TimingPlan, SchedulerError> {
        let target = self.agent.target_state(name).await?;
        let skill = self.agent.current_skill().await?;
        let durations = self.agent.formulas().durations(&target, skill);
        Ok(calculate_times(&durations, self.config.margin()))
    }
}
