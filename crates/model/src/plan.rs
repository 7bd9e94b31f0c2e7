//! Per-cycle plans. Both are throwaway values recomputed every cycle.

use std::time::Duration;

use serde::Serialize;

/// Which branch a cycle takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CyclePhase {
    /// Security is above threshold: weaken only.
    Prep,
    /// Hack, grow and their counter-weakens.
    Money,
}

/// Thread counts for one target's cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadPlan {
    pub phase: CyclePhase,
    pub hack: u64,
    pub grow: u64,
    /// Weaken threads closing the gap to minimum security.
    pub prep_weaken: u64,
    /// Weaken threads offsetting the grow's security increase.
    pub grow_weaken: u64,
    /// Weaken threads offsetting the hack's security increase plus any residual gap.
    pub hack_weaken: u64,
    /// Aggregate memory requirement of all five counts.
    pub budget: f64,
}

impl ThreadPlan {
    pub fn weaken_total(&self) -> u64 {
        self.prep_weaken + self.grow_weaken + self.hack_weaken
    }
}

/// Delay offsets for one cycle, valid only for the instant they were computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingPlan {
    pub weaken_time: Duration,
    pub grow_time: Duration,
    pub hack_time: Duration,
    pub margin: Duration,
    pub grow_lead: Duration,
    pub hack_lead: Duration,
    pub weaken_lead: Duration,
    pub trailing_margin: Duration,
}

/// When each money-cycle dispatch completes, relative to cycle start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landings {
    pub hack: Duration,
    pub hack_weaken: Duration,
    pub grow: Duration,
    pub grow_weaken: Duration,
}

impl TimingPlan {
    /// Sleep between the grow dispatch and the hack dispatch.
    pub fn hack_after_grow(&self) -> Duration {
        self.hack_lead.saturating_sub(self.grow_lead)
    }

    /// Length of one full batch, used to pace overlapping cycles.
    pub fn batch_length(&self) -> Duration {
        self.weaken_time + self.margin * 4
    }

    pub fn grow_dispatch_at(&self) -> Duration {
        self.weaken_lead + self.grow_lead
    }

    pub fn hack_dispatch_at(&self) -> Duration {
        self.grow_dispatch_at() + self.hack_after_grow()
    }

    pub fn landings(&self) -> Landings {
        Landings {
            hack: self.hack_dispatch_at() + self.hack_time,
            hack_weaken: self.weaken_time,
            grow: self.grow_dispatch_at() + self.grow_time,
            grow_weaken: self.weaken_lead + self.weaken_time,
        }
    }
}
