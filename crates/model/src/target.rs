use serde::{Deserialize, Serialize};

/// Live state of a target, polled fresh before every decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub name: String,
    pub max_money: f64,
    pub money: f64,
    /// Minimum security ("difficulty").
    pub min_security: f64,
    pub security: f64,
    /// Skill level needed before any operation affects this target.
    pub required_skill: u32,
    /// Growth parameter used by the grow model.
    pub growth: f64,
}

impl TargetState {
    /// A cycle preps (weakens only) while security exceeds `min * threshold`.
    pub fn needs_prep(&self, prep_thresh: f64) -> bool {
        self.security > self.min_security * prep_thresh
    }

    pub fn money_ratio(&self) -> f64 {
        if self.max_money > 0.0 {
            self.money / self.max_money
        } else {
            0.0
        }
    }

    /// Security above the floor, never negative.
    pub fn extra_security(&self) -> f64 {
        (self.security - self.min_security).max(0.0)
    }
}
