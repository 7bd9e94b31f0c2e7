use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HgwError;

/// The three remote operations a batch is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Weaken,
    Grow,
    Hack,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Weaken => "weaken",
            Operation::Grow => "grow",
            Operation::Hack => "hack",
        }
    }

    /// Payload shipped to a worker before the operation can run there.
    pub fn payload(&self) -> &'static str {
        match self {
            Operation::Weaken => "/hgw/rpc-weaken.js",
            Operation::Grow => "/hgw/rpc-grow.js",
            Operation::Hack => "/hgw/rpc-hack.js",
        }
    }

    /// Hack threads must not be fragmented across small nodes.
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, Operation::Hack)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-thread memory cost of each operation, queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryCosts {
    pub weaken: f64,
    pub grow: f64,
    pub hack: f64,
}

impl MemoryCosts {
    /// Every cost must be a positive, finite amount of memory.
    pub fn validate(&self) -> Result<(), HgwError> {
        for (name, cost) in [("weaken", self.weaken), ("grow", self.grow), ("hack", self.hack)] {
            if !(cost.is_finite() && cost > 0.0) {
                return Err(HgwError::Config(format!(
                    "{} memory cost must be positive, got {}",
                    name, cost
                )));
            }
        }
        Ok(())
    }

    pub fn of(&self, op: Operation) -> f64 {
        match op {
            Operation::Weaken => self.weaken,
            Operation::Grow => self.grow,
            Operation::Hack => self.hack,
        }
    }
}

impl Default for MemoryCosts {
    fn default() -> Self {
        Self {
            weaken: 1.75,
            grow: 1.75,
            hack: 1.7,
        }
    }
}
