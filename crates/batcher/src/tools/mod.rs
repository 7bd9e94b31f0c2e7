//! Auxiliary one-shot tools built on the same agent interface:
//! - `report`: read-only status table of reachable targets
//! - `spread`: weaken-only even split of every free thread

pub mod report;
pub mod spread;

pub use report::{status_report, StatusRow};
pub use spread::{resolve_spread_targets, spread_weaken, SpreadPlan, SpreadSelection};
