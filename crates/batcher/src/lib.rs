//! Memory-aware batch scheduler.
//!
//! For every target a loop sizes weaken/grow/hack threads against the
//! target's live state, computes the delays that make their effects land in
//! order, and packs the threads onto the worker pool. An optional grinding
//! loop fills leftover memory with weaken jobs.

pub mod budget;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod pool;
pub mod runner;
pub mod targets;
pub mod threads;
pub mod timing;
pub mod tools;

pub use budget::MemoryBudget;
pub use dispatch::{allocate, Allocation, DispatchReport, Dispatcher};
pub use error::SchedulerError;
pub use monitor::{MonitorSnapshot, MonitorStats};
pub use pool::{PoolStats, WorkerPool};
pub use runner::{BatchOutcome, Scheduler};
pub use threads::{PlanSkip, ThreadCalculator};
pub use timing::calculate_times;
