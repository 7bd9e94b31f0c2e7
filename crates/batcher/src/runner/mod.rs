//! Scheduler runner -- per-target batch loops, grinding, and startup.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, preflight, and plan helpers
//! - `batch`: one batch cycle for one target
//! - `target_loop`: eligibility wait and overlapping batch cycles
//! - `grind`: leftover-memory weaken loop
//! - `execution`: spawning every loop and waiting on them

mod batch;
mod core;
mod execution;
mod grind;
mod target_loop;

pub use self::batch::BatchOutcome;
pub use self::core::Scheduler;
