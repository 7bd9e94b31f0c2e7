pub mod config;
pub mod error;
pub mod node;
pub mod operation;
pub mod plan;
pub mod target;

pub use config::SchedulerConfig;
pub use error::HgwError;
pub use node::NodeState;
pub use operation::{MemoryCosts, Operation};
pub use plan::{CyclePhase, Landings, ThreadPlan, TimingPlan};
pub use target::TargetState;
