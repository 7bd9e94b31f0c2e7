//! Execution-agent seam between the scheduler and the nodes it drives.
//!
//! The scheduler only ever talks to an [`ExecutionAgent`]. The crate ships
//! [`SimulatedCluster`], an in-process agent loaded from a TOML world file,
//! used by the `hgw` binary and by the scheduler's integration tests.

pub mod agent;
pub mod formulas;
pub mod ports;
pub mod sim;
pub mod world;

pub use agent::ExecutionAgent;
pub use formulas::{Durations, Formulas, StandardFormulas};
pub use ports::{LogPort, LogPorts, PortReader, NULL_PORT_DATA};
pub use sim::{DispatchRecord, SimulatedCluster, DEFAULT_DISPATCH_LOG};
pub use world::{ServerSpec, WorldFile};
