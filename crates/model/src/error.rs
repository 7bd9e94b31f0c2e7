use thiserror::Error;

#[derive(Error, Debug)]
pub enum HgwError {
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("No execution rights on {0}")]
    NoRights(String),

    #[error("Payload for {operation} missing on {node}")]
    PayloadMissing { operation: String, node: String },

    #[error("Invalid thread count: {0}")]
    InvalidThreads(u64),

    #[error("Insufficient memory on {node}: required {required:.2}, free {free:.2}")]
    InsufficientMemory { node: String, required: f64, free: f64 },

    #[error("World file error: {0}")]
    World(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Agent error: {0}")]
    Agent(String),
}
