use hgw_model::HgwError;

/// Error type for the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Agent(#[from] HgwError),

    /// Memory held by unrelated jobs exceeds what the reserve allows.
    #[error("Too much memory used elsewhere: {used:.2} in use, {allowed:.2} allowed")]
    ExternalMemoryUsage { used: f64, allowed: f64 },
}
