//! Periodic status snapshots and the log relays.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use hgw_exec::{LogPort, PortReader};

use crate::budget::MemoryBudget;
use crate::pool::{PoolStats, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub processes: usize,
    /// Used memory over committed budgets; `None` before any budget exists.
    pub utilization: Option<f64>,
    pub budget: f64,
    pub used: f64,
    pub free: f64,
    pub installed: f64,
}

impl MonitorSnapshot {
    pub fn new(stats: PoolStats, budget: f64) -> Self {
        Self {
            processes: stats.processes,
            utilization: (budget > 0.0).then(|| stats.used / budget),
            budget,
            used: stats.used,
            free: stats.free,
            installed: stats.installed,
        }
    }

    pub fn log(&self) {
        let ratio = self
            .utilization
            .map(|u| format!("{:.0}%", u * 100.0))
            .unwrap_or_else(|| "-".to_string());
        info!(
            processes = self.processes,
            utilization = %ratio,
            budget = self.budget,
            used = self.used,
            free = self.free,
            installed = self.installed,
            "pool status"
        );
    }
}

/// What the monitor has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonitorStats {
    /// Snapshots taken, including failed polls.
    pub ticks: u64,
    pub latest: Option<MonitorSnapshot>,
}

/// Emit a snapshot every `interval`, forever, keeping the latest in `stats`.
pub async fn monitoring_loop(
    pool: WorkerPool,
    budget: MemoryBudget,
    interval: Duration,
    stats: Arc<RwLock<MonitorStats>>,
) {
    loop {
        let snapshot = match pool.stats().await {
            Ok(pool_stats) => {
                let snapshot = MonitorSnapshot::new(pool_stats, budget.total());
                snapshot.log();
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "failed to poll worker pool");
                None
            }
        };
        if let Ok(mut s) = stats.write() {
            s.ticks += 1;
            if snapshot.is_some() {
                s.latest = snapshot;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// Forward one port's messages to the console while `enabled`.
/// Returns the number of messages forwarded once the port closes.
pub async fn relay(mut reader: PortReader, enabled: bool) -> usize {
    let port = reader.port();
    let mut forwarded = 0;
    while let Some(data) = reader.next().await {
        if !enabled {
            continue;
        }
        match port {
            LogPort::Trace => trace!(port = port.id(), "{}", data),
            LogPort::Debug => debug!(port = port.id(), "{}", data),
            LogPort::Info => info!(port = port.id(), "{}", data),
        }
        forwarded += 1;
    }
    forwarded
}
