use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HgwError;

/// Scheduler configuration. Every recognised option with its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Safety buffer between dependent dispatches, in milliseconds.
    #[serde(default = "default_margin")]
    pub margin_ms: u64,
    /// Memory on the home node never offered to the pool.
    #[serde(default)]
    pub reserved: f64,
    /// Fraction of a target's money to hack per cycle.
    #[serde(default = "default_steal")]
    pub steal: f64,
    /// Share of committed budgets the grinder may overcommit.
    #[serde(default = "default_oversubscription")]
    pub memory_oversubscription: f64,
    /// Number of cycles allowed to overlap per target.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Explicit targets. Empty means "all valid targets".
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub grind: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub trace: bool,
    /// Security ratio above which a cycle preps instead of making money.
    #[serde(default = "default_prep_thresh")]
    pub prep_thresh: f64,
    /// Money ratio below which a money cycle skips its hack.
    #[serde(default)]
    pub hack_money_thresh: f64,
    /// CPU cores of the dispatching node.
    #[serde(default = "default_cores")]
    pub cores: u32,
    /// Upper bound on grow threads per cycle.
    #[serde(default)]
    pub max_grow_threads: Option<u64>,
    #[serde(default = "default_home_node")]
    pub home_node: String,
    /// A target loop starts once `required <= skill * ratio`.
    #[serde(default = "default_eligibility_ratio")]
    pub eligibility_ratio: f64,
    #[serde(default = "default_eligibility_poll")]
    pub eligibility_poll_ms: u64,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_ms: u64,
    #[serde(default = "default_grind_retry")]
    pub grind_retry_ms: u64,
    /// Run a single batch per loop and return.
    #[serde(default)]
    pub once: bool,
}

fn default_margin() -> u64 { 200 }
fn default_steal() -> f64 { 0.4 }
fn default_oversubscription() -> f64 { 0.2 }
fn default_concurrency() -> u32 { 2 }
fn default_prep_thresh() -> f64 { 1.10 }
fn default_cores() -> u32 { 1 }
fn default_home_node() -> String { "home".to_string() }
fn default_eligibility_ratio() -> f64 { 0.5 }
fn default_eligibility_poll() -> u64 { 60_000 }
fn default_monitor_interval() -> u64 { 5_000 }
fn default_grind_retry() -> u64 { 60_000 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            margin_ms: default_margin(),
            reserved: 0.0,
            steal: default_steal(),
            memory_oversubscription: default_oversubscription(),
            concurrency: default_concurrency(),
            targets: Vec::new(),
            grind: false,
            debug: false,
            trace: false,
            prep_thresh: default_prep_thresh(),
            hack_money_thresh: 0.0,
            cores: default_cores(),
            max_grow_threads: None,
            home_node: default_home_node(),
            eligibility_ratio: default_eligibility_ratio(),
            eligibility_poll_ms: default_eligibility_poll(),
            monitor_interval_ms: default_monitor_interval(),
            grind_retry_ms: default_grind_retry(),
            once: false,
        }
    }
}

impl SchedulerConfig {
    /// Check option ranges once at startup.
    pub fn validate(&self) -> Result<(), HgwError> {
        // steal * 1.25 must stay below 1 for the growth multiplier to be finite
        if !(self.steal > 0.0 && self.steal < 0.8) {
            return Err(HgwError::Config(format!(
                "steal must be in (0, 0.8), got {}",
                self.steal
            )));
        }
        if !(0.0..1.0).contains(&self.memory_oversubscription) {
            return Err(HgwError::Config(format!(
                "memory_oversubscription must be in [0, 1), got {}",
                self.memory_oversubscription
            )));
        }
        if self.concurrency == 0 {
            return Err(HgwError::Config("concurrency must be at least 1".into()));
        }
        if self.cores == 0 {
            return Err(HgwError::Config("cores must be at least 1".into()));
        }
        if !(self.reserved >= 0.0 && self.reserved.is_finite()) {
            return Err(HgwError::Config(format!(
                "reserved must be a non-negative number, got {}",
                self.reserved
            )));
        }
        if !(self.prep_thresh >= 1.0) {
            return Err(HgwError::Config(format!(
                "prep_thresh must be at least 1.0, got {}",
                self.prep_thresh
            )));
        }
        if !(0.0..=1.0).contains(&self.hack_money_thresh) {
            return Err(HgwError::Config(format!(
                "hack_money_thresh must be in [0, 1], got {}",
                self.hack_money_thresh
            )));
        }
        if !(self.eligibility_ratio > 0.0) {
            return Err(HgwError::Config("eligibility_ratio must be positive".into()));
        }
        Ok(())
    }

    pub fn margin(&self) -> Duration {
        Duration::from_millis(self.margin_ms)
    }

    pub fn eligibility_poll(&self) -> Duration {
        Duration::from_millis(self.eligibility_poll_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn grind_retry(&self) -> Duration {
        Duration::from_millis(self.grind_retry_ms)
    }

    /// Trace output implies debug output.
    pub fn debug_enabled(&self) -> bool {
        self.debug || self.trace
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config:");
        tracing::info!("  timing:      margin={}ms concurrency={}", self.margin_ms, self.concurrency);
        tracing::info!(
            "  sizing:      steal={} cores={} max_grow={:?}",
            self.steal,
            self.cores,
            self.max_grow_threads
        );
        tracing::info!(
            "  thresholds:  prep={} hack_money={}",
            self.prep_thresh,
            self.hack_money_thresh
        );
        tracing::info!(
            "  memory:      reserved={} on {} oversubscription={}",
            self.reserved,
            self.home_node,
            self.memory_oversubscription
        );
        tracing::info!(
            "  targets:     {}",
            if self.targets.is_empty() { "(auto)".to_string() } else { self.targets.join(",") }
        );
        tracing::info!("  grind:       {}", self.grind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.margin_ms, 200);
        assert_eq!(config.reserved, 0.0);
        assert_eq!(config.steal, 0.4);
        assert_eq!(config.memory_oversubscription, 0.2);
        assert_eq!(config.concurrency, 2);
        assert!(config.targets.is_empty());
        assert!(!config.grind);
        assert_eq!(config.prep_thresh, 1.10);
        assert_eq!(config.cores, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let config: SchedulerConfig = serde_json::from_str(r#"{"steal": 0.25}"#).unwrap();
        assert_eq!(config.steal, 0.25);
        assert_eq!(config.margin_ms, 200);
        assert_eq!(config.home_node, "home");
    }

    #[test]
    fn rejects_steal_that_breaks_growth() {
        let mut config = SchedulerConfig::default();
        config.steal = 0.8;
        assert!(config.validate().is_err());
        config.steal = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = SchedulerConfig::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_prep_thresh_below_one() {
        let mut config = SchedulerConfig::default();
        config.prep_thresh = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn trace_implies_debug() {
        let mut config = SchedulerConfig::default();
        assert!(!config.debug_enabled());
        config.trace = true;
        assert!(config.debug_enabled());
    }
}
