use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Last computed memory requirement per target.
///
/// Each target loop writes only its own key; the grinding loop and the
/// monitor read the total. Estimates only, never reconciled with usage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBudget {
    inner: Arc<RwLock<HashMap<String, f64>>>,
}

impl MemoryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, target: &str, budget: f64) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(target.to_string(), budget);
        }
    }

    pub fn get(&self, target: &str) -> Option<f64> {
        self.inner.read().ok()?.get(target).copied()
    }

    /// Sum of every target's committed budget.
    pub fn total(&self) -> f64 {
        self.inner
            .read()
            .map(|map| map.values().sum())
            .unwrap_or(0.0)
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.inner.read().map(|map| map.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_per_target() {
        let budget = MemoryBudget::new();
        budget.record("a", 10.0);
        budget.record("b", 5.0);
        budget.record("a", 20.0);
        assert_eq!(budget.get("a"), Some(20.0));
        assert_eq!(budget.total(), 25.0);
    }

    #[test]
    fn clones_share_state() {
        let budget = MemoryBudget::new();
        let handle = budget.clone();
        handle.record("x", 3.0);
        assert_eq!(budget.get("x"), Some(3.0));
        assert_eq!(budget.snapshot().len(), 1);
    }

    #[test]
    fn empty_total_is_zero() {
        assert_eq!(MemoryBudget::new().total(), 0.0);
        assert_eq!(MemoryBudget::new().get("missing"), None);
    }
}
