//! Navigation counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::result::{NavigationResult, StrategyKind};

#[derive(Debug, Default)]
pub struct NavigationStats {
    requests: AtomicU64,
    successes: AtomicU64,
    partial_successes: AtomicU64,
    failures: AtomicU64,
    rejected: AtomicU64,
    data_preserved: AtomicU64,
    cancelled: AtomicU64,
    back_navigations: AtomicU64,
    primary_wins: AtomicU64,
    fallback_wins: AtomicU64,
    emergency_wins: AtomicU64,
    persistence_failures: AtomicU64,
}

/// Point-in-time copy of [`NavigationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavigationStatsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub partial_successes: u64,
    /// Validated requests that did not reach a success result
    pub failures: u64,
    /// Requests rejected by precondition checks
    pub rejected: u64,
    pub data_preserved: u64,
    pub cancelled: u64,
    pub back_navigations: u64,
    pub primary_wins: u64,
    pub fallback_wins: u64,
    pub emergency_wins: u64,
    pub persistence_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl NavigationStats {
    pub(crate) fn record_request(&self) {
        bump(&self.requests);
    }

    pub(crate) fn record_rejected(&self) {
        bump(&self.rejected);
    }

    pub(crate) fn record_cancelled(&self) {
        bump(&self.cancelled);
    }

    pub(crate) fn record_back(&self) {
        bump(&self.back_navigations);
    }

    pub(crate) fn record_persistence_failure(&self) {
        bump(&self.persistence_failures);
    }

    /// Count the final result of a validated request.
    pub(crate) fn record_result(&self, result: NavigationResult, strategy: Option<StrategyKind>) {
        match result {
            NavigationResult::Success => bump(&self.successes),
            NavigationResult::PartialSuccess => bump(&self.partial_successes),
            NavigationResult::DataPreserved => {
                bump(&self.data_preserved);
                bump(&self.failures);
            }
            _ => bump(&self.failures),
        }
        match strategy {
            Some(StrategyKind::Primary) => bump(&self.primary_wins),
            Some(StrategyKind::Fallback) => bump(&self.fallback_wins),
            Some(StrategyKind::Emergency) => bump(&self.emergency_wins),
            None => {}
        }
    }

    pub fn snapshot(&self) -> NavigationStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        NavigationStatsSnapshot {
            requests: load(&self.requests),
            successes: load(&self.successes),
            partial_successes: load(&self.partial_successes),
            failures: load(&self.failures),
            rejected: load(&self.rejected),
            data_preserved: load(&self.data_preserved),
            cancelled: load(&self.cancelled),
            back_navigations: load(&self.back_navigations),
            primary_wins: load(&self.primary_wins),
            fallback_wins: load(&self.fallback_wins),
            emergency_wins: load(&self.emergency_wins),
            persistence_failures: load(&self.persistence_failures),
        }
    }
}

impl NavigationStatsSnapshot {
    /// Share of validated requests that ended in a success result.
    pub fn success_rate(&self) -> f64 {
        let settled = self.successes + self.partial_successes + self.failures;
        if settled == 0 {
            1.0
        } else {
            (self.successes + self.partial_successes) as f64 / settled as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accounting() {
        let stats = NavigationStats::default();
        stats.record_result(NavigationResult::Success, Some(StrategyKind::Primary));
        stats.record_result(NavigationResult::DataPreserved, Some(StrategyKind::Emergency));
        stats.record_result(NavigationResult::FailedCritical, None);

        let snap = stats.snapshot();
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.failures, 2);
        assert_eq!(snap.data_preserved, 1);
        assert_eq!(snap.primary_wins, 1);
        assert_eq!(snap.emergency_wins, 1);
        assert!((snap.success_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_success_rate() {
        assert_eq!(NavigationStatsSnapshot::default().success_rate(), 1.0);
    }
}
