//! Consecutive-failure circuit breaker.
//!
//! Observability only: an open breaker makes `is_healthy()` false but never
//! stops a navigation from being attempted. There is no time-based reset;
//! only a success closes it.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: AtomicU32,
    trips: AtomicU64,
}

impl CircuitBreaker {
    /// A zero threshold is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            trips: AtomicU64::new(0),
        }
    }

    /// Count a failure. Returns true when this failure opened the breaker.
    pub fn record_failure(&self) -> bool {
        let failures = self
            .consecutive_failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        let opened = failures == self.threshold;
        if opened {
            self.trips.fetch_add(1, Ordering::Relaxed);
        }
        opened
    }

    /// Reset the failure count. Returns true when the breaker was open.
    pub fn record_success(&self) -> bool {
        self.consecutive_failures.swap(0, Ordering::AcqRel) >= self.threshold
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures.load(Ordering::Acquire) >= self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// How many times the breaker has opened.
    pub fn trips(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(crate::config::BreakerConfig::default().failure_threshold)
    }
}
