//! One-shot broadcast gate.
//!
//! Host registration happens exactly once per process, so waiters block on
//! a gate that opens once and stays open. Unlike a semaphore it is never
//! re-armed: after `fire()` every `wait` returns immediately, forever.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct OneShotGate {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl OneShotGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate and wake every waiter. Returns `true` only for the call
    /// that actually opened it.
    pub fn fire(&self) -> bool {
        let mut fired = self.fired.lock().unwrap_or_else(|e| e.into_inner());
        if *fired {
            return false;
        }
        *fired = true;
        self.cond.notify_all();
        true
    }

    pub fn is_fired(&self) -> bool {
        *self.fired.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until the gate opens or `timeout` elapses. Returns whether it is open.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let fired = self.fired.lock().unwrap_or_else(|e| e.into_inner());
        if *fired {
            return true;
        }
        let (fired, _) = self
            .cond
            .wait_timeout_while(fired, timeout, |fired| !*fired)
            .unwrap_or_else(|e| e.into_inner());
        *fired
    }
}
