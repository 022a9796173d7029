//! Screen host registry.
//!
//! Holds the single [`ScreenHost`] the primary navigation strategy needs.
//! The host is registered once, after the application window is built;
//! navigation requests issued earlier block (bounded) on a one-shot gate.
//!
//! ## Validation
//!
//! - **Full**: content region AND outer container present. Runs at
//!   registration, on `revalidate()`, and on the first access after the host
//!   was marked stale.
//! - **Quick**: content region only. Runs on every hot-path access.
//!
//! The registry keeps a `Weak` reference: the application owns the host, and
//! a host that has been dropped simply fails validation.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::gate::OneShotGate;
use crate::clock::as_millis_u64;
use crate::collaborators::ScreenHost;
use crate::error::RegistryError;

/// Observable state of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// `set_host` has not been called yet
    Unregistered,
    /// Registered and passed its last check
    Ready,
    /// Registered but failed a check; next access runs full validation
    Stale,
    /// The application dropped the host
    Dropped,
}

pub struct HostRegistry {
    host: OnceLock<Weak<dyn ScreenHost>>,
    registration: Mutex<()>,
    gate: OneShotGate,
    stale: AtomicBool,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            host: OnceLock::new(),
            registration: Mutex::new(()),
            gate: OneShotGate::new(),
            stale: AtomicBool::new(false),
        }
    }

    /// Register the host. Only the first successful call has any effect.
    pub fn set_host(&self, host: &Arc<dyn ScreenHost>) -> Result<(), RegistryError> {
        if self.host.get().is_some() {
            warn!("Screen host already registered, ignoring second registration");
            return Err(RegistryError::AlreadyInitialized);
        }

        let _guard = self.registration.lock().unwrap_or_else(|e| e.into_inner());
        if self.host.get().is_some() {
            warn!("Screen host registered concurrently, ignoring second registration");
            return Err(RegistryError::AlreadyInitialized);
        }

        if let Err(reason) = full_validation(host.as_ref()) {
            warn!(%reason, "Rejected screen host registration");
            return Err(RegistryError::InvalidHost { reason });
        }

        if self.host.set(Arc::downgrade(host)).is_err() {
            return Err(RegistryError::AlreadyInitialized);
        }
        self.stale.store(false, Ordering::Release);
        self.gate.fire();
        info!("Screen host registered");
        Ok(())
    }

    /// Wait up to `timeout` for a registered, valid host.
    pub fn get_host(&self, timeout: Duration) -> Option<Arc<dyn ScreenHost>> {
        if !self.gate.wait_timeout(timeout) {
            debug!(
                timeout_ms = as_millis_u64(timeout),
                "Timed out waiting for screen host"
            );
            return None;
        }
        self.checked_host()
    }

    /// Non-blocking variant of [`get_host`](Self::get_host).
    pub fn get_host_immediate(&self) -> Option<Arc<dyn ScreenHost>> {
        if !self.gate.is_fired() {
            return None;
        }
        self.checked_host()
    }

    /// The registered host if it is still alive, without validating it.
    /// For callers that can place content when the region is gone.
    pub fn live_host(&self) -> Option<Arc<dyn ScreenHost>> {
        if !self.gate.is_fired() {
            return None;
        }
        self.host.get().and_then(Weak::upgrade)
    }

    /// Run full validation now. Returns whether the host passed.
    pub fn revalidate(&self) -> bool {
        let Some(host) = self.host.get().and_then(Weak::upgrade) else {
            if self.host.get().is_some() {
                self.stale.store(true, Ordering::Release);
            }
            return false;
        };
        match full_validation(host.as_ref()) {
            Ok(()) => {
                self.stale.store(false, Ordering::Release);
                true
            }
            Err(reason) => {
                warn!(%reason, "Screen host failed revalidation");
                self.stale.store(true, Ordering::Release);
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.gate.is_fired()
    }

    pub fn status(&self) -> HostStatus {
        match self.host.get() {
            None => HostStatus::Unregistered,
            Some(weak) if weak.strong_count() == 0 => HostStatus::Dropped,
            Some(_) if self.stale.load(Ordering::Acquire) => HostStatus::Stale,
            Some(_) => HostStatus::Ready,
        }
    }

    fn checked_host(&self) -> Option<Arc<dyn ScreenHost>> {
        let weak = self.host.get()?;
        let Some(host) = weak.upgrade() else {
            self.stale.store(true, Ordering::Release);
            warn!("Screen host was dropped by the application");
            return None;
        };

        if self.stale.load(Ordering::Acquire) {
            return match full_validation(host.as_ref()) {
                Ok(()) => {
                    debug!("Stale screen host passed full validation");
                    self.stale.store(false, Ordering::Release);
                    Some(host)
                }
                Err(reason) => {
                    warn!(%reason, "Stale screen host still invalid");
                    None
                }
            };
        }

        if host.content_region().is_some() {
            Some(host)
        } else {
            warn!("Screen host lost its content region, marking stale");
            self.stale.store(true, Ordering::Release);
            None
        }
    }
}

fn full_validation(host: &dyn ScreenHost) -> Result<(), String> {
    match (host.content_region().is_some(), host.outer_container().is_some()) {
        (true, true) => Ok(()),
        (false, true) => Err("content region missing".to_string()),
        (true, false) => Err("outer container missing".to_string()),
        (false, false) => Err("content region and outer container missing".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ContainerHandle, ContentRegion, ScreenController, ViewNode};
    use crate::error::{HostError, TransitionError};
    use checkout_types::ScreenId;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    struct NullRegion;

    impl ContentRegion for NullRegion {
        fn replace_content(&self, _root: ViewNode) -> Result<(), HostError> {
            Ok(())
        }
    }

    struct TestHost {
        region: AtomicBool,
        container: AtomicBool,
    }

    impl TestHost {
        fn new(region: bool, container: bool) -> Arc<Self> {
            Arc::new(Self {
                region: AtomicBool::new(region),
                container: AtomicBool::new(container),
            })
        }
    }

    impl ScreenHost for TestHost {
        fn transition_to(&self, screen: &ScreenId) -> Result<ScreenController, TransitionError> {
            Ok(ScreenController::Passive {
                screen: screen.clone(),
            })
        }

        fn set_content(&self, _root: ViewNode) -> Result<(), HostError> {
            Ok(())
        }

        fn set_title(&self, _title: &str) {}

        fn content_region(&self) -> Option<Arc<dyn ContentRegion>> {
            self.region
                .load(Ordering::SeqCst)
                .then(|| Arc::new(NullRegion) as Arc<dyn ContentRegion>)
        }

        fn outer_container(&self) -> Option<ContainerHandle> {
            self.container
                .load(Ordering::SeqCst)
                .then(|| ContainerHandle { id: "main".into() })
        }
    }

    fn as_host(host: &Arc<TestHost>) -> Arc<dyn ScreenHost> {
        host.clone()
    }

    #[test]
    fn test_unregistered_get_host_times_out() {
        let registry = HostRegistry::new();
        let start = Instant::now();
        assert!(registry.get_host(Duration::from_millis(25)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(registry.status(), HostStatus::Unregistered);
        assert!(registry.get_host_immediate().is_none());
    }

    #[test]
    fn test_second_registration_rejected() {
        let registry = HostRegistry::new();
        let host = TestHost::new(true, true);
        registry.set_host(&as_host(&host)).unwrap();
        assert_eq!(
            registry.set_host(&as_host(&host)),
            Err(RegistryError::AlreadyInitialized)
        );
        assert_eq!(registry.status(), HostStatus::Ready);
    }

    #[test]
    fn test_invalid_host_rejected_and_gate_stays_closed() {
        let registry = HostRegistry::new();
        let host = TestHost::new(true, false);
        let err = registry.set_host(&as_host(&host)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidHost { .. }));
        assert!(!registry.is_initialized());

        // A valid host can still be registered afterwards
        let good = TestHost::new(true, true);
        registry.set_host(&as_host(&good)).unwrap();
        assert!(registry.get_host_immediate().is_some());
    }

    #[test]
    fn test_waiter_released_by_registration() {
        let registry = Arc::new(HostRegistry::new());
        let host = TestHost::new(true, true);

        let waiter = {
            let registry = registry.clone();
            std::thread::spawn(move || registry.get_host(Duration::from_secs(5)).is_some())
        };
        std::thread::sleep(Duration::from_millis(20));
        registry.set_host(&as_host(&host)).unwrap();

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_quick_check_failure_marks_stale_then_full_recheck() {
        let registry = HostRegistry::new();
        let host = TestHost::new(true, true);
        registry.set_host(&as_host(&host)).unwrap();

        host.region.store(false, Ordering::SeqCst);
        assert!(registry.get_host(Duration::ZERO).is_none());
        assert_eq!(registry.status(), HostStatus::Stale);

        // Region back but container gone: full validation still fails
        host.region.store(true, Ordering::SeqCst);
        host.container.store(false, Ordering::SeqCst);
        assert!(registry.get_host(Duration::ZERO).is_none());

        host.container.store(true, Ordering::SeqCst);
        assert!(registry.get_host(Duration::ZERO).is_some());
        assert_eq!(registry.status(), HostStatus::Ready);
    }

    #[test]
    fn test_stale_host_never_blocks() {
        let registry = HostRegistry::new();
        let host = TestHost::new(true, true);
        registry.set_host(&as_host(&host)).unwrap();

        host.container.store(false, Ordering::SeqCst);
        assert!(!registry.revalidate());

        let start = Instant::now();
        assert!(registry.get_host(Duration::from_secs(2)).is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_live_host_skips_validation() {
        let registry = HostRegistry::new();
        assert!(registry.live_host().is_none());

        let host = TestHost::new(true, true);
        registry.set_host(&as_host(&host)).unwrap();
        host.region.store(false, Ordering::SeqCst);

        assert!(registry.get_host_immediate().is_none());
        assert!(registry.live_host().is_some());

        drop(host);
        assert!(registry.live_host().is_none());
    }

    #[test]
    fn test_dropped_host_is_reported() {
        let registry = HostRegistry::new();
        let host = TestHost::new(true, true);
        registry.set_host(&as_host(&host)).unwrap();
        drop(host);

        assert!(registry.get_host_immediate().is_none());
        assert_eq!(registry.status(), HostStatus::Dropped);
        assert!(!registry.revalidate());
    }
}
