//! Navigation strategies.
//!
//! The orchestrator runs an ordered chain of these, one at a time, and stops
//! at the first that returns `Ok`. An `Err` is logged and the next strategy
//! runs.
//!
//! | Strategy  | Needs                          | Best result      |
//! |-----------|--------------------------------|------------------|
//! | Primary   | registered, valid host         | `Success`        |
//! | Fallback  | view loader + host content     | `Success`        |
//! | Emergency | emergency router only          | `DataPreserved`  |

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use checkout_types::Order;

use super::request::NavigationRequest;
use super::result::{NavigationResult, StrategyKind};
use crate::collaborators::{EmergencyRouter, ScreenController, ScreenHost, ViewLoader};
use crate::error::{NavigationError, TransitionError};
use crate::host::HostRegistry;

/// What a strategy achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub result: NavigationResult,
    pub detail: Option<String>,
}

impl StrategyOutcome {
    pub fn new(result: NavigationResult) -> Self {
        Self {
            result,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_detail_if_none(self, detail: &str) -> Self {
        if self.detail.is_some() {
            self
        } else {
            self.with_detail(detail)
        }
    }
}

/// One tier of the navigation chain.
pub trait NavigationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Try to show the request's target. `session_id` is the session the
    /// payload was preserved under, if preservation succeeded.
    fn attempt(
        &self,
        request: &NavigationRequest,
        session_id: Option<&str>,
    ) -> Result<StrategyOutcome, NavigationError>;
}

/// Inject the payload, downgrading to `PartialSuccess` when the controller
/// will not take it.
fn inject(controller: &ScreenController, payload: Option<&Order>) -> StrategyOutcome {
    let Some(order) = payload else {
        return StrategyOutcome::new(NavigationResult::Success);
    };
    match controller.inject_order(order) {
        Ok(()) => StrategyOutcome::new(NavigationResult::Success),
        Err(e) => {
            warn!(screen = %controller.screen(), error = %e, "Payload injection failed");
            StrategyOutcome::new(NavigationResult::PartialSuccess)
                .with_detail(format!("payload not injected: {e}"))
        }
    }
}

// =============================================================================
// PRIMARY
// =============================================================================

/// Uses the host's own transition.
pub struct PrimaryStrategy {
    registry: Arc<HostRegistry>,
    wait: Duration,
}

impl PrimaryStrategy {
    pub fn new(registry: Arc<HostRegistry>, wait: Duration) -> Self {
        Self { registry, wait }
    }
}

impl NavigationStrategy for PrimaryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Primary
    }

    fn attempt(
        &self,
        request: &NavigationRequest,
        _session_id: Option<&str>,
    ) -> Result<StrategyOutcome, NavigationError> {
        let host = self.registry.get_host(self.wait).ok_or_else(|| {
            NavigationError::host_unavailable(format!(
                "no valid host within {} ms",
                self.wait.as_millis()
            ))
        })?;

        let controller = host.transition_to(request.target())?;
        host.set_title(&request.title());
        debug!(target = %request.target(), "Host transition complete");
        Ok(inject(&controller, request.payload()))
    }
}

// =============================================================================
// FALLBACK
// =============================================================================

/// Loads the view itself and places it in the host's content region, or
/// hands it to the host directly when the region is unreachable.
pub struct FallbackStrategy {
    registry: Arc<HostRegistry>,
    loader: Arc<dyn ViewLoader>,
}

impl FallbackStrategy {
    pub fn new(registry: Arc<HostRegistry>, loader: Arc<dyn ViewLoader>) -> Self {
        Self { registry, loader }
    }
}

impl NavigationStrategy for FallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn attempt(
        &self,
        request: &NavigationRequest,
        _session_id: Option<&str>,
    ) -> Result<StrategyOutcome, NavigationError> {
        // No wait here: primary already spent the host timeout.
        let host: Arc<dyn ScreenHost> = self
            .registry
            .live_host()
            .ok_or_else(|| NavigationError::host_unavailable("no host to place the view in"))?;
        let view = self
            .loader
            .load_view(request.target())
            .map_err(TransitionError::from)?;
        let placed = match host.content_region() {
            Some(region) => region.replace_content(view.root),
            None => {
                debug!(target = %request.target(), "Content region unreachable, setting host content");
                host.set_content(view.root)
            }
        };
        placed.map_err(TransitionError::from)?;
        host.set_title(&request.title());

        Ok(inject(&view.controller, request.payload()).with_detail_if_none("loaded by fallback"))
    }
}

// =============================================================================
// EMERGENCY
// =============================================================================

/// Routes by order id without any host reference.
pub struct EmergencyStrategy {
    router: Arc<dyn EmergencyRouter>,
}

impl EmergencyStrategy {
    pub fn new(router: Arc<dyn EmergencyRouter>) -> Self {
        Self { router }
    }
}

impl NavigationStrategy for EmergencyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Emergency
    }

    fn attempt(
        &self,
        request: &NavigationRequest,
        session_id: Option<&str>,
    ) -> Result<StrategyOutcome, NavigationError> {
        self.router
            .route_to(request.target(), request.order_id())
            .map_err(TransitionError::from)?;

        // Injection is not guaranteed on this path; the session is what the
        // user resumes from.
        Ok(match session_id {
            Some(sid) => StrategyOutcome::new(NavigationResult::DataPreserved)
                .with_detail(format!("payload preserved in {sid}")),
            None => StrategyOutcome::new(NavigationResult::FailedRecoverable)
                .with_detail("routed without a preserved session"),
        })
    }
}
