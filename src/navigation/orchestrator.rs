//! Navigation orchestrator.
//!
//! Per request:
//!
//! ```text
//! validate ──fail──▶ FailedCritical (nothing else happens)
//!    │
//! preserve payload in a fresh session (failure logged, continue without)
//!    │
//! push previous context to history
//!    │
//! primary ─err─▶ fallback ─err─▶ emergency ─err─▶ FailedCritical
//!    │ok            │ok             │ok
//!    ▼              ▼               ▼
//! record result, update breaker, settle current context on success
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use checkout_types::{Order, ScreenId, SessionValidationStatus};

use super::breaker::CircuitBreaker;
use super::request::NavigationRequest;
use super::result::{
    reference_code, user_message, NavigationOutcome, NavigationResult, StrategyAttempt,
    StrategyKind,
};
use super::stats::{NavigationStats, NavigationStatsSnapshot};
use super::strategy::{EmergencyStrategy, FallbackStrategy, NavigationStrategy, PrimaryStrategy};
use crate::clock::{as_millis_u64, SharedClock};
use crate::collaborators::{EmergencyRouter, ViewLoader};
use crate::config::{BreakerConfig, HostConfig};
use crate::error::NavigationError;
use crate::events::{self, EmitterStats, NavEvent, NavEventPayload, SharedEmitter};
use crate::history::{HistoryStack, NavigationContext};
use crate::host::{HostRegistry, HostStatus};
use crate::session::{RecoveryResult, SessionStats, SessionStore};
use crate::validation::{ValidationStats, ValidationTracker};

/// The standard primary → fallback → emergency chain.
pub fn default_strategies(
    registry: Arc<HostRegistry>,
    host: &HostConfig,
    loader: Arc<dyn ViewLoader>,
    router: Arc<dyn EmergencyRouter>,
) -> Vec<Box<dyn NavigationStrategy>> {
    vec![
        Box::new(PrimaryStrategy::new(registry.clone(), host.wait_timeout())),
        Box::new(FallbackStrategy::new(registry, loader)),
        Box::new(EmergencyStrategy::new(router)),
    ]
}

/// The screen currently shown, as far as the orchestrator knows.
#[derive(Debug, Clone)]
struct CurrentScreen {
    context: NavigationContext,
    session_id: Option<String>,
}

/// Serializable view of the orchestrator and the stores it drives.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub taken_at: DateTime<Utc>,
    pub healthy: bool,
    pub host_status: HostStatus,
    pub consecutive_failures: u32,
    pub breaker_threshold: u32,
    pub breaker_trips: u64,
    pub current_screen: Option<String>,
    pub current_session: Option<String>,
    /// Screen ids, top first
    pub history: Vec<String>,
    pub navigation: NavigationStatsSnapshot,
    pub sessions: SessionStats,
    pub validation: ValidationStats,
    pub events: Option<EmitterStats>,
}

pub struct NavigationOrchestrator {
    registry: Arc<HostRegistry>,
    sessions: Arc<SessionStore>,
    tracker: Arc<ValidationTracker>,
    history: Arc<HistoryStack>,
    strategies: Vec<Box<dyn NavigationStrategy>>,
    breaker: CircuitBreaker,
    stats: NavigationStats,
    clock: SharedClock,
    events: Option<SharedEmitter>,
    current: Mutex<Option<CurrentScreen>>,
}

impl NavigationOrchestrator {
    pub fn new(
        registry: Arc<HostRegistry>,
        sessions: Arc<SessionStore>,
        tracker: Arc<ValidationTracker>,
        history: Arc<HistoryStack>,
        strategies: Vec<Box<dyn NavigationStrategy>>,
        breaker: &BreakerConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            registry,
            sessions,
            tracker,
            history,
            strategies,
            breaker: CircuitBreaker::new(breaker.failure_threshold),
            stats: NavigationStats::default(),
            clock,
            events: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, emitter: SharedEmitter) -> Self {
        self.events = Some(emitter);
        self
    }

    fn current(&self) -> MutexGuard<'_, Option<CurrentScreen>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Navigate to `target`, carrying `payload`. `source` is the screen the
    /// request comes from, when the caller knows it.
    pub fn navigate_to(
        &self,
        target: impl Into<ScreenId>,
        payload: Option<Order>,
        source: Option<ScreenId>,
    ) -> NavigationOutcome {
        let request = NavigationRequest::new(target.into(), payload, source, self.clock.now());
        self.run(request, None)
    }

    /// Return to the most recent history entry, carrying the current
    /// session's payload. `None` when the history is empty.
    ///
    /// A failed return puts the entry back so it can be retried.
    pub fn go_back(&self) -> Option<NavigationOutcome> {
        let previous = self.history.pop()?;
        let (from, session_id) = {
            let current = self.current();
            (
                current.as_ref().map(|c| c.context.screen_id.clone()),
                current.as_ref().and_then(|c| c.session_id.clone()),
            )
        };
        let payload = session_id.as_deref().and_then(|sid| {
            self.sessions
                .get(sid)
                .or_else(|| self.sessions.attempt_recovery(sid).payload)
        });

        self.stats.record_back();
        let request = NavigationRequest::new(
            previous.screen_id.clone(),
            payload,
            from,
            self.clock.now(),
        );
        let outcome = self.run(request, Some(previous.clone()));
        if outcome.is_success() {
            // The payload now lives under the new session.
            if let (Some(old), Some(new)) = (&session_id, &outcome.session_id) {
                if old != new {
                    self.sessions.clear(old);
                }
            }
        } else {
            self.history.push(previous);
        }
        Some(outcome)
    }

    /// `restore`: the history entry being returned to. Back navigation does
    /// not push onto history.
    fn run(&self, request: NavigationRequest, restore: Option<NavigationContext>) -> NavigationOutcome {
        let started = Instant::now();
        self.stats.record_request();
        let request_id = request.request_id();
        let title = request.title();

        if let Err(err) = request.validate() {
            return self.reject(&request, err, started);
        }

        let session_id = self.preserve(&request);

        let previous = self.current().as_ref().map(|c| c.context.clone());
        let previous = previous.or_else(|| {
            request
                .source()
                .map(|s| NavigationContext::new(s.clone(), request.created_at()))
        });
        if restore.is_none() {
            if let Some(ctx) = &previous {
                self.history.push(ctx.clone());
            }
        }

        let (result, strategy, attempts) = self.run_strategies(&request, session_id.as_deref());
        self.stats.record_result(result, strategy);

        if result.is_success() {
            if self.breaker.record_success() {
                info!("Navigation circuit closed");
                events::emit(&self.events, || {
                    NavEvent::new(Some(request_id), NavEventPayload::CircuitClosed)
                });
            }
            let from = request
                .source()
                .cloned()
                .or_else(|| previous.map(|c| c.screen_id));
            self.settle(&request, from, session_id.clone(), result, restore);
        } else if self.breaker.record_failure() {
            let consecutive_failures = self.breaker.consecutive_failures();
            warn!(consecutive_failures, "Navigation circuit opened");
            events::emit(&self.events, || {
                NavEvent::new(
                    Some(request_id),
                    NavEventPayload::CircuitOpened {
                        consecutive_failures,
                    },
                )
            });
        }

        let reference = (result == NavigationResult::FailedCritical)
            .then(|| reference_code(self.clock.now()));
        let duration_ms = elapsed_ms(started);

        info!(
            %request_id,
            target = %request.target(),
            result = %result,
            strategy = ?strategy,
            session_id = session_id.as_deref().unwrap_or("-"),
            reference = reference.as_deref().unwrap_or("-"),
            duration_ms,
            "Navigation completed"
        );
        events::emit(&self.events, || {
            NavEvent::new(
                Some(request_id),
                NavEventPayload::NavigationCompleted {
                    target: request.target().to_string(),
                    result,
                    strategy,
                    duration_ms,
                },
            )
        });

        NavigationOutcome {
            request_id,
            target: request.target().to_string(),
            result,
            strategy,
            session_id,
            attempts,
            reasons: Vec::new(),
            message: user_message(result, &title, reference.as_deref()),
            reference_code: reference,
            duration_ms,
        }
    }

    fn reject(
        &self,
        request: &NavigationRequest,
        err: NavigationError,
        started: Instant,
    ) -> NavigationOutcome {
        let reasons = match err {
            NavigationError::Validation { reasons } => reasons,
            other => vec![other.to_string()],
        };
        warn!(
            request_id = %request.request_id(),
            target = %request.target(),
            ?reasons,
            "Navigation request rejected"
        );
        self.stats.record_rejected();
        events::emit(&self.events, || {
            NavEvent::new(
                Some(request.request_id()),
                NavEventPayload::NavigationRejected {
                    target: request.target().to_string(),
                    reasons: reasons.clone(),
                },
            )
        });

        let result = NavigationResult::FailedCritical;
        let reference = reference_code(self.clock.now());
        NavigationOutcome {
            request_id: request.request_id(),
            target: request.target().to_string(),
            result,
            strategy: None,
            session_id: None,
            attempts: Vec::new(),
            reasons,
            message: user_message(result, &request.title(), Some(&reference)),
            reference_code: Some(reference),
            duration_ms: elapsed_ms(started),
        }
    }

    /// Write the payload to a fresh session. `None` when it could not be
    /// stored.
    fn preserve(&self, request: &NavigationRequest) -> Option<String> {
        let order = request.payload()?;
        let session_id = self.sessions.generate_session_id(Some(&order.id));
        match self.sessions.put(&session_id, order.clone()) {
            Ok(()) => {
                self.sessions.set_metadata(
                    &session_id,
                    "target",
                    serde_json::Value::String(request.target().to_string()),
                );
                debug!(%session_id, order_id = %order.id, "Payload preserved");
                Some(session_id)
            }
            Err(e) => {
                let err = NavigationError::from(e);
                warn!(
                    request_id = %request.request_id(),
                    error = %err,
                    "Payload not preserved, continuing without a session"
                );
                self.stats.record_persistence_failure();
                None
            }
        }
    }

    fn run_strategies(
        &self,
        request: &NavigationRequest,
        session_id: Option<&str>,
    ) -> (NavigationResult, Option<StrategyKind>, Vec<StrategyAttempt>) {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.attempt(request, session_id) {
                Ok(outcome) => {
                    debug!(
                        request_id = %request.request_id(),
                        strategy = %kind,
                        result = %outcome.result,
                        "Navigation strategy finished"
                    );
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        result: Some(outcome.result),
                        error: None,
                        detail: outcome.detail,
                    });
                    return (outcome.result, Some(kind), attempts);
                }
                Err(err) => {
                    warn!(
                        request_id = %request.request_id(),
                        strategy = %kind,
                        error_kind = err.kind(),
                        error = %err,
                        "Navigation strategy failed"
                    );
                    let message = err.to_string();
                    events::emit(&self.events, || {
                        NavEvent::strategy_failed(request.request_id(), kind, err.kind(), &message)
                    });
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        result: None,
                        error: Some(message),
                        detail: None,
                    });
                }
            }
        }

        (NavigationResult::FailedCritical, None, attempts)
    }

    /// Make the target the current context and feed the transition to
    /// bypass detection.
    fn settle(
        &self,
        request: &NavigationRequest,
        from: Option<ScreenId>,
        session_id: Option<String>,
        result: NavigationResult,
        restore: Option<NavigationContext>,
    ) {
        if let Some(sid) = &session_id {
            let status = if result == NavigationResult::Success {
                SessionValidationStatus::Valid
            } else {
                SessionValidationStatus::Incomplete
            };
            self.sessions.set_validation_status(sid, status);
        }

        let context = restore.unwrap_or_else(|| {
            NavigationContext::new(request.target().clone(), request.created_at())
                .with_title(request.title())
        });
        *self.current() = Some(CurrentScreen {
            context,
            session_id,
        });

        if let (Some(order_id), Some(from)) = (request.order_id(), from) {
            self.tracker
                .observe_transition(order_id, &from, request.target());
        }
    }

    // =========================================================================
    // CHECKOUT LIFECYCLE
    // =========================================================================

    /// Abandon the checkout for `order_id`: invalidate its validation states
    /// and drop its preserved sessions.
    pub fn cancel_checkout(&self, order_id: &str) -> NavigationOutcome {
        let started = Instant::now();
        let invalidated = self.tracker.invalidate_all(order_id);
        let cleared = self.sessions.clear_order(order_id);

        {
            let mut current = self.current();
            let owned_by_order = current
                .as_ref()
                .and_then(|c| c.session_id.as_deref())
                .and_then(crate::session::extract_order_id)
                .is_some_and(|id| id == order_id);
            if owned_by_order {
                if let Some(c) = current.as_mut() {
                    c.session_id = None;
                }
            }
        }

        self.stats.record_cancelled();
        info!(order_id, invalidated, cleared, "Checkout cancelled");
        events::emit(&self.events, || {
            NavEvent::new(
                None,
                NavEventPayload::CheckoutCancelled {
                    order_id: order_id.to_string(),
                },
            )
        });

        let result = NavigationResult::Cancelled;
        NavigationOutcome {
            request_id: Uuid::new_v4(),
            target: String::new(),
            result,
            strategy: None,
            session_id: None,
            attempts: Vec::new(),
            reasons: Vec::new(),
            message: user_message(result, "", None),
            reference_code: None,
            duration_ms: elapsed_ms(started),
        }
    }

    /// Whether `session_id` still holds a readable payload.
    pub fn has_preserved_data(&self, session_id: &str) -> bool {
        self.sessions.has(session_id)
    }

    pub fn recover_data(&self, session_id: &str) -> RecoveryResult {
        let recovery = self.sessions.attempt_recovery(session_id);
        if recovery.success {
            info!(session_id, source = ?recovery.source, "Session data recovered");
        } else {
            warn!(session_id, reason = %recovery.reason, "Session data could not be recovered");
        }
        recovery
    }

    // =========================================================================
    // OBSERVABILITY
    // =========================================================================

    /// False while the circuit breaker is open.
    pub fn is_healthy(&self) -> bool {
        !self.breaker.is_open()
    }

    pub fn stats(&self) -> NavigationStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn current_context(&self) -> Option<NavigationContext> {
        self.current().as_ref().map(|c| c.context.clone())
    }

    pub fn current_session(&self) -> Option<String> {
        self.current().as_ref().and_then(|c| c.session_id.clone())
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        let (current_screen, current_session) = {
            let current = self.current();
            (
                current.as_ref().map(|c| c.context.screen_id.to_string()),
                current.as_ref().and_then(|c| c.session_id.clone()),
            )
        };
        DebugSnapshot {
            taken_at: self.clock.now(),
            healthy: self.is_healthy(),
            host_status: self.registry.status(),
            consecutive_failures: self.breaker.consecutive_failures(),
            breaker_threshold: self.breaker.threshold(),
            breaker_trips: self.breaker.trips(),
            current_screen,
            current_session,
            history: self
                .history
                .snapshot()
                .into_iter()
                .map(|c| c.screen_id.to_string())
                .collect(),
            navigation: self.stats.snapshot(),
            sessions: self.sessions.stats(),
            validation: self.tracker.stats(),
            events: self.events.as_ref().map(|e| e.stats()),
        }
    }

    /// Human-readable debug report.
    pub fn get_debug_snapshot(&self) -> String {
        let snap = self.debug_snapshot();
        let nav = &snap.navigation;
        let mut out = String::new();

        let _ = writeln!(out, "=== Checkout navigation @ {} ===", snap.taken_at.to_rfc3339());
        let _ = writeln!(
            out,
            "healthy: {} (failures {}/{}, trips {})",
            snap.healthy, snap.consecutive_failures, snap.breaker_threshold, snap.breaker_trips
        );
        let _ = writeln!(out, "host: {:?}", snap.host_status);
        let _ = writeln!(
            out,
            "current: {} (session {})",
            snap.current_screen.as_deref().unwrap_or("-"),
            snap.current_session.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "history: [{}]", snap.history.join(", "));
        let _ = writeln!(
            out,
            "requests: {} ok: {} partial: {} failed: {} rejected: {} preserved: {} cancelled: {} back: {}",
            nav.requests,
            nav.successes,
            nav.partial_successes,
            nav.failures,
            nav.rejected,
            nav.data_preserved,
            nav.cancelled,
            nav.back_navigations
        );
        let _ = writeln!(
            out,
            "strategy wins: primary {} fallback {} emergency {} (success rate {:.1}%)",
            nav.primary_wins,
            nav.fallback_wins,
            nav.emergency_wins,
            nav.success_rate() * 100.0
        );
        let _ = writeln!(
            out,
            "sessions: {} resident, {} form snapshots, {} writes, {} expired, {} evicted",
            snap.sessions.resident,
            snap.sessions.form_snapshots,
            snap.sessions.writes,
            snap.sessions.expired_evictions,
            snap.sessions.capacity_evictions
        );
        let _ = writeln!(
            out,
            "validation: {} orders, {} states, {} bypasses",
            snap.validation.orders, snap.validation.states, snap.validation.bypasses_detected
        );
        if let Some(events) = &snap.events {
            let _ = write!(out, "events: {} emitted, {} dropped", events.emitted, events.dropped);
            for (event_type, count) in &events.dropped_by_type {
                let _ = write!(out, " [{event_type}: {count}]");
            }
            out.push('\n');
        }
        out
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    as_millis_u64(started.elapsed())
}
