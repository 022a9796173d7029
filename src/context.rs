//! Application-lifetime wiring.
//!
//! `CheckoutContext` constructs every component once and hands out shared
//! references. Nothing in the crate is a process-wide static; an
//! application holds one context, tests build as many as they like.
//!
//! ```ignore
//! let ctx = CheckoutContext::builder(NavigationConfig::default())
//!     .view_loader(loader)
//!     .emergency_router(router)
//!     .order_service(orders)
//!     .build()?;
//! ctx.registry().set_host(&host)?;
//! let outcome = ctx.navigator().navigate_to(screens::CART, Some(order), None);
//! ```

use std::sync::Arc;
use tracing::info;

use crate::background::BackgroundHandle;
use crate::clock::{system_clock, SharedClock};
use crate::collaborators::{EmergencyRouter, OrderDataService, ViewLoader};
use crate::config::NavigationConfig;
use crate::error::ContextError;
use crate::events::{EventDrain, EventEmitter, EventSink, SharedEmitter, TracingSink};
use crate::history::HistoryStack;
use crate::host::HostRegistry;
use crate::navigation::{default_strategies, NavigationOrchestrator};
use crate::session::{spawn_sweeper, SessionStore};
use crate::validation::{spawn_pruner, ValidationTracker};

pub struct CheckoutContextBuilder {
    config: NavigationConfig,
    clock: Option<SharedClock>,
    loader: Option<Arc<dyn ViewLoader>>,
    router: Option<Arc<dyn EmergencyRouter>>,
    orders: Option<Arc<dyn OrderDataService>>,
    sink: Option<Arc<dyn EventSink>>,
    background: bool,
}

impl CheckoutContextBuilder {
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn view_loader(mut self, loader: Arc<dyn ViewLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn emergency_router(mut self, router: Arc<dyn EmergencyRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Enables session refresh and recovery from the order service.
    pub fn order_service(mut self, orders: Arc<dyn OrderDataService>) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Sink for navigation events. Defaults to [`TracingSink`].
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Skip the session sweeper, validation pruner and event drain threads. Events stay queued
    /// until [`CheckoutContext::drain_events`] is called.
    pub fn without_background_tasks(mut self) -> Self {
        self.background = false;
        self
    }

    pub fn build(self) -> Result<CheckoutContext, ContextError> {
        self.config.validate()?;
        let loader = self.loader.ok_or(ContextError::MissingCollaborator {
            name: "view loader",
        })?;
        let router = self.router.ok_or(ContextError::MissingCollaborator {
            name: "emergency router",
        })?;
        let clock = self.clock.unwrap_or_else(system_clock);
        let config = self.config;

        let (emitter, drain) = if config.events.enabled {
            let (emitter, receiver) = EventEmitter::new(config.events.buffer_size);
            let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
            let drain = EventDrain::new(
                receiver,
                sink,
                config.events.batch_size,
                config.events.flush_interval(),
            );
            (Some(Arc::new(emitter)), Some(drain))
        } else {
            (None, None)
        };

        let registry = Arc::new(HostRegistry::new());

        let mut sessions = SessionStore::new(config.session.clone(), clock.clone());
        if let Some(orders) = self.orders {
            sessions = sessions.with_order_service(orders);
        }
        let sessions = Arc::new(sessions);

        let mut tracker = ValidationTracker::new(config.validation.clone(), clock.clone());
        if let Some(emitter) = &emitter {
            tracker = tracker.with_events(emitter.clone());
        }
        let tracker = Arc::new(tracker);

        let history = Arc::new(HistoryStack::new(config.history.capacity));

        let strategies = default_strategies(registry.clone(), &config.host, loader, router);
        let mut orchestrator = NavigationOrchestrator::new(
            registry.clone(),
            sessions.clone(),
            tracker.clone(),
            history.clone(),
            strategies,
            &config.breaker,
            clock.clone(),
        );
        if let Some(emitter) = &emitter {
            orchestrator = orchestrator.with_events(emitter.clone());
        }

        let mut background = Vec::new();
        let mut pending_drain = None;
        if self.background {
            background.push(spawn_sweeper(&sessions, config.session.sweep_interval())?);
            background.push(spawn_pruner(&tracker, config.session.sweep_interval())?);
            if let Some(drain) = drain {
                background.push(drain.spawn()?);
            }
        } else {
            pending_drain = drain;
        }

        info!(
            host_wait_ms = config.host.wait_timeout_ms,
            session_ttl_secs = config.session.ttl_secs,
            events = config.events.enabled,
            background = self.background,
            "Checkout navigation context ready"
        );

        Ok(CheckoutContext {
            config,
            clock,
            registry,
            sessions,
            tracker,
            history,
            orchestrator: Arc::new(orchestrator),
            emitter,
            pending_drain,
            background,
        })
    }
}

/// Owns every navigation component for the lifetime of the application.
/// Dropping it stops the background threads.
pub struct CheckoutContext {
    config: NavigationConfig,
    clock: SharedClock,
    registry: Arc<HostRegistry>,
    sessions: Arc<SessionStore>,
    tracker: Arc<ValidationTracker>,
    history: Arc<HistoryStack>,
    orchestrator: Arc<NavigationOrchestrator>,
    emitter: Option<SharedEmitter>,
    pending_drain: Option<EventDrain>,
    background: Vec<BackgroundHandle>,
}

impl CheckoutContext {
    pub fn builder(config: NavigationConfig) -> CheckoutContextBuilder {
        CheckoutContextBuilder {
            config,
            clock: None,
            loader: None,
            router: None,
            orders: None,
            sink: None,
            background: true,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn tracker(&self) -> &Arc<ValidationTracker> {
        &self.tracker
    }

    pub fn history(&self) -> &Arc<HistoryStack> {
        &self.history
    }

    pub fn navigator(&self) -> &Arc<NavigationOrchestrator> {
        &self.orchestrator
    }

    pub fn emitter(&self) -> Option<&SharedEmitter> {
        self.emitter.as_ref()
    }

    /// Hand queued events to the sink now. Only does anything when the
    /// context was built without background tasks.
    pub fn drain_events(&self) -> usize {
        self.pending_drain
            .as_ref()
            .map(EventDrain::drain_pending)
            .unwrap_or(0)
    }

    /// Names of the running background threads.
    pub fn background_tasks(&self) -> Vec<&str> {
        self.background.iter().map(BackgroundHandle::name).collect()
    }

    /// Stop background threads, draining any queued events first.
    pub fn shutdown(self) {
        for handle in self.background {
            handle.shutdown();
        }
        if let Some(drain) = &self.pending_drain {
            drain.drain_pending();
        }
        info!("Checkout navigation context shut down");
    }
}
