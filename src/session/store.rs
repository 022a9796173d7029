//! TTL-bounded session store.
//!
//! Holds the order payload of an in-flight checkout, plus snapshots of
//! partially filled forms, across screen transitions.
//!
//! ## Expiry
//!
//! A session expires once it has been idle (no `get`) for longer than the
//! TTL. Expiry is checked lazily on every read and the expired entry is
//! removed as part of that read; the background sweep only reclaims memory
//! for sessions nobody asks for again.
//!
//! ## Capacity
//!
//! Over-capacity eviction happens inside `put`, under the same lock as the
//! insert, so the store never exceeds its capacity even transiently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use checkout_types::{Order, SessionValidationStatus};

use super::id;
use crate::clock::{elapsed_since, SharedClock};
use crate::collaborators::OrderDataService;
use crate::config::SessionConfig;
use crate::error::SessionError;

/// Preserved state for one in-flight order.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub session_id: String,
    pub order: Order,
    pub validation_status: SessionValidationStatus,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// When the payload was last written or reloaded from the order service
    pub refreshed_at: DateTime<Utc>,
}

impl SessionContext {
    fn new(session_id: String, order: Order, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            order,
            validation_status: SessionValidationStatus::Unknown,
            metadata: HashMap::new(),
            created_at: now,
            last_accessed: now,
            refreshed_at: now,
        }
    }
}

/// Field values of a partially filled form.
#[derive(Debug, Clone)]
pub(crate) struct FormSnapshot {
    pub fields: HashMap<String, String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionContext>,
    forms: HashMap<String, FormSnapshot>,
}

/// Store statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SessionStats {
    pub resident: usize,
    pub form_snapshots: usize,
    pub writes: u64,
    pub expired_evictions: u64,
    pub capacity_evictions: u64,
    pub refreshes: u64,
}

pub struct SessionStore {
    config: SessionConfig,
    clock: SharedClock,
    orders: Option<Arc<dyn OrderDataService>>,
    inner: Mutex<Inner>,

    writes: AtomicU64,
    expired_evictions: AtomicU64,
    capacity_evictions: AtomicU64,
    refreshes: AtomicU64,
}

impl SessionStore {
    pub fn new(config: SessionConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            orders: None,
            inner: Mutex::new(Inner::default()),
            writes: AtomicU64::new(0),
            expired_evictions: AtomicU64::new(0),
            capacity_evictions: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Attach the order-data service used for freshness reloads and recovery.
    pub fn with_order_service(mut self, orders: Arc<dyn OrderDataService>) -> Self {
        self.orders = Some(orders);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn order_service(&self) -> Option<&Arc<dyn OrderDataService>> {
        self.orders.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, last_accessed: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        elapsed_since(now, last_accessed) > self.config.ttl()
    }

    /// New session id, tied to the order when one is given.
    pub fn generate_session_id(&self, order_id: Option<&str>) -> String {
        id::generate_session_id(order_id)
    }

    /// Store (or replace) the payload for `session_id`.
    pub fn put(&self, session_id: &str, order: Order) -> Result<(), SessionError> {
        if session_id.trim().is_empty() {
            return Err(SessionError::EmptySessionId);
        }
        if self.config.capacity == 0 {
            return Err(SessionError::NoCapacity);
        }

        let now = self.clock.now();
        let mut inner = self.lock();
        self.evict_expired_locked(&mut inner, now);

        if !inner.sessions.contains_key(session_id) && inner.sessions.len() >= self.config.capacity
        {
            self.evict_oldest_quartile_locked(&mut inner);
        }

        inner.sessions.insert(
            session_id.to_string(),
            SessionContext::new(session_id.to_string(), order, now),
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(session_id, resident = inner.sessions.len(), "Session stored");
        Ok(())
    }

    /// Payload for `session_id`, or `None` if absent or expired.
    ///
    /// Refreshes the idle timer. A payload older than the freshness
    /// threshold is reloaded from the order service when one is attached;
    /// a failed reload keeps the stored payload.
    pub fn get(&self, session_id: &str) -> Option<Order> {
        let now = self.clock.now();
        let (order, needs_refresh) = {
            let mut inner = self.lock();
            let expired = match inner.sessions.get(session_id) {
                None => return None,
                Some(ctx) => self.is_expired(ctx.last_accessed, now),
            };
            if expired {
                inner.sessions.remove(session_id);
                self.expired_evictions.fetch_add(1, Ordering::Relaxed);
                debug!(session_id, "Session expired on read");
                return None;
            }
            let ctx = inner.sessions.get_mut(session_id)?;
            ctx.last_accessed = now;
            let stale = elapsed_since(now, ctx.refreshed_at) > self.config.freshness();
            (ctx.order.clone(), stale && ctx.order.has_id())
        };

        if !needs_refresh {
            return Some(order);
        }
        let Some(orders) = &self.orders else {
            return Some(order);
        };

        // Reload outside the lock; the collaborator may be slow.
        match orders.load_complete_order(&order.id) {
            Ok(fresh) => {
                let mut inner = self.lock();
                if let Some(ctx) = inner.sessions.get_mut(session_id) {
                    ctx.order = fresh.clone();
                    ctx.refreshed_at = self.clock.now();
                }
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                debug!(session_id, order_id = %fresh.id, "Session payload refreshed");
                Some(fresh)
            }
            Err(e) => {
                warn!(session_id, error = %e, "Session refresh failed, serving stored payload");
                Some(order)
            }
        }
    }

    /// Whether a readable session exists. Does not touch the idle timer.
    pub fn has(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        let expired = match inner.sessions.get(session_id) {
            None => return false,
            Some(ctx) => self.is_expired(ctx.last_accessed, now),
        };
        if expired {
            inner.sessions.remove(session_id);
            self.expired_evictions.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Snapshot of the whole context (same expiry semantics as `has`).
    pub fn context(&self, session_id: &str) -> Option<SessionContext> {
        if !self.has(session_id) {
            return None;
        }
        self.lock().sessions.get(session_id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().sessions.remove(session_id).is_some()
    }

    /// Remove every session and form snapshot belonging to `order_id`.
    pub fn clear_order(&self, order_id: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.sessions.len() + inner.forms.len();
        inner
            .sessions
            .retain(|sid, ctx| ctx.order.id != order_id && !belongs_to(sid, order_id));
        inner.forms.retain(|sid, _| !belongs_to(sid, order_id));
        before - (inner.sessions.len() + inner.forms.len())
    }

    pub fn set_validation_status(&self, session_id: &str, status: SessionValidationStatus) -> bool {
        match self.lock().sessions.get_mut(session_id) {
            Some(ctx) => {
                ctx.validation_status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_metadata(&self, session_id: &str, key: &str, value: serde_json::Value) -> bool {
        match self.lock().sessions.get_mut(session_id) {
            Some(ctx) => {
                ctx.metadata.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn metadata(&self, session_id: &str, key: &str) -> Option<serde_json::Value> {
        self.lock()
            .sessions
            .get(session_id)
            .and_then(|ctx| ctx.metadata.get(key).cloned())
    }

    /// Save the fields of a partially filled form under `session_id`.
    pub fn preserve_form_state(&self, session_id: &str, fields: HashMap<String, String>) {
        let now = self.clock.now();
        self.lock().forms.insert(
            session_id.to_string(),
            FormSnapshot {
                fields,
                saved_at: now,
            },
        );
    }

    /// Saved form fields for `session_id`, if not expired.
    pub fn form_state(&self, session_id: &str) -> Option<HashMap<String, String>> {
        self.form_snapshot(session_id).map(|snap| snap.fields)
    }

    pub(crate) fn form_snapshot(&self, session_id: &str) -> Option<FormSnapshot> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let expired = self.is_expired(inner.forms.get(session_id)?.saved_at, now);
        if expired {
            inner.forms.remove(session_id);
            return None;
        }
        inner.forms.get(session_id).cloned()
    }

    /// Drop every expired session and form snapshot. Returns sessions removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let removed = self.evict_expired_locked(&mut inner, now);
        if removed > 0 {
            info!(removed, remaining = inner.sessions.len(), "Swept expired sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.lock();
        SessionStats {
            resident: inner.sessions.len(),
            form_snapshots: inner.forms.len(),
            writes: self.writes.load(Ordering::Relaxed),
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            capacity_evictions: self.capacity_evictions.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
        }
    }

    fn evict_expired_locked(&self, inner: &mut Inner, now: DateTime<Utc>) -> usize {
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|_, ctx| !self.is_expired(ctx.last_accessed, now));
        inner
            .forms
            .retain(|_, snap| !self.is_expired(snap.saved_at, now));
        let removed = before - inner.sessions.len();
        self.expired_evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    fn evict_oldest_quartile_locked(&self, inner: &mut Inner) {
        let count = (inner.sessions.len() / 4).max(1);
        let mut by_age: Vec<(DateTime<Utc>, String)> = inner
            .sessions
            .values()
            .map(|ctx| (ctx.created_at, ctx.session_id.clone()))
            .collect();
        by_age.sort();
        for (_, session_id) in by_age.into_iter().take(count) {
            inner.sessions.remove(&session_id);
        }
        self.capacity_evictions
            .fetch_add(count as u64, Ordering::Relaxed);
        warn!(evicted = count, "Session store at capacity, evicted oldest sessions");
    }
}

fn belongs_to(session_id: &str, order_id: &str) -> bool {
    id::extract_order_id(session_id).as_deref() == Some(order_id)
}
