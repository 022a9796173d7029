//! Validation tracker.
//!
//! Screen controllers record the outcome of each checkout step; the
//! orchestrator asks whether a step is satisfied and feeds observed screen
//! transitions in for bypass detection.
//!
//! Bypass detection is an audit aid: when a monitored transition happens
//! without the step it depends on having passed, a `Bypassed` state is
//! recorded and logged. The transition itself is never blocked.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use checkout_types::{Order, ScreenId, ValidationOutcome, ValidationStep};

use super::state::ValidationState;
use super::summary::{ValidationSummary, PRE_PAYMENT_STEPS};
use crate::clock::{add_std, SharedClock};
use crate::config::{MonitoredTransition, ValidationConfig};
use crate::events::{self, NavEvent, NavEventPayload, SharedEmitter};

#[derive(Default)]
struct Inner {
    /// order id → states, oldest first
    by_order: HashMap<String, VecDeque<ValidationState>>,
    /// state id → order id
    index: HashMap<String, String>,
}

/// Tracker statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ValidationStats {
    pub orders: usize,
    pub states: usize,
    pub bypasses_detected: u64,
}

pub struct ValidationTracker {
    config: ValidationConfig,
    clock: SharedClock,
    events: Option<SharedEmitter>,
    inner: Mutex<Inner>,
    bypasses: AtomicU64,
}

impl ValidationTracker {
    pub fn new(config: ValidationConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            events: None,
            inner: Mutex::new(Inner::default()),
            bypasses: AtomicU64::new(0),
        }
    }

    pub fn with_events(mut self, emitter: SharedEmitter) -> Self {
        self.events = Some(emitter);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an outcome. Returns the new state id.
    pub fn record(
        &self,
        order_id: &str,
        step: ValidationStep,
        outcome: ValidationOutcome,
        context: &str,
    ) -> String {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.insert_locked(&mut inner, order_id, step, outcome, context, now)
    }

    fn insert_locked(
        &self,
        inner: &mut Inner,
        order_id: &str,
        step: ValidationStep,
        outcome: ValidationOutcome,
        context: &str,
        now: DateTime<Utc>,
    ) -> String {
        let expires_at = add_std(now, self.config.state_ttl());
        let state = ValidationState::new(order_id, step, outcome, context, now, expires_at);
        let state_id = state.state_id.clone();

        inner
            .index
            .insert(state_id.clone(), order_id.to_string());
        let states = inner.by_order.entry(order_id.to_string()).or_default();
        states.push_back(state);

        let mut evicted = Vec::new();
        while states.len() > self.config.max_states_per_order {
            if let Some(old) = states.pop_front() {
                evicted.push(old.state_id);
            }
        }
        for id in evicted {
            inner.index.remove(&id);
        }

        debug!(order_id, %step, %outcome, %state_id, "Validation recorded");
        state_id
    }

    /// Change the outcome of a still-valid state.
    pub fn update(&self, state_id: &str, outcome: ValidationOutcome, context: &str) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(order_id) = inner.index.get(state_id).cloned() else {
            return false;
        };
        let Some(state) = inner
            .by_order
            .get_mut(&order_id)
            .and_then(|states| states.iter_mut().find(|s| s.state_id == state_id))
        else {
            return false;
        };
        if !state.is_valid(now) {
            return false;
        }
        state.outcome = outcome;
        if !context.is_empty() {
            state.context = context.to_string();
        }
        state.updated_at = now;
        true
    }

    /// Whether some valid state for (order, step) has passed.
    pub fn is_step_valid(&self, order_id: &str, step: ValidationStep) -> bool {
        let now = self.clock.now();
        self.lock()
            .by_order
            .get(order_id)
            .map(|states| {
                states
                    .iter()
                    .any(|s| s.step == step && s.satisfies_step(now))
            })
            .unwrap_or(false)
    }

    /// Invalidate every state of an order. Returns how many were still valid.
    pub fn invalidate_all(&self, order_id: &str) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(states) = inner.by_order.get_mut(order_id) else {
            return 0;
        };
        let mut count = 0;
        for state in states.iter_mut().filter(|s| s.is_valid(now)) {
            state.invalidated = true;
            count += 1;
        }
        info!(order_id, invalidated = count, "Invalidated validation states");
        count
    }

    pub fn get_state(&self, state_id: &str) -> Option<ValidationState> {
        let inner = self.lock();
        let order_id = inner.index.get(state_id)?;
        inner
            .by_order
            .get(order_id)?
            .iter()
            .find(|s| s.state_id == state_id)
            .cloned()
    }

    /// All retained states for an order, oldest first.
    pub fn states_for_order(&self, order_id: &str) -> Vec<ValidationState> {
        self.lock()
            .by_order
            .get(order_id)
            .map(|states| states.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Latest valid outcome recorded for (order, step).
    pub fn latest_outcome(&self, order_id: &str, step: ValidationStep) -> Option<ValidationOutcome> {
        let now = self.clock.now();
        latest_valid(&self.lock(), order_id, step, now)
    }

    /// Drop expired states, and orders left with none. Invalidated states
    /// stay until they expire so summaries still see them. Returns how many
    /// were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let mut removed_ids = Vec::new();
        for states in inner.by_order.values_mut() {
            states.retain(|s| {
                let keep = !s.is_expired(now);
                if !keep {
                    removed_ids.push(s.state_id.clone());
                }
                keep
            });
        }
        inner.by_order.retain(|_, states| !states.is_empty());
        for id in &removed_ids {
            inner.index.remove(id);
        }
        removed_ids.len()
    }

    /// Feed an observed screen transition. Returns the id of a synthesized
    /// `Bypassed` state, if one was recorded.
    pub fn observe_transition(
        &self,
        order_id: &str,
        from: &ScreenId,
        to: &ScreenId,
    ) -> Option<String> {
        let monitored = self.monitored(from, to)?;
        let step = monitored.required_step;
        let now = self.clock.now();

        let mut inner = self.lock();
        let already_flagged = inner.by_order.get(order_id).is_some_and(|states| {
            states.iter().any(|s| {
                s.step == step
                    && s.is_valid(now)
                    && matches!(
                        s.outcome,
                        ValidationOutcome::Passed | ValidationOutcome::Bypassed
                    )
            })
        });
        if already_flagged {
            return None;
        }

        let context = format!("{step} skipped on transition {from} -> {to}");
        let state_id = self.insert_locked(
            &mut inner,
            order_id,
            step,
            ValidationOutcome::Bypassed,
            &context,
            now,
        );
        drop(inner);

        self.bypasses.fetch_add(1, Ordering::Relaxed);
        warn!(order_id, %from, %to, %step, "Validation bypass detected");
        events::emit(&self.events, || {
            NavEvent::new(
                None,
                NavEventPayload::BypassDetected {
                    order_id: order_id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                    step,
                },
            )
        });
        Some(state_id)
    }

    fn monitored(&self, from: &ScreenId, to: &ScreenId) -> Option<&MonitoredTransition> {
        self.config
            .monitored_transitions
            .iter()
            .find(|t| t.from == from.as_str() && t.to == to.as_str())
    }

    /// Aggregate readiness of `order` for payment.
    ///
    /// Delivery data counts as an implicit pass only when no delivery state
    /// was ever recorded for the order. A step whose retained states are all
    /// invalidated or expired must be validated again.
    pub fn summarize_for_payment(&self, order: &Order) -> ValidationSummary {
        let mut summary = ValidationSummary {
            order_id: order.id.clone(),
            ..Default::default()
        };

        if !order.has_delivery_info() {
            summary.errors.push("delivery information is missing".to_string());
        }
        if !order.has_items() {
            summary.errors.push("order has no items".to_string());
        }
        if !order.has_positive_total() {
            summary
                .errors
                .push(format!("order total must be positive (was {})", order.total));
        }

        let now = self.clock.now();
        let mut inner = self.lock();
        let ever_recorded = |inner: &Inner, step: ValidationStep| {
            inner
                .by_order
                .get(&order.id)
                .is_some_and(|states| states.iter().any(|s| s.step == step))
        };

        if order.has_delivery_info() && !ever_recorded(&inner, ValidationStep::DeliveryInfo) {
            self.insert_locked(
                &mut inner,
                &order.id,
                ValidationStep::DeliveryInfo,
                ValidationOutcome::Passed,
                "implicit: delivery data present",
                now,
            );
            summary.auto_passed.push(ValidationStep::DeliveryInfo);
        }

        for step in PRE_PAYMENT_STEPS {
            let latest = latest_valid(&inner, &order.id, step, now);
            match latest {
                None if ever_recorded(&inner, step) => summary
                    .errors
                    .push(format!("{step} validation is no longer valid")),
                None => summary
                    .warnings
                    .push(format!("no validation recorded for {step}")),
                Some(ValidationOutcome::Failed) => {
                    summary.errors.push(format!("{step} validation failed"))
                }
                Some(ValidationOutcome::Bypassed) => summary
                    .warnings
                    .push(format!("{step} was bypassed")),
                Some(_) => {}
            }
            summary.steps.insert(step, latest);
        }

        summary
    }

    pub fn stats(&self) -> ValidationStats {
        let inner = self.lock();
        ValidationStats {
            orders: inner.by_order.len(),
            states: inner.by_order.values().map(VecDeque::len).sum(),
            bypasses_detected: self.bypasses.load(Ordering::Relaxed),
        }
    }
}

fn latest_valid(
    inner: &Inner,
    order_id: &str,
    step: ValidationStep,
    now: DateTime<Utc>,
) -> Option<ValidationOutcome> {
    inner.by_order.get(order_id).and_then(|states| {
        states
            .iter()
            .rev()
            .find(|s| s.step == step && s.is_valid(now))
            .map(|s| s.outcome)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use checkout_types::{screens, DeliveryInfo, OrderItem};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    fn tracker() -> (ValidationTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (
            ValidationTracker::new(ValidationConfig::default(), clock.clone()),
            clock,
        )
    }

    fn ready_order() -> Order {
        Order::new("O1")
            .with_item(OrderItem::new("p1", "Tea", 1, Decimal::new(500, 2)))
            .with_delivery(DeliveryInfo {
                recipient_name: "Lan".into(),
                phone: "0900".into(),
                address: "12 Hang Bac".into(),
                city: "Hanoi".into(),
                instructions: None,
                rush: false,
            })
    }

    #[test]
    fn test_only_passed_satisfies_step() {
        let (tracker, _) = tracker();
        tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Failed, "");
        assert!(!tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));

        tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Passed, "");
        assert!(tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));
        assert!(!tracker.is_step_valid("O1", ValidationStep::OrderSummary));
        assert!(!tracker.is_step_valid("O2", ValidationStep::DeliveryInfo));
    }

    #[test]
    fn test_states_expire_after_ttl() {
        let (tracker, clock) = tracker();
        tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Passed, "");
        clock.advance(Duration::from_secs(2 * 3600));
        assert!(!tracker.is_step_valid("O1", ValidationStep::OrderSummary));
        assert_eq!(tracker.prune_expired(), 1);
        assert_eq!(tracker.stats().orders, 0);
    }

    #[test]
    fn test_update_valid_state() {
        let (tracker, _) = tracker();
        let id = tracker.record(
            "O1",
            ValidationStep::PaymentMethodSelection,
            ValidationOutcome::Pending,
            "awaiting choice",
        );
        assert!(tracker.update(&id, ValidationOutcome::Passed, "card chosen"));
        let state = tracker.get_state(&id).unwrap();
        assert_eq!(state.outcome, ValidationOutcome::Passed);
        assert_eq!(state.context, "card chosen");
        assert!(tracker.is_step_valid("O1", ValidationStep::PaymentMethodSelection));
    }

    #[test]
    fn test_update_rejects_missing_or_invalid_state() {
        let (tracker, _) = tracker();
        assert!(!tracker.update("val-missing", ValidationOutcome::Passed, ""));

        let id = tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Pending, "");
        tracker.invalidate_all("O1");
        assert!(!tracker.update(&id, ValidationOutcome::Passed, ""));
    }

    #[test]
    fn test_invalidate_all() {
        let (tracker, _) = tracker();
        tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Passed, "");
        tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Passed, "");
        tracker.record("O2", ValidationStep::OrderSummary, ValidationOutcome::Passed, "");

        assert_eq!(tracker.invalidate_all("O1"), 2);
        assert!(!tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));
        assert!(tracker.is_step_valid("O2", ValidationStep::OrderSummary));
        assert_eq!(tracker.invalidate_all("O1"), 0);
    }

    #[test]
    fn test_per_order_cap_evicts_oldest() {
        let (tracker, _) = tracker();
        let first = tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Passed, "");
        for _ in 0..10 {
            tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Pending, "");
        }
        assert_eq!(tracker.states_for_order("O1").len(), 10);
        assert!(tracker.get_state(&first).is_none());
        assert!(!tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));
    }

    #[test]
    fn test_bypass_synthesized_exactly_once() {
        let (tracker, _) = tracker();
        let from = ScreenId::from(screens::ORDER_SUMMARY);
        let to = ScreenId::from(screens::PAYMENT_METHOD);

        let first = tracker.observe_transition("O1", &from, &to);
        let second = tracker.observe_transition("O1", &from, &to);

        assert!(first.is_some());
        assert!(second.is_none());
        let bypassed: Vec<_> = tracker
            .states_for_order("O1")
            .into_iter()
            .filter(|s| s.outcome == ValidationOutcome::Bypassed)
            .collect();
        assert_eq!(bypassed.len(), 1);
        assert_eq!(bypassed[0].step, ValidationStep::OrderSummary);
        assert!(!tracker.is_step_valid("O1", ValidationStep::OrderSummary));
        assert_eq!(tracker.stats().bypasses_detected, 1);
    }

    #[test]
    fn test_no_bypass_when_step_passed() {
        let (tracker, _) = tracker();
        tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Passed, "");
        let result = tracker.observe_transition(
            "O1",
            &ScreenId::from(screens::ORDER_SUMMARY),
            &ScreenId::from(screens::PAYMENT_METHOD),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_unmonitored_transition_ignored() {
        let (tracker, _) = tracker();
        let result = tracker.observe_transition(
            "O1",
            &ScreenId::from(screens::CART),
            &ScreenId::from(screens::PAYMENT_METHOD),
        );
        assert!(result.is_none());
        assert!(tracker.states_for_order("O1").is_empty());
    }

    #[test]
    fn test_monitored_set_is_configurable() {
        let config = ValidationConfig {
            monitored_transitions: vec![MonitoredTransition::new(
                screens::PAYMENT_METHOD,
                screens::PAYMENT_PROCESSING,
                ValidationStep::PaymentMethodSelection,
            )],
            ..Default::default()
        };
        let tracker = ValidationTracker::new(config, Arc::new(ManualClock::starting_now()));
        assert!(tracker
            .observe_transition(
                "O1",
                &ScreenId::from(screens::ORDER_SUMMARY),
                &ScreenId::from(screens::PAYMENT_METHOD),
            )
            .is_none());
        assert!(tracker
            .observe_transition(
                "O1",
                &ScreenId::from(screens::PAYMENT_METHOD),
                &ScreenId::from(screens::PAYMENT_PROCESSING),
            )
            .is_some());
    }

    #[test]
    fn test_summary_auto_passes_delivery_info() {
        let (tracker, _) = tracker();
        let summary = tracker.summarize_for_payment(&ready_order());

        assert!(summary.is_ready_for_payment(), "{:?}", summary.errors);
        assert_eq!(summary.auto_passed, vec![ValidationStep::DeliveryInfo]);
        assert!(tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(
            summary.steps.get(&ValidationStep::DeliveryInfo),
            Some(&Some(ValidationOutcome::Passed))
        );
    }

    #[test]
    fn test_summary_does_not_override_explicit_delivery_record() {
        let (tracker, _) = tracker();
        tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Failed, "bad phone");
        let summary = tracker.summarize_for_payment(&ready_order());

        assert!(summary.auto_passed.is_empty());
        assert!(!summary.is_ready_for_payment());
        assert!(summary.errors.iter().any(|e| e.contains("delivery_info")));
    }

    #[test]
    fn test_summary_after_invalidation_does_not_auto_pass() {
        let (tracker, _) = tracker();
        tracker.record("O1", ValidationStep::DeliveryInfo, ValidationOutcome::Failed, "bad phone");
        tracker.invalidate_all("O1");

        let summary = tracker.summarize_for_payment(&ready_order());

        assert!(summary.auto_passed.is_empty());
        assert!(!summary.is_ready_for_payment());
        assert!(summary
            .errors
            .iter()
            .any(|e| e.contains("delivery_info validation is no longer valid")));
        assert!(!tracker.is_step_valid("O1", ValidationStep::DeliveryInfo));
    }

    #[test]
    fn test_concurrent_summaries_auto_pass_once() {
        let (tracker, _) = tracker();
        let tracker = Arc::new(tracker);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.summarize_for_payment(&ready_order()))
            })
            .collect();
        let auto_passes: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap().auto_passed.len())
            .sum();

        assert_eq!(auto_passes, 1);
        assert_eq!(tracker.states_for_order("O1").len(), 1);
    }

    #[test]
    fn test_prune_keeps_invalidated_until_expiry() {
        let (tracker, clock) = tracker();
        tracker.record("O1", ValidationStep::OrderSummary, ValidationOutcome::Passed, "");
        tracker.invalidate_all("O1");
        assert_eq!(tracker.prune_expired(), 0);
        assert_eq!(tracker.stats().states, 1);

        clock.advance(Duration::from_secs(2 * 3600));
        assert_eq!(tracker.prune_expired(), 1);
        assert_eq!(tracker.stats().orders, 0);
    }

    #[test]
    fn test_summary_reports_missing_data() {
        let (tracker, _) = tracker();
        let summary = tracker.summarize_for_payment(&Order::new("O2"));
        assert_eq!(summary.errors.len(), 3);
        assert!(summary.auto_passed.is_empty());
        assert_eq!(summary.warnings.len(), 3);
    }
}
