//! Navigation event types.
//!
//! Events are created on the navigation path, so they are cheap to build
//! and clone; serialization only happens in the drain thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_types::ValidationStep;

use crate::navigation::{NavigationResult, StrategyKind};

/// Structured navigation event handed to the event sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavEvent {
    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Navigation request this event belongs to (if any)
    pub request_id: Option<Uuid>,

    pub payload: NavEventPayload,
}

/// Event payload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NavEventPayload {
    /// A navigation attempt reached its final result
    NavigationCompleted {
        target: String,
        result: NavigationResult,
        strategy: Option<StrategyKind>,
        duration_ms: u64,
    },

    /// The request was rejected before any strategy ran
    NavigationRejected { target: String, reasons: Vec<String> },

    /// One strategy failed; the chain moved on
    StrategyFailed {
        strategy: StrategyKind,
        error_kind: String,
        message: String,
    },

    /// A validation step was skipped between two screens
    BypassDetected {
        order_id: String,
        from: String,
        to: String,
        step: ValidationStep,
    },

    /// Consecutive failures reached the breaker threshold
    CircuitOpened { consecutive_failures: u32 },

    /// A success closed the breaker again
    CircuitClosed,

    /// The checkout for an order was abandoned
    CheckoutCancelled { order_id: String },
}

/// Every event type name, indexed by [`NavEventPayload::type_index`].
pub const EVENT_TYPES: [&str; 7] = [
    "navigation_completed",
    "navigation_rejected",
    "strategy_failed",
    "bypass_detected",
    "circuit_opened",
    "circuit_closed",
    "checkout_cancelled",
];

impl NavEventPayload {
    /// Position of this payload's type in [`EVENT_TYPES`].
    pub fn type_index(&self) -> usize {
        match self {
            NavEventPayload::NavigationCompleted { .. } => 0,
            NavEventPayload::NavigationRejected { .. } => 1,
            NavEventPayload::StrategyFailed { .. } => 2,
            NavEventPayload::BypassDetected { .. } => 3,
            NavEventPayload::CircuitOpened { .. } => 4,
            NavEventPayload::CircuitClosed => 5,
            NavEventPayload::CheckoutCancelled { .. } => 6,
        }
    }

    /// Event type as a stable string (for sinks that index by type)
    pub fn event_type_str(&self) -> &'static str {
        EVENT_TYPES[self.type_index()]
    }
}

impl NavEvent {
    #[inline]
    pub fn new(request_id: Option<Uuid>, payload: NavEventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            payload,
        }
    }

    /// Strategy failure, with the message truncated to keep events small.
    pub fn strategy_failed(
        request_id: Uuid,
        strategy: StrategyKind,
        error_kind: &str,
        message: &str,
    ) -> Self {
        let message = if message.len() > 500 {
            let mut cut = 497;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &message[..cut])
        } else {
            message.to_string()
        };
        Self::new(
            Some(request_id),
            NavEventPayload::StrategyFailed {
                strategy,
                error_kind: error_kind.to_string(),
                message,
            },
        )
    }
}
