//! Session recovery.
//!
//! Tried in order, stopping at the first that yields a payload:
//!
//! 1. the session is still resident (and not expired)
//! 2. the session id embeds an order id and the order service can load it
//! 3. a form snapshot was preserved under the session id; a minimal order is
//!    rebuilt from its fields
//!
//! Paths 2 and 3 write the recovered payload back under the same session id.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use checkout_types::{DeliveryInfo, Order, SessionValidationStatus};

use super::id::extract_order_id;
use super::store::SessionStore;

/// Which recovery path produced the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverySource {
    Resident,
    OrderService,
    FormState,
}

/// Outcome of [`SessionStore::attempt_recovery`].
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryResult {
    pub success: bool,
    pub source: Option<RecoverySource>,
    /// Human-readable explanation, suitable for a support log
    pub reason: String,
    pub payload: Option<Order>,
}

impl RecoveryResult {
    fn recovered(source: RecoverySource, reason: impl Into<String>, order: Order) -> Self {
        Self {
            success: true,
            source: Some(source),
            reason: reason.into(),
            payload: Some(order),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            source: None,
            reason: reason.into(),
            payload: None,
        }
    }
}

/// Form field names understood when rebuilding an order from a snapshot.
pub mod form_fields {
    pub const ORDER_ID: &str = "order_id";
    pub const RECIPIENT_NAME: &str = "recipient_name";
    pub const PHONE: &str = "phone";
    pub const ADDRESS: &str = "address";
    pub const CITY: &str = "city";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const RUSH: &str = "rush";
    pub const PAYMENT_METHOD: &str = "payment_method";
}

impl SessionStore {
    pub fn attempt_recovery(&self, session_id: &str) -> RecoveryResult {
        if let Some(order) = self.get(session_id) {
            return RecoveryResult::recovered(
                RecoverySource::Resident,
                "session still resident",
                order,
            );
        }

        let mut notes = vec!["session not resident".to_string()];
        let embedded_order = extract_order_id(session_id);

        match (&embedded_order, self.order_service()) {
            (Some(order_id), Some(orders)) => match orders.load_complete_order(order_id) {
                Ok(order) => {
                    self.restore(session_id, order.clone(), SessionValidationStatus::Unknown);
                    info!(session_id, %order_id, "Recovered session from order service");
                    return RecoveryResult::recovered(
                        RecoverySource::OrderService,
                        format!("reloaded order {order_id} from order service"),
                        order,
                    );
                }
                Err(e) => notes.push(format!("order service: {e}")),
            },
            (Some(_), None) => notes.push("no order service configured".to_string()),
            (None, _) => notes.push("session id carries no order id".to_string()),
        }

        match self.form_state(session_id) {
            Some(fields) => match rebuild_from_form(&fields, embedded_order.as_deref()) {
                Some(order) => {
                    self.restore(
                        session_id,
                        order.clone(),
                        SessionValidationStatus::Incomplete,
                    );
                    info!(session_id, order_id = %order.id, "Rebuilt session from form state");
                    return RecoveryResult::recovered(
                        RecoverySource::FormState,
                        "rebuilt minimal order from preserved form fields",
                        order,
                    );
                }
                None => notes.push("form state has no order id".to_string()),
            },
            None => notes.push("no preserved form state".to_string()),
        }

        let reason = notes.join("; ");
        warn!(session_id, %reason, "Session recovery failed");
        RecoveryResult::failed(reason)
    }

    fn restore(&self, session_id: &str, order: Order, status: SessionValidationStatus) {
        match self.put(session_id, order) {
            Ok(()) => {
                self.set_validation_status(session_id, status);
            }
            Err(e) => warn!(session_id, error = %e, "Could not re-store recovered session"),
        }
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn rebuild_from_form(fields: &HashMap<String, String>, fallback_id: Option<&str>) -> Option<Order> {
    let order_id = field(fields, form_fields::ORDER_ID).or(fallback_id)?;
    let mut order = Order::new(order_id);

    let recipient = field(fields, form_fields::RECIPIENT_NAME);
    let address = field(fields, form_fields::ADDRESS);
    if let (Some(recipient), Some(address)) = (recipient, address) {
        order.delivery_info = Some(DeliveryInfo {
            recipient_name: recipient.to_string(),
            phone: field(fields, form_fields::PHONE).unwrap_or_default().to_string(),
            address: address.to_string(),
            city: field(fields, form_fields::CITY).unwrap_or_default().to_string(),
            instructions: field(fields, form_fields::INSTRUCTIONS).map(str::to_string),
            rush: field(fields, form_fields::RUSH)
                .map(|v| matches!(v, "true" | "1" | "yes"))
                .unwrap_or(false),
        });
    }
    order.payment_method = field(fields, form_fields::PAYMENT_METHOD).map(str::to_string);
    Some(order)
}
