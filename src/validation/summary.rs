//! Pre-payment validation summary.

use serde::Serialize;
use std::collections::BTreeMap;

use checkout_types::{ValidationOutcome, ValidationStep};

/// Steps that must be settled before the payment screens.
pub const PRE_PAYMENT_STEPS: [ValidationStep; 3] = [
    ValidationStep::DeliveryInfo,
    ValidationStep::OrderSummary,
    ValidationStep::PaymentMethodSelection,
];

/// Aggregate readiness of an order for payment.
///
/// `errors` block payment; `warnings` are informational (e.g. a step the
/// user got through without an explicit validation record).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub order_id: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Steps passed implicitly because their data was present
    pub auto_passed: Vec<ValidationStep>,
    /// Latest valid outcome per pre-payment step (`None`: never recorded)
    pub steps: BTreeMap<ValidationStep, Option<ValidationOutcome>>,
}

impl ValidationSummary {
    pub fn is_ready_for_payment(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
