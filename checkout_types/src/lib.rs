//! Checkout Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the checkout navigation layer and the
//! screen controllers that call into it.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! Everything else in the workspace depends on this crate; this crate depends
//! on nothing in the workspace.
//!
//! ## Contents
//!
//! - Order payloads (`Order`, `OrderItem`, `DeliveryInfo`)
//! - Screen identifiers and the well-known checkout screens
//! - Validation step / outcome vocabularies
//! - Search sub-context carried in navigation history
//!
//! ## Critical Rules
//!
//! 1. **NO BUSINESS LOGIC** - Only data structures and trivial accessors
//! 2. **SERIALIZABLE** - All types support serde
//! 3. **THREAD SAFE** - All types are Send + Sync

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ORDER PAYLOAD
// ============================================================================

/// An in-flight order as it travels between checkout screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier. Empty means the order was never assigned an id.
    pub id: String,
    /// Line items in the cart
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Delivery details, once the delivery screen has been filled in
    #[serde(default)]
    pub delivery_info: Option<DeliveryInfo>,
    /// Order total including delivery fees
    pub total: Decimal,
    /// Selected payment method code (e.g. "card", "cod")
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl Order {
    /// Create an empty order with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            delivery_info: None,
            total: Decimal::ZERO,
            payment_method: None,
        }
    }

    /// Add a line item and fold its amount into the total
    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.total += item.line_total();
        self.items.push(item);
        self
    }

    /// Set delivery details
    pub fn with_delivery(mut self, delivery: DeliveryInfo) -> Self {
        self.delivery_info = Some(delivery);
        self
    }

    /// Set the payment method code
    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// Override the total
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn has_delivery_info(&self) -> bool {
        self.delivery_info.is_some()
    }

    pub fn has_positive_total(&self) -> bool {
        self.total > Decimal::ZERO
    }
}

/// A single cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Delivery details captured on the first checkout screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    /// Free-text delivery instructions
    #[serde(default)]
    pub instructions: Option<String>,
    /// Rush delivery requested
    #[serde(default)]
    pub rush: bool,
}

// ============================================================================
// SCREENS
// ============================================================================

/// Identifier of a screen (view) in the storefront.
///
/// Screen ids are plain strings so hosts can register screens this crate
/// does not know about; the checkout screens are listed in [`screens`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(String);

impl ScreenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ScreenId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Well-known checkout screen identifiers
pub mod screens {
    pub const CART: &str = "cart";
    pub const DELIVERY_INFO: &str = "delivery_info";
    pub const ORDER_SUMMARY: &str = "order_summary";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const PAYMENT_PROCESSING: &str = "payment_processing";
    pub const PAYMENT_COMPLETE: &str = "payment_complete";
    pub const HOME: &str = "home";

    /// Title shown in the window chrome for a screen, if it is a known one
    pub fn default_title(screen: &str) -> Option<&'static str> {
        match screen {
            CART => Some("Shopping Cart"),
            DELIVERY_INFO => Some("Delivery Information"),
            ORDER_SUMMARY => Some("Order Summary"),
            PAYMENT_METHOD => Some("Payment Method"),
            PAYMENT_PROCESSING => Some("Processing Payment"),
            PAYMENT_COMPLETE => Some("Payment Complete"),
            HOME => Some("Home"),
            _ => None,
        }
    }
}

// ============================================================================
// VALIDATION VOCABULARY
// ============================================================================

/// Named checkpoint in the checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStep {
    DeliveryInfo,
    OrderSummary,
    PaymentMethodSelection,
    PaymentProcessing,
    PaymentCompletion,
}

impl ValidationStep {
    pub const ALL: [ValidationStep; 5] = [
        ValidationStep::DeliveryInfo,
        ValidationStep::OrderSummary,
        ValidationStep::PaymentMethodSelection,
        ValidationStep::PaymentProcessing,
        ValidationStep::PaymentCompletion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStep::DeliveryInfo => "delivery_info",
            ValidationStep::OrderSummary => "order_summary",
            ValidationStep::PaymentMethodSelection => "payment_method_selection",
            ValidationStep::PaymentProcessing => "payment_processing",
            ValidationStep::PaymentCompletion => "payment_completion",
        }
    }
}

impl fmt::Display for ValidationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded for a validation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Pending,
    Passed,
    Failed,
    Bypassed,
    Expired,
    Cancelled,
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationOutcome::Pending => "pending",
            ValidationOutcome::Passed => "passed",
            ValidationOutcome::Failed => "failed",
            ValidationOutcome::Bypassed => "bypassed",
            ValidationOutcome::Expired => "expired",
            ValidationOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Validation tag attached to a preserved session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionValidationStatus {
    #[default]
    Unknown,
    Valid,
    Invalid,
    Incomplete,
    Corrupted,
}

// ============================================================================
// SEARCH CONTEXT
// ============================================================================

/// Catalog search state carried alongside a history entry so "back" can
/// restore the results page the user came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchContext {
    pub term: Option<String>,
    pub category: Option<String>,
    pub sort_key: Option<String>,
    pub page: u32,
    pub total_pages: u32,
}
