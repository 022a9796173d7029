//! Navigation requests and their precondition checks.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use checkout_types::{screens, Order, ScreenId};

use crate::error::NavigationError;

/// One call to `navigate_to`. Immutable once built.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    request_id: Uuid,
    target: ScreenId,
    payload: Option<Order>,
    source: Option<ScreenId>,
    created_at: DateTime<Utc>,
}

impl NavigationRequest {
    pub fn new(
        target: ScreenId,
        payload: Option<Order>,
        source: Option<ScreenId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            target,
            payload,
            source,
            created_at,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn target(&self) -> &ScreenId {
        &self.target
    }

    pub fn payload(&self) -> Option<&Order> {
        self.payload.as_ref()
    }

    pub fn source(&self) -> Option<&ScreenId> {
        self.source.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Order id of the payload, when it has a usable one.
    pub fn order_id(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .filter(|o| o.has_id())
            .map(|o| o.id.as_str())
    }

    /// Title to show for the target screen.
    pub fn title(&self) -> String {
        screens::default_title(self.target.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.target.to_string())
    }

    /// Request-level and per-screen preconditions. Collects every violated
    /// rule rather than stopping at the first.
    pub fn validate(&self) -> Result<(), NavigationError> {
        let mut reasons = Vec::new();

        if self.target.is_empty() {
            reasons.push("target screen is empty".to_string());
        }

        match &self.payload {
            None => reasons.push("order payload is missing".to_string()),
            Some(order) if !order.has_id() => reasons.push("order id is empty".to_string()),
            Some(order) => check_screen_preconditions(self.target.as_str(), order, &mut reasons),
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(NavigationError::Validation { reasons })
        }
    }
}

fn check_screen_preconditions(target: &str, order: &Order, reasons: &mut Vec<String>) {
    match target {
        screens::ORDER_SUMMARY => {
            if !order.has_items() {
                reasons.push("order summary requires at least one item".to_string());
            }
        }
        screens::PAYMENT_METHOD => {
            if !order.has_delivery_info() {
                reasons.push("payment method requires delivery information".to_string());
            }
            if !order.has_positive_total() {
                reasons.push("payment method requires a positive total".to_string());
            }
        }
        screens::PAYMENT_PROCESSING => {
            if order.payment_method.as_deref().map_or(true, |m| m.trim().is_empty()) {
                reasons.push("payment processing requires a payment method".to_string());
            }
            if !order.has_positive_total() {
                reasons.push("payment processing requires a positive total".to_string());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_types::{DeliveryInfo, OrderItem};
    use rust_decimal::Decimal;

    fn request(target: &str, order: Option<Order>) -> NavigationRequest {
        NavigationRequest::new(ScreenId::from(target), order, None, Utc::now())
    }

    fn reasons(req: &NavigationRequest) -> Vec<String> {
        match req.validate() {
            Err(NavigationError::Validation { reasons }) => reasons,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            recipient_name: "Lan".into(),
            phone: "0900".into(),
            address: "12 Hang Bac".into(),
            city: "Hanoi".into(),
            instructions: None,
            rush: false,
        }
    }

    #[test]
    fn test_missing_or_blank_order_rejected() {
        assert_eq!(reasons(&request(screens::CART, None)).len(), 1);
        assert_eq!(reasons(&request(screens::CART, Some(Order::new("")))).len(), 1);
        assert!(request(screens::CART, Some(Order::new("O1"))).validate().is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let r = reasons(&request("  ", Some(Order::new("O1"))));
        assert!(r[0].contains("target"));
    }

    #[test]
    fn test_order_summary_needs_items() {
        let r = reasons(&request(screens::ORDER_SUMMARY, Some(Order::new("O1"))));
        assert_eq!(r.len(), 1);

        let order = Order::new("O1").with_item(OrderItem::new("p1", "Tea", 1, Decimal::ONE));
        assert!(request(screens::ORDER_SUMMARY, Some(order)).validate().is_ok());
    }

    #[test]
    fn test_payment_method_needs_delivery_and_total() {
        let r = reasons(&request(screens::PAYMENT_METHOD, Some(Order::new("O1"))));
        assert_eq!(r.len(), 2);

        let order = Order::new("O1")
            .with_item(OrderItem::new("p1", "Tea", 1, Decimal::ONE))
            .with_delivery(delivery());
        assert!(request(screens::PAYMENT_METHOD, Some(order)).validate().is_ok());
    }

    #[test]
    fn test_payment_processing_needs_method() {
        let order = Order::new("O1").with_item(OrderItem::new("p1", "Tea", 1, Decimal::ONE));
        let r = reasons(&request(screens::PAYMENT_PROCESSING, Some(order.clone())));
        assert_eq!(r.len(), 1);

        let order = order.with_payment_method("card");
        assert!(request(screens::PAYMENT_PROCESSING, Some(order)).validate().is_ok());
    }

    #[test]
    fn test_accessors() {
        let req = NavigationRequest::new(
            ScreenId::from(screens::ORDER_SUMMARY),
            Some(Order::new("O7")),
            Some(ScreenId::from(screens::DELIVERY_INFO)),
            Utc::now(),
        );
        assert_eq!(req.order_id(), Some("O7"));
        assert_eq!(req.title(), "Order Summary");
        assert_eq!(req.source().map(ScreenId::as_str), Some(screens::DELIVERY_INFO));
    }
}
