//! Session id generation.
//!
//! Ids embed the order id so a lost session can still be traced back to its
//! order during recovery:
//!
//! ```text
//! order:<order_id>:<12 alphanumeric>     session tied to an order
//! session:<12 alphanumeric>              session without an order
//! ```
//!
//! The suffix never contains `:`, so the order id is everything between the
//! prefix and the last separator, even when the order id itself contains `:`.

use rand::distributions::Alphanumeric;
use rand::Rng;

const ORDER_PREFIX: &str = "order:";
const ANONYMOUS_PREFIX: &str = "session:";
const SUFFIX_LEN: usize = 12;

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// New session id, tied to `order_id` when one is given and non-blank.
pub fn generate_session_id(order_id: Option<&str>) -> String {
    match order_id.filter(|id| !id.trim().is_empty()) {
        Some(order_id) => format!("{ORDER_PREFIX}{order_id}:{}", random_suffix()),
        None => format!("{ANONYMOUS_PREFIX}{}", random_suffix()),
    }
}

/// The order id embedded by [`generate_session_id`], if any.
pub fn extract_order_id(session_id: &str) -> Option<String> {
    let rest = session_id.strip_prefix(ORDER_PREFIX)?;
    let (order_id, suffix) = rest.rsplit_once(':')?;
    if order_id.is_empty() || suffix.len() != SUFFIX_LEN {
        return None;
    }
    Some(order_id.to_string())
}
