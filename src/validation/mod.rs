//! Per-order validation tracking and bypass detection.
//!
//! Expired states are reclaimed by [`spawn_pruner`].

pub mod state;
pub mod summary;
pub mod tracker;

pub use state::ValidationState;
pub use summary::{ValidationSummary, PRE_PAYMENT_STEPS};
pub use tracker::{ValidationStats, ValidationTracker};

use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

use crate::background::{spawn_periodic, BackgroundHandle};

/// Start the periodic prune of expired validation states. Holds only a weak
/// reference to the tracker.
pub fn spawn_pruner(
    tracker: &Arc<ValidationTracker>,
    interval: Duration,
) -> std::io::Result<BackgroundHandle> {
    let tracker: Weak<ValidationTracker> = Arc::downgrade(tracker);
    spawn_periodic(
        "checkout-nav-validation-prune",
        interval,
        move || {
            if let Some(tracker) = tracker.upgrade() {
                let removed = tracker.prune_expired();
                if removed > 0 {
                    debug!(removed, "Pruned expired validation states");
                }
            }
        },
        || {},
    )
}
