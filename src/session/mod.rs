//! Session preservation across screen transitions.
//!
//! - `store`: TTL-bounded `SessionStore` with inline capacity eviction
//! - `id`: session ids that embed the order id
//! - `recovery`: three-path recovery of lost sessions
//!
//! The periodic expiry sweep is started with [`spawn_sweeper`].

pub mod id;
pub mod recovery;
pub mod store;

pub use id::{extract_order_id, generate_session_id};
pub use recovery::{form_fields, RecoveryResult, RecoverySource};
pub use store::{SessionContext, SessionStats, SessionStore};

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::background::{spawn_periodic, BackgroundHandle};

/// Start the periodic expiry sweep. The thread holds only a weak reference,
/// so it never keeps the store alive.
pub fn spawn_sweeper(
    store: &Arc<SessionStore>,
    interval: Duration,
) -> std::io::Result<BackgroundHandle> {
    let store: Weak<SessionStore> = Arc::downgrade(store);
    spawn_periodic(
        "checkout-nav-session-sweep",
        interval,
        move || {
            if let Some(store) = store.upgrade() {
                store.sweep_expired();
            }
        },
        || {},
    )
}
