//! Event emitter with per-type loss accounting.
//!
//! Navigation never waits on observability: events go through `try_send` on
//! a bounded channel. Events that cannot be queued are counted per event
//! type, so the debug snapshot shows which kinds were lost, and the first
//! loss of each type is logged.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::types::{NavEvent, EVENT_TYPES};

pub struct EventEmitter {
    sender: Sender<NavEvent>,
    queued: AtomicU64,
    /// Indexed like `EVENT_TYPES`
    lost: [AtomicU64; EVENT_TYPES.len()],
}

impl EventEmitter {
    /// Emitter over a channel holding at most `capacity` undrained events,
    /// plus the receiving end for the drain.
    pub fn new(capacity: usize) -> (Self, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        let emitter = Self {
            sender,
            queued: AtomicU64::new(0),
            lost: std::array::from_fn(|_| AtomicU64::new(0)),
        };
        (emitter, EventReceiver { receiver })
    }

    /// Queue `event`, or count it as lost when the channel is full or the
    /// drain has gone away.
    pub fn emit(&self, event: NavEvent) {
        let index = event.payload.type_index();
        match self.sender.try_send(event) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                let reason = if err.is_full() {
                    "channel full"
                } else {
                    "drain stopped"
                };
                if self.lost[index].fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!(
                        event_type = EVENT_TYPES[index],
                        reason, "Navigation event dropped; further drops of this type are only counted"
                    );
                }
            }
        }
    }

    pub fn stats(&self) -> EmitterStats {
        let dropped_by_type: BTreeMap<&'static str, u64> = EVENT_TYPES
            .iter()
            .zip(&self.lost)
            .filter_map(|(name, count)| {
                let count = count.load(Ordering::Relaxed);
                (count > 0).then_some((*name, count))
            })
            .collect();
        EmitterStats {
            emitted: self.queued.load(Ordering::Relaxed),
            dropped: dropped_by_type.values().sum(),
            dropped_by_type,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmitterStats {
    pub emitted: u64,
    pub dropped: u64,
    /// Only types with at least one drop appear
    pub dropped_by_type: BTreeMap<&'static str, u64>,
}

/// Receiving end, owned by the drain.
pub struct EventReceiver {
    receiver: Receiver<NavEvent>,
}

impl EventReceiver {
    /// Up to `max` queued events, without waiting for more.
    pub fn take_batch(&self, max: usize) -> Vec<NavEvent> {
        self.receiver.try_iter().take(max).collect()
    }
}

pub type SharedEmitter = Arc<EventEmitter>;
