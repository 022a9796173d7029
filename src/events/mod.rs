//! Structured navigation events.
//!
//! ```text
//! Orchestrator / ValidationTracker
//!         │ emit() (never blocks)
//!         ▼
//!   EventEmitter ──bounded channel──▶ EventDrain thread ──▶ EventSink
//! ```
//!
//! The sink is a pure consumer: it never feeds back into navigation.

pub mod drain;
pub mod emitter;
pub mod types;

pub use drain::{EventDrain, EventSink, JsonLinesSink, MemorySink, TracingSink};
pub use emitter::{EmitterStats, EventEmitter, EventReceiver, SharedEmitter};
pub use types::{NavEvent, NavEventPayload, EVENT_TYPES};

/// Emit through an optional emitter.
#[inline]
pub(crate) fn emit(emitter: &Option<SharedEmitter>, event: impl FnOnce() -> NavEvent) {
    if let Some(emitter) = emitter {
        emitter.emit(event());
    }
}
