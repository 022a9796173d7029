//! Background drain thread and event sinks.
//!
//! The drain pulls batches off the emitter channel on its own thread and
//! hands them to an [`EventSink`]. Sink failures are logged and never reach
//! the navigation path.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::emitter::EventReceiver;
use super::types::NavEvent;
use crate::background::{spawn_periodic, BackgroundHandle};
use crate::clock::as_millis_u64;

/// Consumer of navigation events.
pub trait EventSink: Send + Sync {
    fn record(&self, events: &[NavEvent]) -> std::io::Result<()>;

    fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Logs every event through `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, events: &[NavEvent]) -> std::io::Result<()> {
        for event in events {
            debug!(
                event_type = event.payload.event_type_str(),
                request_id = ?event.request_id,
                payload = ?event.payload,
                "navigation event"
            );
        }
        Ok(())
    }
}

/// Keeps events in memory. Used by the demo binary and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<NavEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<NavEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EventSink for MemorySink {
    fn record(&self, events: &[NavEvent]) -> std::io::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(events);
        Ok(())
    }
}

/// Appends events as JSON lines.
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonLinesSink {
    fn record(&self, events: &[NavEvent]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        for event in events {
            serde_json::to_writer(&mut *writer, event)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner()).flush()
    }
}

/// Drains the emitter channel into a sink.
pub struct EventDrain {
    receiver: EventReceiver,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
    flush_interval: Duration,
}

impl EventDrain {
    pub fn new(
        receiver: EventReceiver,
        sink: Arc<dyn EventSink>,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            sink,
            batch_size: batch_size.max(1),
            flush_interval,
        }
    }

    /// Drain everything currently queued. Returns the number of events handed over.
    pub fn drain_pending(&self) -> usize {
        let mut total = 0;
        loop {
            let batch = self.receiver.take_batch(self.batch_size);
            if batch.is_empty() {
                break;
            }
            total += batch.len();
            if let Err(e) = self.sink.record(&batch) {
                warn!(error = %e, "Event sink write failed (non-fatal)");
            }
        }
        if total > 0 {
            if let Err(e) = self.sink.flush() {
                warn!(error = %e, "Event sink flush failed (non-fatal)");
            }
        }
        total
    }

    /// Run the drain on a named background thread.
    pub fn spawn(self) -> std::io::Result<BackgroundHandle> {
        info!(
            batch_size = self.batch_size,
            flush_interval_ms = as_millis_u64(self.flush_interval),
            "Event drain started"
        );
        let drain = Arc::new(self);
        let on_stop = drain.clone();
        spawn_periodic(
            "checkout-nav-events",
            drain.flush_interval,
            move || {
                let drained = drain.drain_pending();
                if drained > 0 {
                    debug!(events = drained, "Drained navigation events");
                }
            },
            move || {
                on_stop.drain_pending();
                info!("Event drain stopped");
            },
        )
    }
}
