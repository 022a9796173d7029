//! Periodic background threads.
//!
//! Used for the session expiry sweep, the validation prune and the event
//! drain. Each task runs on a named thread and waits on a crossbeam shutdown
//! channel between ticks, so stopping it is immediate rather than "after the
//! next interval".

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::as_millis_u64;

/// Owner of a periodic background thread. Dropping it stops the thread.
pub struct BackgroundHandle {
    name: String,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the thread and wait for its final tick to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(task = %self.name, "Background thread panicked");
            }
        }
    }
}

impl Drop for BackgroundHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `tick` every `interval` until the returned handle is dropped, then
/// run `on_stop` once on the same thread.
pub fn spawn_periodic<T, S>(
    name: &str,
    interval: Duration,
    mut tick: T,
    on_stop: S,
) -> std::io::Result<BackgroundHandle>
where
    T: FnMut() + Send + 'static,
    S: FnOnce() + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    let task = name.to_string();
    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            debug!(%task, interval_ms = as_millis_u64(interval), "Background task started");
            loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            on_stop();
            debug!(%task, "Background task stopped");
        })?;

    Ok(BackgroundHandle {
        name: name.to_string(),
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let handle = {
            let ticks = ticks.clone();
            let stopped = stopped.clone();
            spawn_periodic(
                "test-ticker",
                Duration::from_millis(5),
                move || {
                    ticks.fetch_add(1, Ordering::SeqCst);
                },
                move || {
                    stopped.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap()
        };

        std::thread::sleep(Duration::from_millis(60));
        handle.shutdown();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_long_interval_immediately() {
        let handle = spawn_periodic("test-idle", Duration::from_secs(3600), || {}, || {}).unwrap();
        let start = std::time::Instant::now();
        drop(handle);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
