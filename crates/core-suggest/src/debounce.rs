//! Debounce timer: one pending quiet-period task at a time.

use std::sync::atomic::Ordering;
use std::time::Duration;

use core_events::{DEBOUNCE_CANCELLATIONS, Event};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::trace;

/// Coalesces rapid edits into a single `DebounceElapsed` event.
///
/// Arming aborts any pending timer first, so at most one timer task exists.
/// Aborting a sleeping task has no side effects; the narrow race where a
/// timer queued its event just before the abort is neutralized by the
/// revision carried in the event, which the consumer compares against the
/// current document revision before acting.
#[derive(Debug)]
pub struct DebounceScheduler {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period for `revision`. Cancels any pending timer
    /// unconditionally.
    pub fn arm(&mut self, tx: Sender<Event>, revision: u64) {
        self.cancel();
        let delay = self.delay;
        trace!(target: "suggest.debounce", revision, delay_ms = delay.as_millis() as u64, "armed");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::DebounceElapsed { revision }).await;
        }));
    }

    /// Abort the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                DEBOUNCE_CANCELLATIONS.fetch_add(1, Ordering::Relaxed);
                trace!(target: "suggest.debounce", "cancelled");
            }
            handle.abort();
        }
    }

    /// Whether a timer is currently pending (armed and not yet fired).
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
