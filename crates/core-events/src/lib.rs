//! Core event types and channel helpers for Ghostline.
//!
//! All session state is owned by a single consumer loop; every other party
//! (debounce timer, suggestion fetches, the input driver) is a producer that
//! pushes `Event`s into one bounded mpsc channel. Ordering through that
//! channel is the ordering guarantee the engine relies on: edits are applied
//! in arrival order, and timer/fetch completions are reconciled against the
//! revision/generation counters carried in their events.

use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use core_text::{LanguageId, Position};

// -------------------------------------------------------------------------------------------------
// Channel policy
// -------------------------------------------------------------------------------------------------
// Bounded channel for memory safety and natural producer backpressure. A
// single consumer (the session loop) drains input, timer expiries, and fetch
// completions in arrival order; producers await `send` and terminate when the
// consumer goes away. The cap is generous relative to realistic keystroke +
// fetch volume, so backpressure only engages under pathological producers.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Minimal atomic counters (relaxed fetch_add, no locking). Inspectable from
// unit tests and periodically loggable; a metrics exporter can layer on top
// later without touching call sites.
// -------------------------------------------------------------------------------------------------
pub static FETCHES_ISSUED: AtomicU64 = AtomicU64::new(0);
pub static FETCH_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static STALE_RESPONSES_DROPPED: AtomicU64 = AtomicU64::new(0);
pub static STALE_TIMERS_IGNORED: AtomicU64 = AtomicU64::new(0);
pub static DEBOUNCE_CANCELLATIONS: AtomicU64 = AtomicU64::new(0);
pub static SHORT_INPUT_SUPPRESSIONS: AtomicU64 = AtomicU64::new(0);
pub static SUGGESTIONS_ACCEPTED: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the session loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Command(CommandEvent),
    /// The debounce quiet period elapsed. Carries the document revision the
    /// timer was armed for; the loop ignores expiries whose revision no
    /// longer matches (a newer edit re-armed the timer).
    DebounceElapsed { revision: u64 },
    /// A suggestion fetch completed (successfully or not).
    Suggestion(SuggestionEvent),
    Shutdown,
}

/// Loop-level commands from the driving frontend (not session input).
#[derive(Debug, Clone)]
pub enum CommandEvent {
    /// Print the current document to the driver's output.
    ShowDocument,
    Quit,
}

/// Normalized input events produced by the driving surface.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Document content changed. Carries the full post-edit text and the
    /// cursor position after the edit.
    Edit { text: String, cursor: Position },
    /// Cursor moved without a content change. Ghost annotations re-anchor.
    CursorMoved(Position),
    /// The accept gesture: commit the currently displayed suggestion.
    Accept,
    /// External language selection event.
    SelectLanguage(LanguageId),
    /// Restore the active language's default template.
    Reset,
}

/// Completion of one generation-tagged fetch.
#[derive(Debug, Clone)]
pub struct SuggestionEvent {
    pub generation: u64,
    pub outcome: FetchOutcome,
}

/// What a completed fetch produced. Failures and empty replies both collapse
/// to `NoSuggestion`; suggestions are best-effort and never surface errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Suggestion(String),
    NoSuggestion,
}

impl FetchOutcome {
    /// Normalize a raw suggestion string: empty text is no suggestion.
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            FetchOutcome::NoSuggestion
        } else {
            FetchOutcome::Suggestion(text)
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Async event sources
// -------------------------------------------------------------------------------------------------
// Any background producer (the input driver, future watchers) registers
// through this trait so startup spawns them uniformly and shutdown can join
// them. Each source owns its task lifecycle and must exit promptly once
// `tx.send(..).await` fails (consumer dropped).

/// Trait implemented by any async event producer. Implementors usually hold
/// configuration and spawn one background task that pushes `Event`s into the
/// shared channel.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging and diagnostics.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task. Implementors stop when
    /// the channel closes or on their own terminal condition, and must await
    /// timers or IO rather than busy-loop.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their JoinHandles. Sources are
    /// drained so a second call spawns nothing. During shutdown the caller
    /// drops its final `Sender` clone before awaiting the handles so sources
    /// observe the closed channel and exit cooperatively.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Helper result type for event plumbing.
pub type EventResult<T> = anyhow::Result<T>;
