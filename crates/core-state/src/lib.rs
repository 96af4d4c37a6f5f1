//! Session state: the single mutable authority for the suggestion slot and
//! the counters that reconcile asynchronous completions.
//!
//! Two counters with distinct jobs:
//! * `revision` — bumped on every document edit. Debounce expiries carry the
//!   revision they were armed for; a mismatch means a newer edit re-armed the
//!   timer and the expiry is ignored.
//! * `generation` — bumped when a fetch is issued *and* whenever in-flight
//!   results must be invalidated (edit, language switch). A fetch completion
//!   is applied only when its generation equals the latest value; everything
//!   else is dropped silently (last-request-wins).
//!
//! The suggestion slot is read live by every consumer — the renderer and the
//! accept path dereference it at invocation time, so a handler registered
//! once can never observe a value captured at registration. All mutation
//! happens on the session loop; no locking is required.

use std::sync::atomic::Ordering;

use core_events::{FetchOutcome, STALE_RESPONSES_DROPPED};
use core_text::{LanguageId, Position};

/// An accepted-for-display suggestion: the proposed text, the generation of
/// the request that produced it, and the cursor position it was anchored to
/// when it arrived. The anchor is informational; commit always uses the live
/// cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub generation: u64,
    pub anchor: Position,
}

/// How a fetch completion was reconciled against the session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Latest generation, non-empty text: the slot now holds it.
    Applied,
    /// Latest generation but no suggestion (failure or empty reply): the
    /// slot was cleared.
    Cleared,
    /// Superseded generation: dropped without touching the slot.
    Stale,
}

/// Mutable per-session suggestion state.
#[derive(Debug)]
pub struct SessionState {
    language: LanguageId,
    revision: u64,
    latest_generation: u64,
    slot: Option<Suggestion>,
}

impl SessionState {
    pub fn new(language: LanguageId) -> Self {
        Self {
            language,
            revision: 0,
            latest_generation: 0,
            slot: None,
        }
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn set_language(&mut self, language: LanguageId) {
        self.language = language;
    }

    /// Document revision as of the last edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record a document edit. Returns the new revision for arming the
    /// debounce timer.
    pub fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Highest generation issued or invalidated so far.
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    /// Reserve the next generation for a fetch about to be dispatched. The
    /// returned value travels with the request and must match
    /// [`SessionState::latest_generation`] when the response is applied.
    pub fn next_generation(&mut self) -> u64 {
        self.latest_generation += 1;
        self.latest_generation
    }

    /// Invalidate any in-flight fetch without issuing a new one. A newer
    /// edit (or a language switch) calls this so that an older request's
    /// response can never be applied, regardless of arrival order.
    pub fn invalidate_pending(&mut self) {
        self.latest_generation += 1;
    }

    /// Live view of the current suggestion. Callers must read this at
    /// invocation time, never cache it.
    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.slot.as_ref()
    }

    /// Reconcile a completed fetch against the latest generation and update
    /// the slot accordingly.
    pub fn apply_response(
        &mut self,
        generation: u64,
        outcome: FetchOutcome,
        anchor: Position,
    ) -> ResponseDisposition {
        if generation != self.latest_generation {
            STALE_RESPONSES_DROPPED.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                target: "state.suggestion",
                generation,
                latest = self.latest_generation,
                "stale_response_dropped"
            );
            return ResponseDisposition::Stale;
        }
        match outcome {
            FetchOutcome::Suggestion(text) => {
                tracing::debug!(
                    target: "state.suggestion",
                    generation,
                    text_len = text.len(),
                    anchor = %anchor,
                    "suggestion_applied"
                );
                self.slot = Some(Suggestion {
                    text,
                    generation,
                    anchor,
                });
                ResponseDisposition::Applied
            }
            FetchOutcome::NoSuggestion => {
                self.slot = None;
                ResponseDisposition::Cleared
            }
        }
    }

    /// Drop the current suggestion. Returns whether one was present.
    pub fn clear_suggestion(&mut self) -> bool {
        let was_present = self.slot.take().is_some();
        if was_present {
            tracing::trace!(target: "state.suggestion", "suggestion_cleared");
        }
        was_present
    }
}
