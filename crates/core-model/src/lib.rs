//! High-level session model: the single owner of document, suggestion state,
//! renderer, and storage, driven by events from the session loop.
//!
//! Every handler runs on the loop thread, so reads of the suggestion slot
//! are always live — the accept path and the render path can never observe
//! two different suggestions for the same generation, and a gesture handler
//! installed once keeps seeing later suggestions because it dereferences the
//! slot at invocation time instead of capturing a value.
//!
//! Invalidation discipline:
//! * every document change (edit, accept-commit, language switch, reset)
//!   invalidates in-flight fetches via a generation bump, then edits re-arm
//!   the debounce timer with the new revision;
//! * debounce expiries are honored only for the current revision;
//! * fetch completions are honored only for the latest generation.
//!
//! Persistence sync: the committed text is written to the per-language store
//! on every edit and immediately after an accept-commit (before transient
//! state is cleared), and the outgoing language's text is written before a
//! language switch replaces the document.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use core_events::{
    Event, InputEvent, SHORT_INPUT_SUPPRESSIONS, STALE_TIMERS_IGNORED, SUGGESTIONS_ACCEPTED,
    SuggestionEvent,
};
use core_render::GhostRenderer;
use core_state::{ResponseDisposition, SessionState};
use core_storage::{ACTIVE_LANGUAGE_KEY, KeyValueStore, code_key};
use core_suggest::{DebounceScheduler, SuggestClient, SuggestionRequest, spawn_fetch};
use core_surface::EditorSurface;
use core_text::{LanguageId, Position};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, trace, warn};

/// Suggestion policy knobs, decoupled from the config crate so embedders can
/// construct a model without a config file.
#[derive(Debug, Clone, Copy)]
pub struct SuggestPolicy {
    /// Quiet period after the last edit before fetching.
    pub debounce: Duration,
    /// Minimum document length (chars) required to fetch.
    pub min_chars: usize,
}

impl Default for SuggestPolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(600),
            min_chars: 5,
        }
    }
}

/// Session orchestrator. Generic over the surface so frontends and tests
/// supply their own editing substrate.
pub struct EditorModel<S: EditorSurface> {
    surface: S,
    state: SessionState,
    renderer: GhostRenderer,
    store: Box<dyn KeyValueStore>,
    debounce: DebounceScheduler,
    client: Arc<dyn SuggestClient>,
    tx: Sender<Event>,
    min_chars: usize,
}

impl<S: EditorSurface> EditorModel<S> {
    pub fn new(
        surface: S,
        store: Box<dyn KeyValueStore>,
        client: Arc<dyn SuggestClient>,
        tx: Sender<Event>,
        language: LanguageId,
        policy: SuggestPolicy,
    ) -> Self {
        Self {
            surface,
            state: SessionState::new(language),
            renderer: GhostRenderer::new(),
            store,
            debounce: DebounceScheduler::new(policy.debounce),
            client,
            tx,
            min_chars: policy.min_chars,
        }
    }

    /// Restore the persisted session: previously selected language (when
    /// stored) and its stored-or-default document.
    pub fn bootstrap(&mut self) {
        if let Some(language) = core_storage::stored_language(self.store.as_ref()) {
            self.state.set_language(language);
        }
        let language = self.state.language();
        let text = core_storage::stored_or_default(self.store.as_ref(), language);
        self.surface.set_text(&text);
        self.surface.set_cursor(core_text::end_position(&text));
        info!(
            target: "model",
            language = language.as_str(),
            text_len = text.len(),
            "session_restored"
        );
    }

    pub fn language(&self) -> LanguageId {
        self.state.language()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Dispatch one loop event. `Event::Shutdown` is the loop's concern and
    /// is ignored here.
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Input(input) => self.handle_input(input),
            Event::DebounceElapsed { revision } => {
                self.handle_debounce_elapsed(revision);
                Ok(())
            }
            Event::Suggestion(ev) => {
                self.handle_suggestion(ev);
                Ok(())
            }
            Event::Command(_) | Event::Shutdown => Ok(()),
        }
    }

    pub fn handle_input(&mut self, input: InputEvent) -> Result<()> {
        match input {
            InputEvent::Edit { text, cursor } => {
                self.handle_edit(&text, cursor);
                Ok(())
            }
            InputEvent::CursorMoved(pos) => {
                self.handle_cursor_moved(pos);
                Ok(())
            }
            InputEvent::Accept => self.handle_accept(),
            InputEvent::SelectLanguage(language) => {
                self.handle_select_language(language);
                Ok(())
            }
            InputEvent::Reset => {
                self.handle_reset();
                Ok(())
            }
        }
    }

    /// Document content changed: persist, invalidate in-flight fetches, and
    /// restart the quiet period.
    pub fn handle_edit(&mut self, text: &str, cursor: Position) {
        self.surface.set_text(text);
        self.surface.set_cursor(cursor);
        self.persist_current();
        self.state.invalidate_pending();
        let revision = self.state.bump_revision();
        self.debounce.arm(self.tx.clone(), revision);
        // The prior suggestion stays visible (re-anchored) until superseded
        // or cleared by the short-input guard.
        let cursor = self.surface.cursor();
        self.renderer
            .render(&mut self.surface, self.state.suggestion(), cursor);
    }

    /// Cursor moved without a content change: re-anchor the ghost.
    pub fn handle_cursor_moved(&mut self, pos: Position) {
        self.surface.set_cursor(pos);
        let cursor = self.surface.cursor();
        self.renderer
            .render(&mut self.surface, self.state.suggestion(), cursor);
    }

    /// The debounce quiet period elapsed for `revision`.
    pub fn handle_debounce_elapsed(&mut self, revision: u64) {
        if revision != self.state.revision() {
            STALE_TIMERS_IGNORED.fetch_add(1, Ordering::Relaxed);
            trace!(
                target: "suggest.debounce",
                revision,
                current = self.state.revision(),
                "stale_timer_ignored"
            );
            return;
        }
        let text = self.surface.text();
        if core_text::char_len(&text) < self.min_chars {
            SHORT_INPUT_SUPPRESSIONS.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "suggest.debounce",
                chars = core_text::char_len(&text),
                min_chars = self.min_chars,
                "short_input_suppressed"
            );
            self.state.clear_suggestion();
            self.renderer.clear(&mut self.surface);
            return;
        }
        let generation = self.state.next_generation();
        spawn_fetch(
            Arc::clone(&self.client),
            SuggestionRequest {
                generation,
                source_text: text,
            },
            self.tx.clone(),
        );
    }

    /// A fetch completed; reconcile it against the latest generation.
    pub fn handle_suggestion(&mut self, ev: SuggestionEvent) {
        let anchor = self.surface.cursor();
        match self.state.apply_response(ev.generation, ev.outcome, anchor) {
            ResponseDisposition::Applied => {
                self.renderer
                    .render(&mut self.surface, self.state.suggestion(), anchor);
            }
            ResponseDisposition::Cleared => {
                self.renderer.clear(&mut self.surface);
            }
            ResponseDisposition::Stale => {}
        }
    }

    /// Accept gesture: commit the live suggestion at the live cursor.
    ///
    /// Reads both at invocation time; the insertion base is the surface's
    /// authoritative content, never a reconstruction from cached strings.
    /// The post-acceptance text is persisted before transient state is
    /// cleared so a restart never loses an accepted suggestion.
    pub fn handle_accept(&mut self) -> Result<()> {
        let Some(suggestion) = self.state.suggestion() else {
            trace!(target: "model.accept", "accept_without_suggestion");
            return Ok(());
        };
        let text = suggestion.text.clone();
        let generation = suggestion.generation;

        let cursor = self.surface.cursor();
        let after = self.surface.insert_at(cursor, &text)?;
        self.surface.set_cursor(after);
        self.persist_current();

        self.state.clear_suggestion();
        self.renderer.clear(&mut self.surface);
        SUGGESTIONS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
        info!(
            target: "model.accept",
            generation,
            at = %cursor,
            inserted_len = text.len(),
            "suggestion_accepted"
        );

        // The commit is itself a document change: invalidate in-flight
        // fetches and start a fresh suggestion cycle.
        self.state.invalidate_pending();
        let revision = self.state.bump_revision();
        self.debounce.arm(self.tx.clone(), revision);
        Ok(())
    }

    /// External language selection: persist the outgoing document, clear all
    /// transient suggestion state, and load the incoming language's
    /// stored-or-default text.
    pub fn handle_select_language(&mut self, language: LanguageId) {
        let outgoing = self.state.language();
        if language == outgoing {
            return;
        }
        self.persist_current();
        self.debounce.cancel();
        self.state.invalidate_pending();
        self.state.clear_suggestion();
        self.renderer.clear(&mut self.surface);

        self.state.set_language(language);
        let text = core_storage::stored_or_default(self.store.as_ref(), language);
        self.surface.set_text(&text);
        self.surface.set_cursor(core_text::end_position(&text));
        if let Err(e) = self.store.set(ACTIVE_LANGUAGE_KEY, language.as_str()) {
            warn!(target: "storage", error = %e, "active_language_persist_failed");
        }
        info!(
            target: "model.language",
            from = outgoing.as_str(),
            to = language.as_str(),
            "language_switched"
        );
    }

    /// Restore the active language's default template and drop its stored
    /// entry.
    pub fn handle_reset(&mut self) {
        let language = self.state.language();
        self.debounce.cancel();
        self.state.invalidate_pending();
        self.state.clear_suggestion();
        self.renderer.clear(&mut self.surface);
        if let Err(e) = self.store.remove(&code_key(language)) {
            warn!(target: "storage", error = %e, "reset_remove_failed");
        }
        let text = core_storage::default_template(language);
        self.surface.set_text(text);
        self.surface.set_cursor(core_text::end_position(text));
        info!(target: "model", language = language.as_str(), "document_reset");
    }

    fn persist_current(&mut self) {
        let language = self.state.language();
        let text = self.surface.text();
        if let Err(e) = self.store.set(&code_key(language), &text) {
            // Persistence is best-effort; editing availability wins.
            warn!(
                target: "storage",
                language = language.as_str(),
                error = %e,
                "persist_failed"
            );
        }
    }
}
