//! Editor surface abstraction and headless implementation.
//!
//! The engine never talks to a concrete editor widget; it depends on this
//! capability set only: read/replace the full text, read/move the cursor,
//! insert text at a position, and place/clear a transient non-editable ghost
//! annotation. `HeadlessSurface` is the in-memory implementation used by the
//! binary driver and by tests; a GUI or terminal frontend would supply its
//! own impl without touching the engine.

use anyhow::Result;
use core_text::Position;

/// Opaque identifier for a rendered ghost annotation.
///
/// Handles are surface-scoped and never reused within a session, so a stale
/// clear is detectable (and ignored) rather than silently clearing a newer
/// annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationHandle(u64);

impl DecorationHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Capability interface the suggestion engine requires from its host editor.
pub trait EditorSurface {
    /// Authoritative current document content.
    fn text(&self) -> String;
    /// Replace the entire document content. The cursor is clamped to the new
    /// text's end if it would fall outside it.
    fn set_text(&mut self, text: &str);
    /// Current cursor position.
    fn cursor(&self) -> Position;
    /// Move the cursor.
    fn set_cursor(&mut self, pos: Position);
    /// Insert `text` at `pos` (clamped into range) and return the cursor
    /// position immediately after the inserted run.
    fn insert_at(&mut self, pos: Position, text: &str) -> Result<Position>;
    /// Render a transient, non-editable annotation immediately after `pos`
    /// and return its handle. Retiring a previously returned handle is the
    /// caller's job via [`EditorSurface::clear_ghost`].
    fn set_ghost(&mut self, pos: Position, text: &str) -> DecorationHandle;
    /// Remove the annotation identified by `handle`. Clearing a handle that
    /// is no longer live is a no-op.
    fn clear_ghost(&mut self, handle: DecorationHandle);
}

/// Live ghost annotation inside a [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostAnnotation {
    pub handle: DecorationHandle,
    pub anchor: Position,
    pub text: String,
}

/// In-memory surface: a plain string, a cursor, and at most one live ghost
/// annotation. Tracks how many annotations were ever set so tests can assert
/// render idempotence (replacement, never accumulation).
#[derive(Debug)]
pub struct HeadlessSurface {
    text: String,
    cursor: Position,
    ghost: Option<GhostAnnotation>,
    next_handle: u64,
    ghost_sets_total: u64,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            cursor: Position::MIN,
            ghost: None,
            next_handle: 0,
            ghost_sets_total: 0,
        }
    }

    pub fn with_text(text: &str) -> Self {
        let mut s = Self::new();
        s.set_text(text);
        s
    }

    /// Currently rendered ghost annotation, if any.
    pub fn ghost(&self) -> Option<&GhostAnnotation> {
        self.ghost.as_ref()
    }

    /// Total number of `set_ghost` calls over the surface lifetime.
    pub fn ghost_sets_total(&self) -> u64 {
        self.ghost_sets_total
    }
}

impl EditorSurface for HeadlessSurface {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        let end = core_text::end_position(&self.text);
        if self.cursor > end {
            self.cursor = end;
        }
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        let end = core_text::end_position(&self.text);
        self.cursor = pos.min(end);
    }

    fn insert_at(&mut self, pos: Position, text: &str) -> Result<Position> {
        let after = core_text::insert_at(&mut self.text, pos, text);
        tracing::trace!(
            target: "surface",
            at = %pos,
            after = %after,
            inserted_len = text.len(),
            "insert_at"
        );
        Ok(after)
    }

    fn set_ghost(&mut self, pos: Position, text: &str) -> DecorationHandle {
        self.next_handle += 1;
        self.ghost_sets_total += 1;
        let handle = DecorationHandle(self.next_handle);
        self.ghost = Some(GhostAnnotation {
            handle,
            anchor: pos,
            text: text.to_string(),
        });
        handle
    }

    fn clear_ghost(&mut self, handle: DecorationHandle) {
        if self.ghost.as_ref().is_some_and(|g| g.handle == handle) {
            self.ghost = None;
        }
    }
}
