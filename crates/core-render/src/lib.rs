//! Ghost annotation rendering.
//!
//! Projects the current suggestion as a single cursor-anchored, zero-width
//! annotation. Every render pass fully replaces the prior decoration — the
//! renderer retires its previous handle before placing a new one — so
//! repeated calls with identical inputs leave exactly one decoration and
//! never an accumulating set. Multi-line suggestions are truncated to their
//! first line for inline display; the full text still commits on accept.

use core_state::Suggestion;
use core_surface::{DecorationHandle, EditorSurface};
use core_text::Position;
use tracing::trace;

/// Owns the lifecycle of the single live ghost decoration.
#[derive(Debug, Default)]
pub struct GhostRenderer {
    live: Option<DecorationHandle>,
}

impl GhostRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the ghost annotation for the given suggestion and cursor.
    /// `None` clears; called on suggestion change, cursor move, and clearing.
    pub fn render(
        &mut self,
        surface: &mut dyn EditorSurface,
        suggestion: Option<&Suggestion>,
        cursor: Position,
    ) {
        if let Some(prior) = self.live.take() {
            surface.clear_ghost(prior);
        }
        let Some(suggestion) = suggestion else {
            return;
        };
        let line = core_text::first_line(&suggestion.text);
        if line.is_empty() {
            return;
        }
        let handle = surface.set_ghost(cursor, line);
        trace!(
            target: "render.ghost",
            generation = suggestion.generation,
            anchor = %cursor,
            shown_len = line.len(),
            "ghost_rendered"
        );
        self.live = Some(handle);
    }

    /// Remove any live decoration.
    pub fn clear(&mut self, surface: &mut dyn EditorSurface) {
        if let Some(prior) = self.live.take() {
            surface.clear_ghost(prior);
            trace!(target: "render.ghost", "ghost_cleared");
        }
    }

    /// Handle of the currently rendered decoration, if any.
    pub fn live_handle(&self) -> Option<DecorationHandle> {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_surface::HeadlessSurface;

    fn suggestion(text: &str) -> Suggestion {
        Suggestion {
            text: text.to_string(),
            generation: 1,
            anchor: Position::MIN,
        }
    }

    #[test]
    fn renders_first_line_after_cursor() {
        let mut surface = HeadlessSurface::with_text("functio");
        let mut renderer = GhostRenderer::new();
        let cursor = Position::new(1, 8);
        renderer.render(&mut surface, Some(&suggestion("n add()\nmore")), cursor);
        let ghost = surface.ghost().expect("ghost should be live");
        assert_eq!(ghost.text, "n add()");
        assert_eq!(ghost.anchor, cursor);
    }

    #[test]
    fn none_clears_decoration() {
        let mut surface = HeadlessSurface::with_text("abc");
        let mut renderer = GhostRenderer::new();
        renderer.render(&mut surface, Some(&suggestion("xyz")), Position::new(1, 4));
        assert!(surface.ghost().is_some());
        renderer.render(&mut surface, None, Position::new(1, 4));
        assert!(surface.ghost().is_none());
        assert!(renderer.live_handle().is_none());
    }

    #[test]
    fn rerender_replaces_instead_of_accumulating() {
        let mut surface = HeadlessSurface::with_text("abc");
        let mut renderer = GhostRenderer::new();
        let s = suggestion("tail");
        for _ in 0..3 {
            renderer.render(&mut surface, Some(&s), Position::new(1, 4));
        }
        // One live decoration; each pass replaced the previous one.
        assert!(surface.ghost().is_some());
        assert_eq!(surface.ghost_sets_total(), 3);
        renderer.clear(&mut surface);
        assert!(surface.ghost().is_none());
    }

    #[test]
    fn cursor_move_reanchors_ghost() {
        let mut surface = HeadlessSurface::with_text("ab\ncd");
        let mut renderer = GhostRenderer::new();
        let s = suggestion("tail");
        renderer.render(&mut surface, Some(&s), Position::new(1, 3));
        renderer.render(&mut surface, Some(&s), Position::new(2, 2));
        assert_eq!(surface.ghost().unwrap().anchor, Position::new(2, 2));
    }

    #[test]
    fn empty_first_line_renders_nothing() {
        let mut surface = HeadlessSurface::with_text("abc");
        let mut renderer = GhostRenderer::new();
        renderer.render(
            &mut surface,
            Some(&suggestion("\nsecond line only")),
            Position::new(1, 4),
        );
        assert!(surface.ghost().is_none());
        assert!(renderer.live_handle().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut surface = HeadlessSurface::with_text("abc");
        let mut renderer = GhostRenderer::new();
        renderer.render(&mut surface, Some(&suggestion("x")), Position::new(1, 4));
        renderer.clear(&mut surface);
        renderer.clear(&mut surface);
        assert!(surface.ghost().is_none());
    }
}
