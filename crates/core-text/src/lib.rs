//! Plain-text primitives shared across the suggestion engine: 1-based
//! positions, position/offset mapping, and the document value the session
//! mutates.
//!
//! Positions are `(line, column)` pairs counted from 1 to stay consistent
//! with the editing surfaces this engine anchors annotations to. Columns are
//! counted in `char`s within a line; lines are separated by `\n`. Offset
//! mapping clamps out-of-range positions to the nearest valid point instead
//! of failing, so a cursor that drifted past a shrinking document still
//! resolves to a usable insertion point.

use std::fmt;
use std::str::FromStr;

/// 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Top-left of any document.
    pub const MIN: Position = Position { line: 1, column: 1 };

    /// Construct a position, clamping zero components up to 1 so the 1-based
    /// invariant holds even for careless callers.
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Supported document languages. Closed set mirroring the persisted
/// per-language storage scheme; the stable id doubles as the storage key
/// suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Javascript,
    Typescript,
    Python,
    Rust,
    Go,
}

impl LanguageId {
    pub const ALL: [LanguageId; 5] = [
        LanguageId::Javascript,
        LanguageId::Typescript,
        LanguageId::Python,
        LanguageId::Rust,
        LanguageId::Go,
    ];

    /// Stable identifier used in storage keys and the selection protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Javascript => "javascript",
            LanguageId::Typescript => "typescript",
            LanguageId::Python => "python",
            LanguageId::Rust => "rust",
            LanguageId::Go => "go",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageId::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

/// Parse error for language identifiers arriving over the selection protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown language id: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

/// Editor-session document: full text, selected language, cursor.
///
/// Mutated only by user edits or an accept-commit; the session owns it
/// exclusively and all readers observe it through the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub language: LanguageId,
    pub cursor: Position,
}

impl Document {
    pub fn new(text: impl Into<String>, language: LanguageId) -> Self {
        let text = text.into();
        let cursor = end_position(&text);
        Self {
            text,
            language,
            cursor,
        }
    }
}

/// Map a position to a byte offset into `text`, clamping both line and
/// column to the valid range.
pub fn byte_offset(text: &str, pos: Position) -> usize {
    let mut line_start = 0usize;
    let mut line_index = 1u32;
    for (idx, ch) in text.char_indices() {
        if line_index >= pos.line {
            break;
        }
        if ch == '\n' {
            line_start = idx + 1;
            line_index += 1;
        }
    }
    if line_index < pos.line {
        // Requested line is past the last one; clamp to document end.
        return text.len();
    }
    let line = &text[line_start..];
    let line_end = line.find('\n').unwrap_or(line.len());
    let mut column = 1u32;
    for (idx, _) in line[..line_end].char_indices() {
        if column >= pos.column {
            return line_start + idx;
        }
        column += 1;
    }
    // Column clamps to end of line.
    line_start + line_end
}

/// Position just past the final character of `text`.
pub fn end_position(text: &str) -> Position {
    let mut line = 1u32;
    let mut column = 1u32;
    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Position { line, column }
}

/// Insert `insert` into `text` at `pos` (clamped), returning the position
/// immediately after the inserted run. The returned position is where a
/// cursor lands after committing the insertion.
pub fn insert_at(text: &mut String, pos: Position, insert: &str) -> Position {
    let offset = byte_offset(text, pos);
    text.insert_str(offset, insert);
    end_position(&text[..offset + insert.len()])
}

/// First line of `text` (without the trailing newline). Used to truncate
/// multi-line suggestions for inline display.
pub fn first_line(text: &str) -> &str {
    match text.find('\n') {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Character count of `text`. The short-input guard counts characters,
/// not bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_maps_lines_and_columns() {
        let text = "ab\ncdef\ng";
        assert_eq!(byte_offset(text, Position::new(1, 1)), 0);
        assert_eq!(byte_offset(text, Position::new(1, 3)), 2);
        assert_eq!(byte_offset(text, Position::new(2, 1)), 3);
        assert_eq!(byte_offset(text, Position::new(2, 4)), 6);
        assert_eq!(byte_offset(text, Position::new(3, 2)), 9);
    }

    #[test]
    fn byte_offset_clamps_out_of_range() {
        let text = "ab\ncd";
        // Column past end of line clamps to the line end.
        assert_eq!(byte_offset(text, Position::new(1, 99)), 2);
        // Line past end of document clamps to document end.
        assert_eq!(byte_offset(text, Position::new(9, 1)), 5);
    }

    #[test]
    fn byte_offset_counts_chars_not_bytes() {
        let text = "héllo";
        // 'é' is two bytes; column 3 must land after it.
        assert_eq!(byte_offset(text, Position::new(1, 3)), 3);
    }

    #[test]
    fn end_position_tracks_newlines() {
        assert_eq!(end_position(""), Position::MIN);
        assert_eq!(end_position("abc"), Position::new(1, 4));
        assert_eq!(end_position("ab\nc"), Position::new(2, 2));
        assert_eq!(end_position("ab\n"), Position::new(2, 1));
    }

    #[test]
    fn insert_at_returns_post_insert_cursor() {
        let mut text = String::from("functio");
        let cursor = insert_at(&mut text, Position::new(1, 8), "n add(a,b){return a+b}");
        assert_eq!(text, "function add(a,b){return a+b}");
        assert_eq!(cursor, Position::new(1, 31));
    }

    #[test]
    fn insert_at_mid_document() {
        let mut text = String::from("ab\ncd");
        let cursor = insert_at(&mut text, Position::new(2, 2), "X");
        assert_eq!(text, "ab\ncXd");
        assert_eq!(cursor, Position::new(2, 3));
    }

    #[test]
    fn insert_at_with_newline_moves_cursor_down() {
        let mut text = String::from("ab");
        let cursor = insert_at(&mut text, Position::new(1, 3), "\nxy");
        assert_eq!(text, "ab\nxy");
        assert_eq!(cursor, Position::new(2, 3));
    }

    #[test]
    fn first_line_truncates_multi_line() {
        assert_eq!(first_line("one\ntwo\nthree"), "one");
        assert_eq!(first_line("single"), "single");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn language_id_round_trips_through_str() {
        for lang in LanguageId::ALL {
            assert_eq!(lang.as_str().parse::<LanguageId>().unwrap(), lang);
        }
        assert!("cobol".parse::<LanguageId>().is_err());
    }

    #[test]
    fn document_new_places_cursor_at_end() {
        let doc = Document::new("ab\nc", LanguageId::Python);
        assert_eq!(doc.cursor, Position::new(2, 2));
    }
}
