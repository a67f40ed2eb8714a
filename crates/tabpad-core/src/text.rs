//! Derived text metrics.
//!
//! The document text is the single source of truth. Everything in this module is a pure
//! projection of it: character/line counts and the 1-indexed cursor position for a character
//! offset. Line breaks are `'\n'` only, so `"a\r\nb"` is two lines and a lone `'\r'` is not a
//! line break.

use ropey::Rope;

/// A 1-indexed cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CursorPosition {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column (in characters) within the line.
    pub column: usize,
}

impl CursorPosition {
    /// Create a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for CursorPosition {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// Cached metrics of a document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    /// Number of characters (Unicode scalar values).
    pub char_count: usize,
    /// Number of lines: `'\n'` count + 1 (an empty text has one line).
    pub line_count: usize,
    /// Number of UTF-8 bytes.
    pub byte_count: usize,
}

impl TextMetrics {
    /// Compute metrics for `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            char_count: text.chars().count(),
            line_count: line_count(text),
            byte_count: text.len(),
        }
    }
}

/// Number of lines in `text`: 1 for the empty string, otherwise the number of `'\n'` plus one.
pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count() + 1
}

/// Rope-backed line index over a snapshot of the document text.
///
/// Built once per edit; answers offset -> (line, column) queries in O(log n).
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    rope: Rope,
}

impl LineIndex {
    /// Build an index from text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Number of lines (same rule as [`line_count`]).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Convert a character offset to a 1-indexed cursor position.
    ///
    /// Offsets past the end are clamped to the end of the text. The column is
    /// `offset - (index of the last '\n' before offset)`, which makes it 1-indexed.
    pub fn cursor_at(&self, char_offset: usize) -> CursorPosition {
        let offset = char_offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        let line_start = self.rope.line_to_char(line);
        CursorPosition {
            line: line + 1,
            column: offset - line_start + 1,
        }
    }

    /// Convert a 1-indexed position back to a character offset (clamped to the line).
    pub fn offset_of(&self, position: CursorPosition) -> usize {
        let line = position.line.max(1) - 1;
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(line);
        let line_len = self.line_len_without_newline(line);
        line_start + (position.column.max(1) - 1).min(line_len)
    }

    fn line_len_without_newline(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }
}
