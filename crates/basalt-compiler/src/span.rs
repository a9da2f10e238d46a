//! Source location tracking.
//!
//! Tokens carry a `Span` (byte offsets into the normalized source).
//! A `LineIndex` converts offsets to line/column pairs, and a
//! `Location` bundles the full first/last coordinates of a token for
//! error reporting.

/// A span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Span {
    /// Byte offset of the start.
    pub start: u32,
    /// Byte offset of the end (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create an empty span at a position.
    #[inline]
    pub const fn empty(pos: u32) -> Self {
        Self { start: pos, end: pos }
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    #[inline]
    pub const fn merge(self, other: Span) -> Span {
        Span {
            start: if self.start < other.start { self.start } else { other.start },
            end: if self.end > other.end { self.end } else { other.end },
        }
    }
}

/// Full coordinates of a source range, derived from a [`Span`] and a
/// [`LineIndex`]. Lines and columns are 0-indexed; `last_line` /
/// `last_column` point at the final byte, the `_exclusive` pair one
/// past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
    pub last_line_exclusive: u32,
    pub last_column_exclusive: u32,
    /// Byte range `[start, end)` in the normalized source.
    pub range: (u32, u32),
}

impl Location {
    /// Resolve a span against a line index.
    pub fn of(span: Span, index: &LineIndex) -> Self {
        let (first_line, first_column) = index.line_col(span.start);
        let last = if span.is_empty() { span.start } else { span.end - 1 };
        let (last_line, last_column) = index.line_col(last);
        let (last_line_exclusive, last_column_exclusive) = index.line_col(span.end);
        Self {
            first_line,
            first_column,
            last_line,
            last_column,
            last_line_exclusive,
            last_column_exclusive,
            range: (span.start, span.end),
        }
    }
}

/// Convert byte offsets to line/column and vice versa.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from source code.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to line and column (both 0-indexed).
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));
        let col = offset - self.line_starts[line];
        (line as u32, col)
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
