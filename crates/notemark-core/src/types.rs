//! Cursor, selection, composition and edit tracking for an editing session.
//!
//! This is the micro-state of a live document that has no markdown
//! representation.

use std::ops::Range;

use web_time::Instant;

/// Cursor state including position and affinity.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    /// Character offset in text (NOT byte offset!)
    pub offset: usize,

    /// Which side of a line break the cursor sticks to.
    pub affinity: Affinity,
}

impl CursorState {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            affinity: Affinity::Before,
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// No selection, just a cursor.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }
}

/// Shift an offset that lies at or after `at` by `delta`, never moving it
/// before `at`.
pub(crate) fn shift_offset(offset: usize, at: usize, delta: isize) -> usize {
    if offset < at {
        return offset;
    }
    let moved = offset as isize + delta;
    moved.max(at as isize) as usize
}

/// IME composition state.
///
/// While a composition is active the user is building up characters that
/// are not committed to the buffer yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionState {
    pub start_offset: usize,
    pub text: String,
}

impl CompositionState {
    pub fn new(start_offset: usize, text: String) -> Self {
        Self { start_offset, text }
    }

    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.chars().count()
    }
}

/// Information about the most recent edit.
#[derive(Clone, Debug)]
pub struct EditInfo {
    /// Character offset where the edit occurred
    pub edit_char_pos: usize,
    pub inserted_len: usize,
    pub deleted_len: usize,
    /// Whether the inserted or deleted text contains a newline.
    pub contains_newline: bool,
    /// Whether the edit is in the block-syntax zone of a line (first few chars).
    /// Edits there can change a line's block kind.
    pub in_block_syntax_zone: bool,
    pub doc_len_after: usize,
    /// When this edit occurred. Drives history coalescing.
    pub timestamp: Instant,
}

impl PartialEq for EditInfo {
    fn eq(&self, other: &Self) -> bool {
        // Compare all fields except timestamp (not meaningful for equality)
        self.edit_char_pos == other.edit_char_pos
            && self.inserted_len == other.inserted_len
            && self.deleted_len == other.deleted_len
            && self.contains_newline == other.contains_newline
            && self.in_block_syntax_zone == other.in_block_syntax_zone
            && self.doc_len_after == other.doc_len_after
    }
}

impl EditInfo {
    /// Check if this edit might change block boundaries or block kinds.
    pub fn affects_boundaries(&self) -> bool {
        self.contains_newline || self.in_block_syntax_zone
    }
}

/// Max distance from line start where block syntax can appear.
/// Covers: `######` (6), ```` ``` ```` (3), `- [ ] ` (6), `999. ` (5)
pub const BLOCK_SYNTAX_ZONE: usize = 6;
