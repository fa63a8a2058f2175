//! Editor actions.
//!
//! `EditorAction` represents semantic editing operations on the markdown
//! source of a note, decoupled from how they're triggered (toolbar,
//! keybinding, paste handler).

/// A range in the document, measured in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    /// Normalize range so start <= end.
    pub fn normalize(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(r: Range) -> Self {
        r.start..r.end
    }
}

/// Inline formatting marks that toggle by wrapping the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl MarkKind {
    /// The delimiter written on both sides of the marked text.
    pub fn delimiter(self) -> &'static str {
        match self {
            MarkKind::Bold => "**",
            MarkKind::Italic => "*",
            MarkKind::Underline => "__",
            MarkKind::Strikethrough => "~~",
            MarkKind::Code => "`",
        }
    }
}

/// Heading level, always within 1..=6.
///
/// Keybindings map directly: `Primary+Alt+N` is level N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Clamp any input to a valid level.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(1, 6))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The `#` marker plus trailing space.
    pub fn prefix(self) -> String {
        format!("{} ", "#".repeat(self.0 as usize))
    }
}

/// All editor actions.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    // === Text Insertion ===
    /// Insert text at the given range (replacing any selected content).
    Insert { text: String, range: Range },

    /// Insert a paragraph break (Enter). Continues or exits lists.
    InsertParagraph { range: Range },

    // === Deletion ===
    /// Delete content backward (Backspace).
    DeleteBackward { range: Range },

    /// Delete content forward (Delete key).
    DeleteForward { range: Range },

    /// Delete word backward (Ctrl/Alt+Backspace).
    DeleteWordBackward { range: Range },

    // === History ===
    /// Undo the last change. Snapshot history lives in the session.
    Undo,

    /// Redo the last undone change.
    Redo,

    // === Inline formatting ===
    /// Toggle an inline mark on the selection. A collapsed selection
    /// inserts an empty pair with the cursor between the delimiters.
    ToggleMark(MarkKind),

    /// Wrap the selection in `[text](url)`.
    InsertLink { url: String },

    /// Embed an image as `![alt](src)` at the cursor.
    InsertImage { alt: String, src: String },

    /// Wrap or unwrap the selection with an arbitrary delimiter pair.
    WrapOrUnwrap { before: String, after: String },

    // === Line formatting ===
    /// Set the cursor's line to a heading; toggles off at the same level.
    SetHeadingLevel(HeadingLevel),

    ToggleBulletList,

    ToggleOrderedList,

    ToggleTaskList,

    /// Toggle an arbitrary block prefix (`> `, `## `, `- `) on the line.
    InsertBlockPrefix { prefix: String },

    // === Selection ===
    SelectAll,

    /// Move cursor to position.
    MoveCursor { offset: usize },

    /// Extend selection to position.
    ExtendSelection { offset: usize },
}

impl EditorAction {
    /// Whether this action is ordinary typing, which history may coalesce.
    pub fn is_typing(&self) -> bool {
        matches!(
            self,
            Self::Insert { .. }
                | Self::DeleteBackward { .. }
                | Self::DeleteForward { .. }
                | Self::DeleteWordBackward { .. }
        )
    }

    /// Whether this action only moves the cursor or selection.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::SelectAll | Self::MoveCursor { .. } | Self::ExtendSelection { .. }
        )
    }
}
