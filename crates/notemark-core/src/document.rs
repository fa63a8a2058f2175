//! Editor document trait and the plain field-backed implementation.
//!
//! `EditorDocument` pairs a [`TextBuffer`] holding the markdown source with
//! cursor, selection and composition state. The mutation engine in
//! [`crate::execute`] is written against this trait only.

use std::ops::Range;

use smol_str::SmolStr;
use web_time::Instant;

use crate::text::TextBuffer;
use crate::types::{BLOCK_SYNTAX_ZONE, CompositionState, CursorState, EditInfo, Selection};

/// Core trait for editor documents.
pub trait EditorDocument {
    type Buffer: TextBuffer;

    // === Required: Buffer access ===

    fn buffer(&self) -> &Self::Buffer;

    fn buffer_mut(&mut self) -> &mut Self::Buffer;

    // === Required: Cursor/selection state ===

    fn cursor(&self) -> CursorState;

    fn set_cursor(&mut self, cursor: CursorState);

    /// Current selection. `None` or a collapsed selection both mean "no
    /// range selected".
    fn selection(&self) -> Option<Selection>;

    fn set_selection(&mut self, selection: Option<Selection>);

    // === Required: Edit tracking ===

    fn last_edit(&self) -> Option<EditInfo>;

    fn set_last_edit(&mut self, edit: Option<EditInfo>);

    // === Required: Composition (IME) state ===

    fn composition(&self) -> Option<CompositionState>;

    fn set_composition(&mut self, composition: Option<CompositionState>);

    // === Provided: Convenience accessors ===

    fn cursor_offset(&self) -> usize {
        self.cursor().offset
    }

    /// Set just the cursor offset, preserving other cursor state.
    fn set_cursor_offset(&mut self, offset: usize) {
        let mut cursor = self.cursor();
        cursor.offset = offset.min(self.len_chars());
        self.set_cursor(cursor);
    }

    /// The active range, or a collapsed range at the cursor.
    fn selection_or_cursor(&self) -> Selection {
        match self.selection() {
            Some(sel) => sel,
            None => Selection::collapsed(self.cursor_offset()),
        }
    }

    fn content_string(&self) -> String {
        self.buffer().to_string()
    }

    fn len_chars(&self) -> usize {
        self.buffer().len_chars()
    }

    fn is_empty(&self) -> bool {
        self.buffer().len_chars() == 0
    }

    fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        self.buffer().slice(range)
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.buffer().char_at(offset)
    }

    fn selected_text(&self) -> Option<SmolStr> {
        self.selection()
            .filter(|sel| !sel.is_collapsed())
            .and_then(|sel| self.buffer().slice(sel.to_range()))
    }

    // === Provided: Text operations ===

    /// Insert text at char offset, returning edit info.
    fn insert(&mut self, offset: usize, text: &str) -> EditInfo {
        let contains_newline = text.contains('\n');
        let in_block_syntax_zone = self.is_in_block_syntax_zone(offset);

        self.buffer_mut().insert(offset, text);

        let inserted_len = text.chars().count();
        self.set_cursor_offset(offset + inserted_len);
        self.record_edit(offset, inserted_len, 0, contains_newline, in_block_syntax_zone)
    }

    /// Delete char range, returning edit info.
    fn delete(&mut self, range: Range<usize>) -> EditInfo {
        let contains_newline = self
            .buffer()
            .slice(range.clone())
            .is_some_and(|s| s.contains('\n'));
        let in_block_syntax_zone = self.is_in_block_syntax_zone(range.start);
        let deleted_len = range.end.saturating_sub(range.start);

        self.buffer_mut().delete(range.clone());
        self.set_cursor_offset(range.start);
        self.record_edit(range.start, 0, deleted_len, contains_newline, in_block_syntax_zone)
    }

    /// Replace char range with text, returning edit info.
    fn replace(&mut self, range: Range<usize>, text: &str) -> EditInfo {
        let deleted_newline = self
            .buffer()
            .slice(range.clone())
            .is_some_and(|s| s.contains('\n'));
        let contains_newline = text.contains('\n') || deleted_newline;
        let in_block_syntax_zone = self.is_in_block_syntax_zone(range.start);
        let deleted_len = range.end.saturating_sub(range.start);

        self.buffer_mut().replace(range.clone(), text);

        let inserted_len = text.chars().count();
        self.set_cursor_offset(range.start + inserted_len);
        self.record_edit(
            range.start,
            inserted_len,
            deleted_len,
            contains_newline,
            in_block_syntax_zone,
        )
    }

    /// Replace the whole buffer. Used for external updates, which are
    /// allowed to lose the cursor; it is clamped to the new length.
    fn reset_contents(&mut self, text: &str) {
        self.buffer_mut().set_contents(text);
        let len = self.len_chars();
        let offset = self.cursor_offset().min(len);
        self.set_cursor_offset(offset);
        self.set_selection(None);
        self.set_composition(None);
        self.set_last_edit(None);
    }

    /// Delete the current selection, if any.
    fn delete_selection(&mut self) -> Option<EditInfo> {
        let sel = self.selection()?;
        self.set_selection(None);
        if sel.is_collapsed() {
            return None;
        }
        Some(self.delete(sel.to_range()))
    }

    // === Provided: Helpers ===

    fn record_edit(
        &mut self,
        edit_char_pos: usize,
        inserted_len: usize,
        deleted_len: usize,
        contains_newline: bool,
        in_block_syntax_zone: bool,
    ) -> EditInfo {
        let edit = EditInfo {
            edit_char_pos,
            inserted_len,
            deleted_len,
            contains_newline,
            in_block_syntax_zone,
            doc_len_after: self.len_chars(),
            timestamp: Instant::now(),
        };
        self.set_last_edit(Some(edit.clone()));
        edit
    }

    /// Check if offset is in the block-syntax zone (first few chars of line).
    fn is_in_block_syntax_zone(&self, offset: usize) -> bool {
        let buffer = self.buffer();
        let line_start = buffer.line_start(buffer.line_of(offset));
        offset.saturating_sub(line_start) <= BLOCK_SYNTAX_ZONE
    }
}

/// Simple field-based implementation of EditorDocument.
#[derive(Clone, Default)]
pub struct PlainEditor<T: TextBuffer> {
    buffer: T,
    cursor: CursorState,
    selection: Option<Selection>,
    last_edit: Option<EditInfo>,
    composition: Option<CompositionState>,
}

impl<T: TextBuffer> PlainEditor<T> {
    pub fn new(buffer: T) -> Self {
        Self {
            buffer,
            cursor: CursorState::default(),
            selection: None,
            last_edit: None,
            composition: None,
        }
    }
}

impl<T: TextBuffer> EditorDocument for PlainEditor<T> {
    type Buffer = T;

    fn buffer(&self) -> &Self::Buffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    fn cursor(&self) -> CursorState {
        self.cursor
    }

    fn set_cursor(&mut self, cursor: CursorState) {
        self.cursor = cursor;
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn last_edit(&self) -> Option<EditInfo> {
        self.last_edit.clone()
    }

    fn set_last_edit(&mut self, edit: Option<EditInfo>) {
        self.last_edit = edit;
    }

    fn composition(&self) -> Option<CompositionState> {
        self.composition.clone()
    }

    fn set_composition(&mut self, composition: Option<CompositionState>) {
        self.composition = composition;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditorRope;

    fn make_editor(content: &str) -> PlainEditor<EditorRope> {
        PlainEditor::new(EditorRope::from_str(content))
    }

    #[test]
    fn test_insert_moves_cursor() {
        let mut editor = make_editor("hello");
        let edit = editor.insert(5, " world");
        assert_eq!(editor.content_string(), "hello world");
        assert_eq!(edit.inserted_len, 6);
        assert_eq!(editor.cursor_offset(), 11);
    }

    #[test]
    fn test_replace() {
        let mut editor = make_editor("hello world");
        let edit = editor.replace(6..11, "rust");
        assert_eq!(editor.content_string(), "hello rust");
        assert_eq!(edit.deleted_len, 5);
        assert_eq!(edit.inserted_len, 4);
    }

    #[test]
    fn test_delete_selection() {
        let mut editor = make_editor("hello world");
        editor.set_selection(Some(Selection::new(0, 5)));
        assert_eq!(editor.selected_text().as_deref(), Some("hello"));

        assert!(editor.delete_selection().is_some());
        assert_eq!(editor.content_string(), " world");
        assert!(editor.selection().is_none());
    }

    #[test]
    fn test_block_syntax_zone() {
        let mut editor = make_editor("# heading\nparagraph text here");
        assert!(editor.insert(0, "x").in_block_syntax_zone);
        // Deep inside the second line.
        assert!(!editor.insert(25, "y").in_block_syntax_zone);
    }

    #[test]
    fn test_reset_contents_clamps_cursor() {
        let mut editor = make_editor("a long line of text");
        editor.set_cursor_offset(15);
        editor.set_selection(Some(Selection::new(2, 6)));
        editor.reset_contents("short");
        assert_eq!(editor.cursor_offset(), 5);
        assert!(editor.selection().is_none());
    }
}
