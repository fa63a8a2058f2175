//! The document-model adapter: one editing session over one open note.
//!
//! A session is either `Uninitialized` or `Bound` to a note. While bound it
//! owns the [`EditableDocument`] (markdown buffer with cursor state, plus the
//! native block tree) and decides, synchronously after every mutation,
//! whether the change propagates to history and autosave.
//!
//! Two paths change the document:
//!
//! - native mutations (commands, typing, checkbox clicks) edit the live
//!   document in place and keep the cursor;
//! - external updates (note switch, AI rewrite, `set_content`, undo/redo)
//!   rebuild it wholesale and may lose the cursor.
//!
//! A checkbox toggle is cosmetic: the live document already shows it, so it
//! is suppressed instead of being re-serialized into a rebuild.

use smol_str::SmolStr;
use web_time::Instant;

use crate::actions::{EditorAction, Range};
use crate::block;
use crate::collab::{self, NoteStore, PasteKind, SaveDebouncer};
use crate::config::EditorConfig;
use crate::document::{EditorDocument, PlainEditor};
use crate::error::NoteError;
use crate::execute::execute_action;
use crate::history::History;
use crate::sync::{self, ChangeKind};
use crate::text::{EditorRope, TextBuffer};
use crate::tree::{DocTree, NodeId};
use crate::types::Selection;

/// Identity of one binding. Async results carry the token they were
/// requested under and are dropped if it is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingToken(u64);

impl BindingToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The live, mutable representation of the open note.
#[derive(Clone)]
pub struct EditableDocument {
    editor: PlainEditor<EditorRope>,
    tree: DocTree,
}

impl EditableDocument {
    fn new(markdown: &str) -> Self {
        Self {
            editor: PlainEditor::new(EditorRope::from_str(markdown)),
            tree: DocTree::from_markdown(markdown),
        }
    }

    pub fn editor(&self) -> &PlainEditor<EditorRope> {
        &self.editor
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    pub fn markdown(&self) -> String {
        self.editor.content_string()
    }
}

/// What a mutation or update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No note is open; nothing happened.
    NoBinding,
    /// The document did not change.
    Unchanged,
    /// A cosmetic change: applied in place, not propagated.
    Suppressed,
    /// A structural change: recorded in history and scheduled for save.
    Propagated,
    /// The document was replaced wholesale.
    Rebuilt,
    /// An update for a binding that is no longer current was dropped.
    Discarded,
}

impl SyncOutcome {
    /// Whether history and autosave saw this change.
    pub fn propagated(self) -> bool {
        matches!(self, SyncOutcome::Propagated | SyncOutcome::Rebuilt)
    }
}

/// State held while a note is open.
pub struct Binding {
    token: BindingToken,
    note_id: SmolStr,
    doc: EditableDocument,
    /// Serialization the adapter last accepted from the live document.
    accepted: String,
    /// Markdown last handed to storage, or loaded from it.
    saved: String,
    history: History,
    autosave: SaveDebouncer,
    rebuilds: u64,
}

impl Binding {
    pub fn token(&self) -> BindingToken {
        self.token
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn document(&self) -> &EditableDocument {
        &self.doc
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Classify the live buffer after a native text mutation.
    fn sync_from_text(&mut self, config: &EditorConfig, typing: bool) -> SyncOutcome {
        let candidate = self.doc.markdown();
        match sync::classify(&self.accepted, &candidate) {
            ChangeKind::Unchanged => SyncOutcome::Unchanged,
            ChangeKind::Cosmetic { toggled } => {
                let blocks = block::decode(&candidate);
                self.doc.tree.apply_checked_from(&blocks, &toggled);
                tracing::trace!(
                    target: "notemark::sync",
                    note = %self.note_id,
                    ?toggled,
                    "suppressed cosmetic change"
                );
                self.accepted = candidate;
                SyncOutcome::Suppressed
            }
            ChangeKind::Structural => {
                self.doc.tree = DocTree::from_markdown(&candidate);
                let at = self
                    .doc
                    .editor
                    .last_edit()
                    .map_or_else(Instant::now, |edit| edit.timestamp);
                if typing {
                    self.history
                        .record_coalesced(candidate.as_str(), at, config.coalesce_window());
                } else {
                    self.history.record(candidate.as_str());
                }
                tracing::debug!(
                    target: "notemark::sync",
                    note = %self.note_id,
                    len = candidate.len(),
                    "structural change"
                );
                self.accepted = candidate;
                self.autosave.note_change(at);
                SyncOutcome::Propagated
            }
        }
    }

    /// Flip a checkbox in the native tree, then bring the buffer along.
    ///
    /// The buffer keeps its own layout: only the checkbox character changes,
    /// and the patched buffer is what gets classified.
    fn toggle_task(&mut self, config: &EditorConfig, item: NodeId) -> SyncOutcome {
        let Some(checked) = self.doc.tree.toggle_task(item) else {
            return SyncOutcome::Unchanged;
        };

        if !self.patch_task_marker(item, checked) {
            // The item's line could not be found in the buffer.
            let markdown = self.doc.tree.to_markdown(&config.encode_options());
            self.history.record(markdown.as_str());
            self.rebuild(&markdown);
            self.autosave.note_change(Instant::now());
            return SyncOutcome::Rebuilt;
        }

        let outcome = self.sync_from_text(config, false);
        if outcome == SyncOutcome::Suppressed {
            tracing::trace!(
                target: "notemark::sync",
                note = %self.note_id,
                item = %item,
                checked,
                "suppressed checkbox toggle"
            );
        }
        outcome
    }

    /// Rewrite the single checkbox character of `item` in the buffer.
    ///
    /// The buffer length is unchanged, so cursor and selection stay put.
    fn patch_task_marker(&mut self, item: NodeId, checked: bool) -> bool {
        let Some(index) = self.doc.tree.item_block_index(item) else {
            return false;
        };
        let spanned = block::decode_spanned(&self.doc.markdown());
        let Some(line) = spanned
            .get(index)
            .filter(|s| matches!(s.block, block::Block::TaskListItem { .. }))
            .map(|s| s.lines.start)
        else {
            return false;
        };

        // `- [` precedes the marker character.
        let offset = self.doc.editor.buffer().line_start(line) + 3;
        if !matches!(self.doc.editor.char_at(offset), Some(' ' | 'x' | 'X')) {
            return false;
        }

        let cursor = self.doc.editor.cursor();
        let selection = self.doc.editor.selection();
        let marker = if checked { "x" } else { " " };
        self.doc.editor.replace(offset..offset + 1, marker);
        self.doc.editor.set_cursor(cursor);
        self.doc.editor.set_selection(selection);
        true
    }

    /// Replace the document wholesale. The cursor is clamped, not kept.
    fn rebuild(&mut self, markdown: &str) {
        self.doc.editor.reset_contents(markdown);
        self.doc.tree = DocTree::from_markdown(markdown);
        self.accepted = markdown.to_string();
        self.rebuilds += 1;
        tracing::debug!(
            target: "notemark::session",
            note = %self.note_id,
            rebuilds = self.rebuilds,
            "rebuilt document"
        );
    }

    fn restore(&mut self, markdown: Option<String>) -> SyncOutcome {
        match markdown {
            Some(markdown) if markdown != self.doc.markdown() => {
                self.rebuild(&markdown);
                self.autosave.note_change(Instant::now());
                SyncOutcome::Rebuilt
            }
            _ => SyncOutcome::Unchanged,
        }
    }
}

/// The adapter state machine.
pub enum SessionState {
    Uninitialized,
    Bound(Box<Binding>),
}

/// One editing session. Holds at most one bound note at a time.
pub struct Session {
    state: SessionState,
    config: EditorConfig,
    next_token: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Session {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            state: SessionState::Uninitialized,
            config,
            next_token: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn binding(&self) -> Option<&Binding> {
        match &self.state {
            SessionState::Bound(binding) => Some(&**binding),
            SessionState::Uninitialized => None,
        }
    }

    fn binding_mut(&mut self) -> Option<&mut Binding> {
        match &mut self.state {
            SessionState::Bound(binding) => Some(&mut **binding),
            SessionState::Uninitialized => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding().is_some()
    }

    pub fn token(&self) -> Option<BindingToken> {
        self.binding().map(Binding::token)
    }

    // === Lifecycle ===

    /// Bind a note, replacing any note that is currently open.
    pub fn open(&mut self, note_id: &str, markdown: &str) -> BindingToken {
        if self.is_bound() {
            self.close();
        }

        let token = BindingToken(self.next_token);
        self.next_token += 1;

        self.state = SessionState::Bound(Box::new(Binding {
            token,
            note_id: SmolStr::new(note_id),
            doc: EditableDocument::new(markdown),
            accepted: markdown.to_string(),
            saved: markdown.to_string(),
            history: History::with_initial(self.config.history_capacity, markdown),
            autosave: SaveDebouncer::new(self.config.autosave_debounce()),
            rebuilds: 0,
        }));
        tracing::debug!(target: "notemark::session", note = note_id, token = token.0, "bound note");
        token
    }

    /// Load a note from storage and bind it.
    pub fn open_from(
        &mut self,
        store: &impl NoteStore,
        note_id: &str,
    ) -> Result<BindingToken, NoteError> {
        let markdown = store.load_markdown(note_id)?;
        Ok(self.open(note_id, &markdown))
    }

    /// Unbind the current note, returning its token.
    pub fn close(&mut self) -> Option<BindingToken> {
        let state = std::mem::replace(&mut self.state, SessionState::Uninitialized);
        match state {
            SessionState::Bound(binding) => {
                tracing::debug!(
                    target: "notemark::session",
                    note = %binding.note_id,
                    token = binding.token.0,
                    "closed note"
                );
                Some(binding.token)
            }
            SessionState::Uninitialized => None,
        }
    }

    // === Native mutations ===

    /// Run an editor command against the open note.
    ///
    /// A no-op returning [`SyncOutcome::NoBinding`] when no note is open.
    pub fn execute(&mut self, action: &EditorAction) -> SyncOutcome {
        match action {
            EditorAction::Undo => return self.undo(),
            EditorAction::Redo => return self.redo(),
            _ => {}
        }

        let config = &self.config;
        let SessionState::Bound(binding) = &mut self.state else {
            tracing::trace!(target: "notemark::session", ?action, "no binding, ignoring");
            return SyncOutcome::NoBinding;
        };

        if !execute_action(&mut binding.doc.editor, action) || action.is_navigation() {
            return SyncOutcome::Unchanged;
        }
        binding.sync_from_text(config, action.is_typing())
    }

    /// Type text over the current selection.
    pub fn type_text(&mut self, text: &str) -> SyncOutcome {
        let Some(range) = self.selection_range() else {
            return SyncOutcome::NoBinding;
        };
        self.execute(&EditorAction::Insert {
            text: text.to_string(),
            range,
        })
    }

    /// Toggle a task item's checkbox from the native tree.
    pub fn toggle_task(&mut self, item: NodeId) -> SyncOutcome {
        let config = &self.config;
        let SessionState::Bound(binding) = &mut self.state else {
            return SyncOutcome::NoBinding;
        };
        binding.toggle_task(config, item)
    }

    /// Embed a dropped image at the cursor.
    pub fn insert_image(&mut self, name: &str, uri: &str) -> SyncOutcome {
        self.execute(&EditorAction::InsertImage {
            alt: name.to_string(),
            src: uri.to_string(),
        })
    }

    /// Paste text at the selection.
    ///
    /// Plain text is typed in place. Markdown is spliced in and the
    /// document rebuilt, like any other external update.
    pub fn paste(&mut self, text: &str) -> SyncOutcome {
        if collab::classify_paste(text) == PasteKind::PlainText {
            return self.type_text(text);
        }
        let Some(binding) = self.binding_mut() else {
            return SyncOutcome::NoBinding;
        };

        let editor = &binding.doc.editor;
        let sel = editor.selection_or_cursor();
        let mut markdown = String::new();
        markdown.push_str(&slice_or_empty(editor, 0..sel.start()));
        markdown.push_str(text);
        markdown.push_str(&slice_or_empty(editor, sel.end()..editor.len_chars()));
        let caret = sel.start() + text.chars().count();

        binding.history.record(markdown.as_str());
        binding.rebuild(&markdown);
        binding.doc.editor.set_cursor_offset(caret);
        binding.autosave.note_change(Instant::now());
        SyncOutcome::Rebuilt
    }

    // === External updates ===

    /// Apply markdown produced elsewhere for the binding `token`.
    ///
    /// Late results for a note that has since been closed or swapped are
    /// dropped.
    pub fn apply_external(&mut self, token: BindingToken, markdown: &str) -> SyncOutcome {
        let Some(binding) = self.binding_mut().filter(|b| b.token == token) else {
            tracing::warn!(
                target: "notemark::session",
                token = token.0,
                "discarding update for stale binding"
            );
            return SyncOutcome::Discarded;
        };
        if binding.doc.markdown() == markdown {
            return SyncOutcome::Unchanged;
        }
        binding.history.record(markdown);
        binding.rebuild(markdown);
        binding.autosave.note_change(Instant::now());
        SyncOutcome::Rebuilt
    }

    /// Replace the open note's content programmatically.
    pub fn set_content(&mut self, markdown: &str) -> SyncOutcome {
        match self.token() {
            Some(token) => self.apply_external(token, markdown),
            None => SyncOutcome::NoBinding,
        }
    }

    pub fn undo(&mut self) -> SyncOutcome {
        let Some(binding) = self.binding_mut() else {
            return SyncOutcome::NoBinding;
        };
        if !binding.history.can_undo() {
            return SyncOutcome::Unchanged;
        }
        let markdown = binding.history.undo().map(str::to_string);
        tracing::trace!(target: "notemark::history", index = binding.history.index(), "undo");
        binding.restore(markdown)
    }

    pub fn redo(&mut self) -> SyncOutcome {
        let Some(binding) = self.binding_mut() else {
            return SyncOutcome::NoBinding;
        };
        if !binding.history.can_redo() {
            return SyncOutcome::Unchanged;
        }
        let markdown = binding.history.redo().map(str::to_string);
        tracing::trace!(target: "notemark::history", index = binding.history.index(), "redo");
        binding.restore(markdown)
    }

    // === Accessors ===

    /// The live markdown of the open note (getMarkdown).
    pub fn get_markdown(&self) -> Option<String> {
        self.binding().map(|b| b.doc.markdown())
    }

    pub fn accepted_markdown(&self) -> Option<&str> {
        self.binding().map(|b| b.accepted.as_str())
    }

    pub fn document(&self) -> Option<&EditableDocument> {
        self.binding().map(Binding::document)
    }

    pub fn tree(&self) -> Option<&DocTree> {
        self.document().map(EditableDocument::tree)
    }

    pub fn editor(&self) -> Option<&PlainEditor<EditorRope>> {
        self.document().map(EditableDocument::editor)
    }

    pub fn history(&self) -> Option<&History> {
        self.binding().map(Binding::history)
    }

    /// How many times the open document was replaced wholesale.
    pub fn rebuild_count(&self) -> u64 {
        self.binding().map_or(0, |b| b.rebuilds)
    }

    fn selection_range(&self) -> Option<Range> {
        let sel = self.editor()?.selection_or_cursor();
        Some(Range::new(sel.start(), sel.end()))
    }

    /// Current selection, collapsed at the cursor when nothing is selected.
    pub fn selection(&self) -> Option<Selection> {
        self.editor().map(|e| e.selection_or_cursor())
    }

    // === Persistence ===

    /// The markdown to save if the autosave delay has elapsed.
    ///
    /// Only propagated changes schedule an autosave. A suppressed checkbox
    /// toggle never does; check [`Session::has_unsaved_changes`] and call
    /// [`Session::save_to`] before closing the note.
    pub fn take_autosave(&mut self, now: Instant) -> Option<(SmolStr, String)> {
        let binding = self.binding_mut()?;
        if !binding.autosave.take_due(now) {
            return None;
        }
        let markdown = binding.doc.markdown();
        binding.saved.clone_from(&markdown);
        Some((binding.note_id.clone(), markdown))
    }

    /// Whether the live markdown differs from what storage last saw.
    pub fn has_unsaved_changes(&self) -> bool {
        self.binding().is_some_and(|b| b.doc.markdown() != b.saved)
    }

    /// Save the live markdown immediately.
    pub fn save_to(&mut self, store: &mut impl NoteStore) -> Result<bool, NoteError> {
        let Some(binding) = self.binding_mut() else {
            return Ok(false);
        };
        let markdown = binding.doc.markdown();
        store.save_markdown(&binding.note_id, &markdown)?;
        binding.saved = markdown;
        binding.autosave.cancel();
        tracing::debug!(target: "notemark::session", note = %binding.note_id, "saved note");
        Ok(true)
    }
}

fn slice_or_empty(editor: &PlainEditor<EditorRope>, range: std::ops::Range<usize>) -> String {
    if range.is_empty() {
        return String::new();
    }
    editor.slice(range).map(|s| s.to_string()).unwrap_or_default()
}
