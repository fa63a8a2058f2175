//! notemark-core: markdown / block-model conversion and editing for notes.
//!
//! This crate provides:
//! - `inline` and `block` - the markdown codecs
//! - `DocTree` - the native block tree of an open note
//! - `EditorDocument` and `execute_action` - the selection-aware mutation engine
//! - `Session` - the adapter that binds one note and suppresses cosmetic changes
//! - `History` - bounded snapshot undo/redo

pub mod actions;
pub mod block;
pub mod collab;
pub mod config;
pub mod document;
pub mod error;
pub mod execute;
pub mod history;
pub mod inline;
pub mod session;
pub mod sync;
pub mod text;
pub mod text_helpers;
pub mod tree;
pub mod types;

pub use actions::{EditorAction, HeadingLevel, MarkKind, Range};
pub use block::{Block, EncodeOptions, ListKind, SpannedBlock};
pub use collab::{
    LinkResolution, MemoryNoteStore, NoteStore, NoteTitles, PasteKind, SaveDebouncer, TitleIndex,
    classify_paste, image_markdown, parse_tags, resolve_link, resolve_wikilinks,
};
pub use config::EditorConfig;
pub use document::{EditorDocument, PlainEditor};
pub use error::{ConfigError, NoteError};
pub use execute::{execute_action, wrap_or_unwrap};
pub use history::{History, HistoryEntry};
pub use inline::{InlineRun, InlineSpan};
pub use session::{
    Binding, BindingToken, EditableDocument, Session, SessionState, SyncOutcome,
};
pub use smol_str::SmolStr;
pub use sync::ChangeKind;
pub use text::{EditorRope, TextBuffer};
pub use tree::{DocNode, DocTree, ListItem, NodeId, NodeKind};
pub use types::{
    Affinity, BLOCK_SYNTAX_ZONE, CompositionState, CursorState, EditInfo, Selection,
};
