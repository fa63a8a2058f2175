//! Contracts with the collaborators around the editing core.
//!
//! Storage, link resolution, AI results, paste and image drops all meet the
//! core as plain strings. This module holds the traits and the small
//! parsers at those seams.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use smol_str::SmolStr;
use web_time::Instant;

use crate::block::{self, Block};
use crate::error::NoteError;
use crate::inline::{self, InlineRun, InlineSpan};

// === Storage ===

/// Persists notes as markdown strings keyed by note id.
pub trait NoteStore {
    fn load_markdown(&self, note_id: &str) -> Result<String, NoteError>;

    fn save_markdown(&mut self, note_id: &str, markdown: &str) -> Result<(), NoteError>;

    /// Ids of every stored note, sorted.
    fn note_ids(&self) -> Result<Vec<SmolStr>, NoteError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    notes: HashMap<SmolStr, String>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, note_id: &str, markdown: impl Into<String>) -> Self {
        self.notes.insert(SmolStr::new(note_id), markdown.into());
        self
    }
}

impl NoteStore for MemoryNoteStore {
    fn load_markdown(&self, note_id: &str) -> Result<String, NoteError> {
        self.notes
            .get(note_id)
            .cloned()
            .ok_or_else(|| NoteError::NoteNotFound(note_id.to_string()))
    }

    fn save_markdown(&mut self, note_id: &str, markdown: &str) -> Result<(), NoteError> {
        self.notes.insert(SmolStr::new(note_id), markdown.to_string());
        Ok(())
    }

    fn note_ids(&self) -> Result<Vec<SmolStr>, NoteError> {
        let mut ids: Vec<_> = self.notes.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

// === Link resolution ===

/// Answers whether a wikilink target names an existing note.
pub trait TitleIndex {
    /// The canonical title the target resolves to, if any.
    fn resolve(&self, target: &str) -> Option<&str>;
}

/// Normalized lookup key: trimmed and lowercased, with any `#fragment` dropped.
fn title_key(target: &str) -> SmolStr {
    let (target, _fragment) = target.split_once('#').unwrap_or((target, ""));
    SmolStr::new(target.trim().to_lowercase())
}

/// In-memory set of note titles. Matching is case-insensitive and ignores
/// surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteTitles {
    by_key: HashMap<SmolStr, String>,
}

impl NoteTitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: &str) {
        self.by_key.insert(title_key(title), title.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for NoteTitles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut titles = Self::new();
        for title in iter {
            titles.insert(title.as_ref());
        }
        titles
    }
}

impl TitleIndex for NoteTitles {
    fn resolve(&self, target: &str) -> Option<&str> {
        self.by_key.get(&title_key(target)).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
    Found { title: String },
    NotFound,
}

impl LinkResolution {
    pub fn is_found(&self) -> bool {
        matches!(self, LinkResolution::Found { .. })
    }
}

/// Resolve one wikilink target. Never fails; unknown titles are `NotFound`.
pub fn resolve_link(index: &impl TitleIndex, target: &str) -> LinkResolution {
    match index.resolve(target) {
        Some(title) => LinkResolution::Found {
            title: title.to_string(),
        },
        None => LinkResolution::NotFound,
    }
}

/// Resolve every wikilink in `blocks`, in document order.
pub fn resolve_wikilinks<'a>(
    index: &impl TitleIndex,
    blocks: &'a [Block],
) -> Vec<(&'a str, LinkResolution)> {
    block::wikilinks(blocks)
        .into_iter()
        .map(|target| (target, resolve_link(index, target)))
        .collect()
}

// === AI enhancement ===

/// Parse a comma-separated tag list: trimmed, lowercased, empties dropped,
/// first occurrence kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

// === Paste ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteKind {
    /// Inserted verbatim at the cursor.
    PlainText,
    /// Treated as an external markdown update.
    Markdown,
}

/// Guess whether pasted text is markdown.
pub fn classify_paste(text: &str) -> PasteKind {
    static RE_MARKDOWN: OnceLock<Regex> = OnceLock::new();
    let re = RE_MARKDOWN.get_or_init(|| {
        Regex::new(
            r"(?m)^(#{1,6} |[-*+] |\d+\. |> |```)|\*\*[^*\n]+\*\*|__[^_\n]+__|~~[^~\n]+~~|`[^`\n]+`|\[\[[^\]\n]+\]\]|!?\[[^\]\n]*\]\([^)\n]*\)",
        )
        .expect("static regex")
    });
    if re.is_match(text) {
        PasteKind::Markdown
    } else {
        PasteKind::PlainText
    }
}

// === Images ===

/// Markdown for an embedded image. The uri is kept byte-for-byte.
pub fn image_markdown(name: &str, uri: &str) -> String {
    inline::encode(&InlineRun::from_spans([InlineSpan::Image {
        alt: name.to_string(),
        src: uri.to_string(),
    }]))
}

// === Autosave ===

/// Default quiet period before saving.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Timer-free debounce bookkeeping for the storage boundary.
///
/// The host calls [`note_change`](Self::note_change) on every propagated
/// change and polls [`take_due`](Self::take_due) from its own timer.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    delay: Duration,
    last_change: Option<Instant>,
}

impl Default for SaveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DEBOUNCE)
    }
}

impl SaveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_change: None,
        }
    }

    pub fn note_change(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// Whether a pending change has been quiet for the full delay.
    pub fn due(&self, now: Instant) -> bool {
        self.last_change
            .is_some_and(|at| now.saturating_duration_since(at) >= self.delay)
    }

    /// Like [`due`](Self::due), but clears the pending change when it fires.
    pub fn take_due(&mut self, now: Instant) -> bool {
        let due = self.due(now);
        if due {
            self.last_change = None;
        }
        due
    }

    /// Drop a pending change, e.g. after an explicit save.
    pub fn cancel(&mut self) {
        self.last_change = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryNoteStore::new().with_note("a", "# A\n");
        assert_eq!(store.load_markdown("a").unwrap(), "# A\n");
        assert!(matches!(
            store.load_markdown("b"),
            Err(NoteError::NoteNotFound(_))
        ));
        store.save_markdown("b", "B\n").unwrap();
        assert_eq!(store.note_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_title_matching_ignores_case_and_whitespace() {
        let titles: NoteTitles = ["Meeting Notes", "Groceries"].into_iter().collect();
        assert_eq!(titles.resolve("meeting notes"), Some("Meeting Notes"));
        assert_eq!(titles.resolve("  GROCERIES "), Some("Groceries"));
        assert_eq!(titles.resolve("Groceries#dairy"), Some("Groceries"));
        assert_eq!(titles.resolve("Nope"), None);
    }

    #[test]
    fn test_resolve_wikilinks() {
        let titles: NoteTitles = ["Inbox"].into_iter().collect();
        let blocks = block::decode("See [[inbox]] and [[Meeting Notes]].\n");
        let resolved = resolve_wikilinks(&titles, &blocks);
        assert_eq!(
            resolved,
            vec![
                (
                    "inbox",
                    LinkResolution::Found {
                        title: "Inbox".into()
                    }
                ),
                ("Meeting Notes", LinkResolution::NotFound),
            ]
        );
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(" Rust, notes ,, RUST,Ideas "),
            vec!["rust", "notes", "ideas"]
        );
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_classify_paste() {
        assert_eq!(classify_paste("just some words"), PasteKind::PlainText);
        assert_eq!(classify_paste("2 * 3 * 4"), PasteKind::PlainText);
        assert_eq!(classify_paste("# Heading"), PasteKind::Markdown);
        assert_eq!(classify_paste("text\n- item"), PasteKind::Markdown);
        assert_eq!(classify_paste("a **b** c"), PasteKind::Markdown);
        assert_eq!(classify_paste("see [docs](http://x)"), PasteKind::Markdown);
    }

    #[test]
    fn test_image_markdown_keeps_uri() {
        let uri = "data:image/png;base64,AAA(BBB)CCC";
        assert_eq!(image_markdown("x", uri), format!("![x]({uri})"));
    }

    #[test]
    fn test_save_debouncer() {
        let start = Instant::now();
        let mut debouncer = SaveDebouncer::default();
        assert!(!debouncer.due(start));

        debouncer.note_change(start);
        debouncer.note_change(start + Duration::from_millis(300));
        assert!(!debouncer.take_due(start + Duration::from_millis(600)));
        assert!(debouncer.take_due(start + Duration::from_millis(800)));
        assert!(!debouncer.is_pending());
    }
}
