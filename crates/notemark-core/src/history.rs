//! Bounded snapshot history.
//!
//! Unlike an operation log, every entry is a complete markdown snapshot.
//! Undo and redo move an index over the snapshots; the session rebuilds the
//! document from whatever the index lands on.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

/// Default number of snapshots kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// A markdown snapshot plus its insertion sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub markdown: String,
    /// Monotonic across the life of the stack, never reused after eviction.
    pub seq: u64,
}

/// Linear undo/redo history over markdown snapshots.
///
/// Invariants: `entries.len() <= capacity`, and when non-empty the index
/// always points at a valid entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    index: usize,
    capacity: usize,
    next_seq: u64,
    /// Time of the previous coalescable record, if the previous record was one.
    last_coalesced: Option<Instant>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    /// Create an empty history. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            capacity: capacity.max(1),
            next_seq: 0,
            last_coalesced: None,
        }
    }

    /// Create a history seeded with the initial markdown of a note.
    pub fn with_initial(capacity: usize, markdown: impl Into<String>) -> Self {
        let mut history = Self::new(capacity);
        history.record(markdown);
        history
    }

    /// Record a snapshot. Returns false if it equals the current entry.
    ///
    /// Any redo branch is discarded. When over capacity the oldest entry is
    /// evicted and the index shifts down with it.
    pub fn record(&mut self, markdown: impl Into<String>) -> bool {
        self.last_coalesced = None;
        self.push(markdown.into())
    }

    /// Record a snapshot produced by ordinary typing.
    ///
    /// If the previous record was also coalescable, is still the newest
    /// entry, and happened within `window`, the current entry is replaced
    /// instead of pushing a new one. A zero window never coalesces.
    pub fn record_coalesced(
        &mut self,
        markdown: impl Into<String>,
        at: Instant,
        window: Duration,
    ) -> bool {
        let markdown = markdown.into();
        if self.current() == Some(markdown.as_str()) {
            return false;
        }

        let within_window = self
            .last_coalesced
            .is_some_and(|prev| at.saturating_duration_since(prev) <= window);
        let at_tail = self.index + 1 == self.entries.len();

        if !window.is_zero() && within_window && at_tail && self.index > 0 {
            if let Some(entry) = self.entries.get_mut(self.index) {
                tracing::trace!(target: "notemark::history", seq = entry.seq, "coalesced snapshot");
                entry.markdown = markdown;
            }
            self.last_coalesced = Some(at);
            return true;
        }

        let pushed = self.push(markdown);
        self.last_coalesced = Some(at);
        pushed
    }

    fn push(&mut self, markdown: String) -> bool {
        if self.current() == Some(markdown.as_str()) {
            return false;
        }

        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(HistoryEntry { markdown, seq });
        self.index = self.entries.len() - 1;

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.index = self.index.saturating_sub(1);
        }

        tracing::trace!(
            target: "notemark::history",
            seq,
            len = self.entries.len(),
            "recorded snapshot"
        );
        true
    }

    /// Step back one snapshot.
    ///
    /// At the oldest entry this is a no-op that returns the current
    /// markdown. Returns `None` only when nothing was ever recorded.
    pub fn undo(&mut self) -> Option<&str> {
        self.last_coalesced = None;
        if self.index > 0 {
            self.index -= 1;
        }
        self.current()
    }

    /// Step forward one snapshot; a no-op at the newest entry.
    pub fn redo(&mut self) -> Option<&str> {
        self.last_coalesced = None;
        if self.index + 1 < self.entries.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// The markdown at the current index.
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.index).map(|e| e.markdown.as_str())
    }

    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Drop every snapshot. Sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
        self.last_coalesced = None;
    }

    /// Drop every snapshot and start over from `markdown`.
    pub fn reset(&mut self, markdown: impl Into<String>) {
        self.clear();
        self.record(markdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(history: &History) -> Vec<&str> {
        history.entries().map(|e| e.markdown.as_str()).collect()
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut history = History::default();
        assert!(history.record("x"));
        let (len, index) = (history.len(), history.index());
        assert!(!history.record("x"));
        assert_eq!(history.len(), len);
        assert_eq!(history.index(), index);
    }

    #[test]
    fn test_undo_returns_previous() {
        let mut history = History::default();
        history.record("A");
        history.record("B");
        assert_eq!(history.undo(), Some("A"));
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some("B"));
    }

    #[test]
    fn test_new_record_discards_redo_branch() {
        let mut history = History::default();
        history.record("A");
        history.record("B");
        history.record("C");
        history.undo();
        history.undo();
        history.record("D");

        assert_eq!(contents(&history), vec!["A", "D"]);
        assert_eq!(history.index(), 1);
        assert!(!history.can_redo());
        assert_eq!(history.redo(), Some("D"));
    }

    #[test]
    fn test_exhaustion_is_noop() {
        let mut history = History::default();
        assert_eq!(history.undo(), None);

        history.record("only");
        assert_eq!(history.undo(), Some("only"));
        assert_eq!(history.redo(), Some("only"));
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(3);
        for s in ["a", "b", "c", "d", "e"] {
            history.record(s);
        }
        assert_eq!(contents(&history), vec!["c", "d", "e"]);
        assert_eq!(history.index(), 2);
        assert_eq!(history.current_entry().map(|e| e.seq), Some(4));
    }

    #[test]
    fn test_default_capacity_is_fifty() {
        let mut history = History::default();
        for i in 0..75 {
            history.record(i.to_string());
        }
        assert_eq!(history.len(), DEFAULT_CAPACITY);
        assert_eq!(history.index(), DEFAULT_CAPACITY - 1);
        assert_eq!(history.current(), Some("74"));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = History::new(0);
        history.record("a");
        history.record("b");
        assert_eq!(contents(&history), vec!["b"]);
    }

    #[test]
    fn test_coalescing_within_window() {
        let window = Duration::from_millis(500);
        let start = Instant::now();
        let mut history = History::with_initial(10, "");

        history.record_coalesced("h", start, window);
        history.record_coalesced("he", start + Duration::from_millis(100), window);
        history.record_coalesced("hel", start + Duration::from_millis(200), window);
        assert_eq!(contents(&history), vec!["", "hel"]);

        // Past the window a new entry starts.
        history.record_coalesced("hell", start + Duration::from_secs(2), window);
        assert_eq!(contents(&history), vec!["", "hel", "hell"]);
    }

    #[test]
    fn test_zero_window_never_coalesces() {
        let now = Instant::now();
        let mut history = History::with_initial(10, "");
        history.record_coalesced("a", now, Duration::ZERO);
        history.record_coalesced("ab", now, Duration::ZERO);
        assert_eq!(contents(&history), vec!["", "a", "ab"]);
    }

    #[test]
    fn test_plain_record_breaks_coalescing() {
        let window = Duration::from_secs(1);
        let now = Instant::now();
        let mut history = History::with_initial(10, "");
        history.record_coalesced("a", now, window);
        history.record("# a");
        history.record_coalesced("# ab", now, window);
        assert_eq!(contents(&history), vec!["", "a", "# a", "# ab"]);
    }

    #[test]
    fn test_reset() {
        let mut history = History::default();
        history.record("a");
        history.record("b");
        history.reset("fresh");
        assert_eq!(contents(&history), vec!["fresh"]);
        assert!(!history.can_undo());
    }
}
