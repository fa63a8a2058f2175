//! Structural-vs-cosmetic change detection.
//!
//! A change is cosmetic when both sides carry task markers and the decoded
//! block sequences differ only in task `checked` flags. The live document
//! already shows such a change, so it must not trigger a rebuild.

use crate::block::{self, Block};

/// Classification of a candidate markdown against the accepted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// Byte-identical.
    Unchanged,
    /// Only task checkboxes changed; `toggled` holds their flat block indices.
    Cosmetic { toggled: Vec<usize> },
    /// Anything else.
    Structural,
}

impl ChangeKind {
    pub fn is_structural(&self) -> bool {
        matches!(self, ChangeKind::Structural)
    }

    pub fn is_cosmetic(&self) -> bool {
        matches!(self, ChangeKind::Cosmetic { .. })
    }
}

/// Compare two decoded block sequences.
pub fn classify_blocks(prev: &[Block], next: &[Block]) -> ChangeKind {
    if prev == next {
        return ChangeKind::Unchanged;
    }
    if prev.len() != next.len() {
        return ChangeKind::Structural;
    }

    let mut toggled = Vec::new();
    for (i, (a, b)) in prev.iter().zip(next).enumerate() {
        if a == b {
            continue;
        }
        match (a, b) {
            (
                Block::TaskListItem {
                    checked: was,
                    content: before,
                },
                Block::TaskListItem {
                    checked: now,
                    content: after,
                },
            ) if before == after && was != now => toggled.push(i),
            _ => return ChangeKind::Structural,
        }
    }
    ChangeKind::Cosmetic { toggled }
}

/// Compare the accepted markdown with a candidate serialization.
///
/// Strings that differ but decode to the same blocks are structural: the
/// accepted form still has to move to the candidate.
pub fn classify(prev: &str, next: &str) -> ChangeKind {
    if prev == next {
        return ChangeKind::Unchanged;
    }
    if !block::has_task_markers(prev) || !block::has_task_markers(next) {
        tracing::trace!(target: "notemark::sync", "no task markers on one side");
        return ChangeKind::Structural;
    }

    let kind = match classify_blocks(&block::decode(prev), &block::decode(next)) {
        ChangeKind::Unchanged => ChangeKind::Structural,
        kind => kind,
    };
    tracing::trace!(target: "notemark::sync", ?kind, "classified change");
    kind
}
