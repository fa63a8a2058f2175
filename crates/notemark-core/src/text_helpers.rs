//! Text navigation and line analysis helpers.
//!
//! These work with the `EditorDocument` trait: line boundaries, word
//! boundaries, and recognizing the block prefix (`# `, `- `, `- [ ] `,
//! `1. `, `> `) at the start of a line.

use crate::block;
use crate::document::EditorDocument;
use crate::text::TextBuffer;

/// Find start of line containing offset.
pub fn find_line_start<D: EditorDocument>(doc: &D, offset: usize) -> usize {
    let buffer = doc.buffer();
    buffer.line_start(buffer.line_of(offset))
}

/// Find end of line containing offset (position of newline or end of doc).
pub fn find_line_end<D: EditorDocument>(doc: &D, offset: usize) -> usize {
    let len = doc.len_chars();
    let mut pos = offset.min(len);
    while pos < len {
        if let Some('\n') = doc.char_at(pos) {
            return pos;
        }
        pos += 1;
    }
    len
}

/// The full text of the line containing offset, without its newline.
pub fn line_text<D: EditorDocument>(doc: &D, offset: usize) -> String {
    let start = find_line_start(doc, offset);
    let end = find_line_end(doc, offset);
    doc.slice(start..end).map(|s| s.to_string()).unwrap_or_default()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find word boundary backward from cursor.
pub fn find_word_boundary_backward<D: EditorDocument>(doc: &D, cursor: usize) -> usize {
    let mut pos = cursor;

    // Skip any whitespace/punctuation immediately before cursor.
    while pos > 0 {
        match doc.char_at(pos - 1) {
            Some(c) if is_word_char(c) => break,
            Some(_) => pos -= 1,
            None => break,
        }
    }

    while pos > 0 {
        match doc.char_at(pos - 1) {
            Some(c) if is_word_char(c) => pos -= 1,
            _ => break,
        }
    }

    pos
}

/// The block marker found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePrefix {
    Heading(u8),
    Bullet(char),
    Ordered(u32),
    Task { checked: bool },
    Quote,
}

impl LinePrefix {
    /// Parse the prefix at the start of `line`, with its length in chars.
    ///
    /// Uses the same recognizers as the block codec so a prefix the engine
    /// sees is exactly what re-decoding will see.
    pub fn parse(line: &str) -> Option<(LinePrefix, usize)> {
        let consumed = |rest: &str| line[..line.len() - rest.len()].chars().count();

        if let Some((level, rest)) = block::heading_prefix(line) {
            return Some((LinePrefix::Heading(level), consumed(rest)));
        }
        if let Some((checked, rest)) = block::task_prefix(line) {
            return Some((LinePrefix::Task { checked }, consumed(rest)));
        }
        if let Some(rest) = block::bullet_prefix(line) {
            let marker = line.chars().next().unwrap_or('-');
            return Some((LinePrefix::Bullet(marker), consumed(rest)));
        }
        if let Some((index, rest)) = block::ordered_prefix(line) {
            return Some((LinePrefix::Ordered(index), consumed(rest)));
        }
        if let Some(rest) = block::quote_prefix(line) {
            return Some((LinePrefix::Quote, consumed(rest)));
        }
        None
    }
}

/// Describes what kind of list item the cursor is in, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListContext {
    Unordered { marker: char },
    Ordered { number: u32 },
    Task,
}

impl ListContext {
    /// Prefix for the item that follows this one.
    pub fn continuation(&self) -> String {
        match self {
            ListContext::Unordered { marker } => format!("{} ", marker),
            ListContext::Ordered { number } => format!("{}. ", number + 1),
            ListContext::Task => "- [ ] ".to_string(),
        }
    }
}

/// Detect if cursor is in a list item and return context for continuation.
pub fn detect_list_context<D: EditorDocument>(doc: &D, cursor_offset: usize) -> Option<ListContext> {
    let line = line_text(doc, cursor_offset);
    match LinePrefix::parse(&line)?.0 {
        LinePrefix::Bullet(marker) => Some(ListContext::Unordered { marker }),
        LinePrefix::Ordered(number) => Some(ListContext::Ordered { number }),
        LinePrefix::Task { .. } => Some(ListContext::Task),
        LinePrefix::Heading(_) | LinePrefix::Quote => None,
    }
}

/// Check if the list item at the cursor has nothing after its marker.
pub fn is_list_item_empty<D: EditorDocument>(doc: &D, cursor_offset: usize) -> bool {
    let line = line_text(doc, cursor_offset);
    match LinePrefix::parse(&line) {
        Some((_, prefix_len)) => line.chars().skip(prefix_len).all(char::is_whitespace),
        None => false,
    }
}
