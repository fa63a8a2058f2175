//! Action execution: the selection-aware mutation engine.
//!
//! `execute_action` applies an [`EditorAction`] to any [`EditorDocument`]
//! as a markdown-level patch at the current selection. Line commands act on
//! the whole line containing the cursor, wherever in the line it sits.

use crate::actions::{EditorAction, HeadingLevel, MarkKind, Range};
use crate::document::EditorDocument;
use crate::inline::{self, InlineRun, InlineSpan};
use crate::text_helpers::{
    LinePrefix, detect_list_context, find_line_end, find_line_start, find_word_boundary_backward,
    is_list_item_empty, line_text,
};
use crate::types::{Selection, shift_offset};

/// Execute an editor action on a document.
///
/// Returns true if the action was handled. Undo and redo are not handled
/// here; snapshot history belongs to the session.
pub fn execute_action<D: EditorDocument>(doc: &mut D, action: &EditorAction) -> bool {
    tracing::trace!(target: "notemark::execute", ?action, "execute action");
    match action {
        EditorAction::Insert { text, range } => execute_insert(doc, text, *range),
        EditorAction::InsertParagraph { range } => execute_insert_paragraph(doc, *range),
        EditorAction::DeleteBackward { range } => execute_delete_backward(doc, *range),
        EditorAction::DeleteForward { range } => execute_delete_forward(doc, *range),
        EditorAction::DeleteWordBackward { range } => execute_delete_word_backward(doc, *range),
        EditorAction::Undo | EditorAction::Redo => false,
        EditorAction::ToggleMark(mark) => execute_toggle_mark(doc, *mark),
        EditorAction::InsertLink { url } => execute_insert_link(doc, url),
        EditorAction::InsertImage { alt, src } => execute_insert_image(doc, alt, src),
        EditorAction::WrapOrUnwrap { before, after } => wrap_or_unwrap(doc, before, after),
        EditorAction::SetHeadingLevel(level) => execute_set_heading(doc, *level),
        EditorAction::ToggleBulletList => execute_toggle_bullet(doc),
        EditorAction::ToggleOrderedList => execute_toggle_ordered(doc),
        EditorAction::ToggleTaskList => execute_toggle_task(doc),
        EditorAction::InsertBlockPrefix { prefix } => execute_insert_block_prefix(doc, prefix),
        EditorAction::SelectAll => execute_select_all(doc),
        EditorAction::MoveCursor { offset } => execute_move_cursor(doc, *offset),
        EditorAction::ExtendSelection { offset } => execute_extend_selection(doc, *offset),
    }
}

fn execute_insert<D: EditorDocument>(doc: &mut D, text: &str, range: Range) -> bool {
    let range = range.normalize();
    if range.is_caret() {
        doc.insert(range.start, text);
    } else {
        doc.replace(range.start..range.end, text);
    }
    doc.set_selection(None);
    true
}

fn execute_insert_paragraph<D: EditorDocument>(doc: &mut D, range: Range) -> bool {
    let range = range.normalize();
    let cursor_offset = range.start;

    if !range.is_caret() {
        doc.delete(cursor_offset..range.end);
    }

    if let Some(ctx) = detect_list_context(doc, cursor_offset) {
        let line_start = find_line_start(doc, cursor_offset);
        if is_list_item_empty(doc, cursor_offset) {
            // Empty item - exit list by dropping the marker.
            let line_end = find_line_end(doc, cursor_offset);
            doc.delete(line_start..line_end);
            doc.set_cursor_offset(line_start);
        } else {
            let continuation = format!("\n{}", ctx.continuation());
            doc.insert(cursor_offset, &continuation);
        }
    } else {
        doc.insert(cursor_offset, "\n");
    }

    doc.set_selection(None);
    true
}

fn execute_delete_backward<D: EditorDocument>(doc: &mut D, range: Range) -> bool {
    let range = range.normalize();

    if !range.is_caret() {
        doc.delete(range.start..range.end);
        doc.set_selection(None);
        return true;
    }
    if range.start == 0 {
        return false;
    }

    doc.delete(range.start - 1..range.start);
    doc.set_selection(None);
    true
}

fn execute_delete_forward<D: EditorDocument>(doc: &mut D, range: Range) -> bool {
    let range = range.normalize();

    if !range.is_caret() {
        doc.delete(range.start..range.end);
        doc.set_selection(None);
        return true;
    }
    if range.start >= doc.len_chars() {
        return false;
    }

    doc.delete(range.start..range.start + 1);
    doc.set_selection(None);
    true
}

fn execute_delete_word_backward<D: EditorDocument>(doc: &mut D, range: Range) -> bool {
    let range = range.normalize();

    if !range.is_caret() {
        doc.delete(range.start..range.end);
        doc.set_selection(None);
        return true;
    }

    let word_start = find_word_boundary_backward(doc, range.start);
    if word_start == range.start {
        return false;
    }
    doc.delete(word_start..range.start);
    doc.set_selection(None);
    true
}

fn execute_toggle_mark<D: EditorDocument>(doc: &mut D, mark: MarkKind) -> bool {
    let delim = mark.delimiter();
    wrap_or_unwrap(doc, delim, delim)
}

/// Wrap the selection in `before…after`, or unwrap it if the characters
/// immediately outside the selection already are exactly that pair.
///
/// A wrap grows the selection to include the delimiters; an unwrap shrinks
/// it. With a collapsed selection a wrap inserts an empty pair and leaves
/// the cursor between the delimiters.
pub fn wrap_or_unwrap<D: EditorDocument>(doc: &mut D, before: &str, after: &str) -> bool {
    if before.is_empty() && after.is_empty() {
        return false;
    }

    let sel = doc.selection_or_cursor();
    let (start, end) = (sel.start(), sel.end());
    let before_len = before.chars().count();
    let after_len = after.chars().count();

    if is_wrapped(doc, start, end, before, after) {
        // Remove the closing delimiter first so `start` stays valid.
        doc.delete(end..end + after_len);
        doc.delete(start - before_len..start);
        let (new_start, new_end) = (start - before_len, end - before_len);
        set_range(doc, new_start, new_end);
        return true;
    }

    doc.insert(end, after);
    doc.insert(start, before);
    if sel.is_collapsed() {
        doc.set_cursor_offset(start + before_len);
        doc.set_selection(None);
    } else {
        set_range(doc, start, end + before_len + after_len);
    }
    true
}

fn set_range<D: EditorDocument>(doc: &mut D, start: usize, end: usize) {
    doc.set_cursor_offset(end);
    if start == end {
        doc.set_selection(None);
    } else {
        doc.set_selection(Some(Selection::new(start, end)));
    }
}

fn is_wrapped<D: EditorDocument>(
    doc: &D,
    start: usize,
    end: usize,
    before: &str,
    after: &str,
) -> bool {
    let before_len = before.chars().count();
    let after_len = after.chars().count();
    if start < before_len {
        return false;
    }

    let outside_before = doc.slice(start - before_len..start);
    let outside_after = doc.slice(end..end + after_len);
    if outside_before.as_deref() != Some(before) || outside_after.as_deref() != Some(after) {
        return false;
    }

    match repeated_char(before) {
        Some(c) if before == after => {
            let left = run_backward(doc, start, c);
            let right = run_forward(doc, end, c);
            owns_delimiter(c, before_len, left, right)
        }
        _ => true,
    }
}

/// Decide whether a run of `c` around the selection contains *this*
/// delimiter rather than only an enclosing one.
///
/// For `*`, a single-star italic is present only when the runs on both
/// sides are odd (`*x*`, `***x***`); an even run (`**x**`) is bold.
fn owns_delimiter(c: char, delim_len: usize, left: usize, right: usize) -> bool {
    if c == '*' && delim_len == 1 {
        return left % 2 == 1 && right % 2 == 1;
    }
    left >= delim_len && right >= delim_len
}

fn repeated_char(s: &str) -> Option<char> {
    let first = s.chars().next()?;
    s.chars().all(|c| c == first).then_some(first)
}

fn run_backward<D: EditorDocument>(doc: &D, from: usize, c: char) -> usize {
    let mut pos = from;
    while pos > 0 && doc.char_at(pos - 1) == Some(c) {
        pos -= 1;
    }
    from - pos
}

fn run_forward<D: EditorDocument>(doc: &D, from: usize, c: char) -> usize {
    let len = doc.len_chars();
    let mut pos = from;
    while pos < len && doc.char_at(pos) == Some(c) {
        pos += 1;
    }
    pos - from
}

fn execute_insert_link<D: EditorDocument>(doc: &mut D, url: &str) -> bool {
    let sel = doc.selection_or_cursor();
    let (start, end) = (sel.start(), sel.end());

    if sel.is_collapsed() {
        doc.insert(start, &format!("[]({url})"));
        doc.set_cursor_offset(start + 1);
    } else {
        let text = doc.slice(start..end).map(|s| s.to_string()).unwrap_or_default();
        let span = InlineSpan::ExternalLink {
            text: inline::decode(&text),
            url: url.to_string(),
        };
        doc.replace(start..end, &inline::encode(&InlineRun::from_spans([span])));
    }
    doc.set_selection(None);
    true
}

/// Embed an image on its own line, keeping the source byte-for-byte.
fn execute_insert_image<D: EditorDocument>(doc: &mut D, alt: &str, src: &str) -> bool {
    let sel = doc.selection_or_cursor();
    let (start, end) = (sel.start(), sel.end());

    let span = InlineSpan::Image {
        alt: alt.to_string(),
        src: src.to_string(),
    };
    let image = inline::encode(&InlineRun::from_spans([span]));

    let leading = if start == find_line_start(doc, start) { "" } else { "\n" };
    let trailing = if end == find_line_end(doc, end) { "" } else { "\n" };
    let text = format!("{leading}{image}{trailing}");

    doc.replace(start..end, &text);
    let after_image = start + leading.chars().count() + image.chars().count();
    doc.set_cursor_offset(after_image);
    doc.set_selection(None);
    true
}

fn execute_set_heading<D: EditorDocument>(doc: &mut D, level: HeadingLevel) -> bool {
    let current = current_prefix(doc);
    let new_prefix = match current {
        Some(LinePrefix::Heading(l)) if l == level.get() => None,
        _ => Some(level.prefix()),
    };
    replace_line_prefix(doc, new_prefix.as_deref())
}

fn execute_toggle_bullet<D: EditorDocument>(doc: &mut D) -> bool {
    match current_prefix(doc) {
        Some(LinePrefix::Bullet(_)) => replace_line_prefix(doc, None),
        _ => replace_line_prefix(doc, Some("- ")),
    }
}

fn execute_toggle_ordered<D: EditorDocument>(doc: &mut D) -> bool {
    if let Some(LinePrefix::Ordered(_)) = current_prefix(doc) {
        return replace_line_prefix(doc, None);
    }
    let number = previous_ordered_index(doc).map_or(1, |n| n + 1);
    replace_line_prefix(doc, Some(&format!("{number}. ")))
}

fn execute_toggle_task<D: EditorDocument>(doc: &mut D) -> bool {
    match current_prefix(doc) {
        Some(LinePrefix::Task { .. }) => replace_line_prefix(doc, None),
        _ => replace_line_prefix(doc, Some("- [ ] ")),
    }
}

/// Toggle `prefix` on the cursor's line.
///
/// An identical prefix is removed. A prefix that is itself block syntax
/// replaces whatever block prefix the line has; anything else is inserted
/// in front of the line as-is.
fn execute_insert_block_prefix<D: EditorDocument>(doc: &mut D, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let offset = doc.cursor_offset();
    let line = line_text(doc, offset);

    if line.starts_with(prefix) {
        let len = prefix.chars().count();
        return splice_line_start(doc, len, "");
    }
    if LinePrefix::parse(prefix).is_some() {
        return replace_line_prefix(doc, Some(prefix));
    }
    splice_line_start(doc, 0, prefix)
}

fn current_prefix<D: EditorDocument>(doc: &D) -> Option<LinePrefix> {
    let line = line_text(doc, doc.cursor_offset());
    LinePrefix::parse(&line).map(|(prefix, _)| prefix)
}

fn previous_ordered_index<D: EditorDocument>(doc: &D) -> Option<u32> {
    let line_start = find_line_start(doc, doc.cursor_offset());
    if line_start == 0 {
        return None;
    }
    match LinePrefix::parse(&line_text(doc, line_start - 1))? {
        (LinePrefix::Ordered(n), _) => Some(n),
        _ => None,
    }
}

/// Swap the line's existing block prefix (if any) for `new_prefix`.
fn replace_line_prefix<D: EditorDocument>(doc: &mut D, new_prefix: Option<&str>) -> bool {
    let line = line_text(doc, doc.cursor_offset());
    let old_len = LinePrefix::parse(&line).map_or(0, |(_, len)| len);
    splice_line_start(doc, old_len, new_prefix.unwrap_or(""))
}

/// Replace the first `old_len` chars of the cursor's line with `text`,
/// keeping the cursor and selection anchored to the line's content.
fn splice_line_start<D: EditorDocument>(doc: &mut D, old_len: usize, text: &str) -> bool {
    let cursor = doc.cursor_offset();
    let selection = doc.selection();
    let line_start = find_line_start(doc, cursor);
    let old_end = line_start + old_len;
    let new_len = text.chars().count();
    let delta = new_len as isize - old_len as isize;

    if old_len == 0 && new_len == 0 {
        return false;
    }
    doc.replace(line_start..old_end, text);

    // Offsets inside the replaced prefix land just after the new prefix.
    let remap = |offset: usize| {
        if offset < line_start {
            offset
        } else if offset < old_end {
            line_start + new_len
        } else {
            shift_offset(offset, line_start, delta)
        }
    };
    doc.set_cursor_offset(remap(cursor));
    doc.set_selection(selection.map(|sel| Selection::new(remap(sel.anchor), remap(sel.head))));
    true
}

fn execute_select_all<D: EditorDocument>(doc: &mut D) -> bool {
    let len = doc.len_chars();
    doc.set_selection(Some(Selection::new(0, len)));
    doc.set_cursor_offset(len);
    true
}

fn execute_move_cursor<D: EditorDocument>(doc: &mut D, offset: usize) -> bool {
    let offset = offset.min(doc.len_chars());
    doc.set_cursor_offset(offset);
    doc.set_selection(None);
    true
}

fn execute_extend_selection<D: EditorDocument>(doc: &mut D, offset: usize) -> bool {
    let offset = offset.min(doc.len_chars());
    let anchor = doc
        .selection()
        .map(|s| s.anchor)
        .unwrap_or_else(|| doc.cursor_offset());
    doc.set_selection(Some(Selection::new(anchor, offset)));
    doc.set_cursor_offset(offset);
    true
}
