//! Block codec: line-level markdown structure to and from [`Block`]s.
//!
//! Lines are classified with a fixed precedence: fenced code, heading,
//! task item, bullet item, ordered item, blockquote, image-only line,
//! blank, paragraph. Anything that matches nothing else is a paragraph, so
//! decoding never fails.

use std::ops::Range;

use serde::Serialize;

use crate::inline::{self, InlineRun, InlineSpan};

/// A structural, line-level unit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Paragraph(InlineRun),
    Heading { level: u8, content: InlineRun },
    BulletListItem(InlineRun),
    OrderedListItem { index: u32, content: InlineRun },
    TaskListItem { checked: bool, content: InlineRun },
    Blockquote(InlineRun),
    CodeBlock { code: String, language: Option<String> },
    Image { alt: String, src: String },
    Blank,
}

impl Block {
    /// Inline content for blocks that carry any.
    pub fn content(&self) -> Option<&InlineRun> {
        match self {
            Block::Paragraph(c)
            | Block::Heading { content: c, .. }
            | Block::BulletListItem(c)
            | Block::OrderedListItem { content: c, .. }
            | Block::TaskListItem { content: c, .. }
            | Block::Blockquote(c) => Some(c),
            Block::CodeBlock { .. } | Block::Image { .. } | Block::Blank => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Block::Blank)
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            Block::BulletListItem(_) => Some(ListKind::Bullet),
            Block::OrderedListItem { .. } => Some(ListKind::Ordered),
            Block::TaskListItem { .. } => Some(ListKind::Task),
            _ => None,
        }
    }
}

/// Which kind of list container a list item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

/// A decoded block plus the source lines it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedBlock {
    pub block: Block,
    /// Zero-based line range (end exclusive).
    pub lines: Range<usize>,
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Marker used for bullet items (`-`, `*` or `+`).
    pub bullet_marker: char,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { bullet_marker: '-' }
    }
}

// === Decoding ===

/// Decode markdown into a flat block sequence.
pub fn decode(markdown: &str) -> Vec<Block> {
    decode_spanned(markdown)
        .into_iter()
        .map(|spanned| spanned.block)
        .collect()
}

/// Decode markdown, recording each block's source line range.
pub fn decode_spanned(markdown: &str) -> Vec<SpannedBlock> {
    let lines: Vec<&str> = markdown
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(language) = fence_open(line) {
            let start = i;
            i += 1;
            let body_start = i;
            while i < lines.len() && !is_fence_close(lines[i]) {
                i += 1;
            }
            let code = lines[body_start..i].join("\n");
            // Step over the closing fence when there is one; an unterminated
            // fence simply runs to the end of input.
            if i < lines.len() {
                i += 1;
            }
            blocks.push(SpannedBlock {
                block: Block::CodeBlock { code, language },
                lines: start..i,
            });
            continue;
        }

        blocks.push(SpannedBlock {
            block: classify_line(line),
            lines: i..i + 1,
        });
        i += 1;
    }
    blocks
}

fn fence_open(line: &str) -> Option<Option<String>> {
    let rest = line.trim_start().strip_prefix("```")?;
    let language = rest.trim();
    Some((!language.is_empty()).then(|| language.to_string()))
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == "```"
}

fn classify_line(line: &str) -> Block {
    if let Some((level, rest)) = heading_prefix(line) {
        return Block::Heading {
            level,
            content: inline::decode(rest),
        };
    }
    if let Some((checked, rest)) = task_prefix(line) {
        return Block::TaskListItem {
            checked,
            content: inline::decode(rest),
        };
    }
    if let Some(rest) = bullet_prefix(line) {
        return Block::BulletListItem(inline::decode(rest));
    }
    if let Some((index, rest)) = ordered_prefix(line) {
        return Block::OrderedListItem {
            index,
            content: inline::decode(rest),
        };
    }
    if let Some(rest) = quote_prefix(line) {
        return Block::Blockquote(inline::decode(rest));
    }
    if line.trim().is_empty() {
        return Block::Blank;
    }

    let content = inline::decode(line);
    if let [InlineSpan::Image { alt, src }] = content.spans() {
        if line.trim() == line {
            return Block::Image {
                alt: alt.clone(),
                src: src.clone(),
            };
        }
    }
    Block::Paragraph(content)
}

/// `#`×1–6 followed by a space.
pub(crate) fn heading_prefix(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    Some((hashes as u8, rest))
}

/// `- [ ] ` / `- [x] ` (either case). A bare `- [ ]` is an empty item.
pub(crate) fn task_prefix(line: &str) -> Option<(bool, &str)> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let checked = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    if rest.is_empty() {
        return Some((checked, rest));
    }
    Some((checked, rest.strip_prefix(' ')?))
}

pub(crate) fn bullet_prefix(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
}

pub(crate) fn ordered_prefix(line: &str) -> Option<(u32, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = line[digits..].strip_prefix(". ")?;
    let index = line[..digits].parse().ok()?;
    Some((index, rest))
}

pub(crate) fn quote_prefix(line: &str) -> Option<&str> {
    if line == ">" {
        return Some("");
    }
    line.strip_prefix("> ")
}

// === Encoding ===

/// Encode blocks with default options.
pub fn encode(blocks: &[Block]) -> String {
    encode_with(blocks, &EncodeOptions::default())
}

/// Encode blocks to markdown.
///
/// Every block ends with a newline. A blank line is inserted between two
/// adjacent non-blank blocks unless they are list items of the same kind
/// or consecutive blockquote lines.
pub fn encode_with(blocks: &[Block], options: &EncodeOptions) -> String {
    let mut out = String::new();
    let mut prev: Option<&Block> = None;

    for block in blocks {
        if let Some(prev) = prev {
            if needs_separator(prev, block) {
                out.push('\n');
            }
        }
        encode_block(block, options, &mut out);
        prev = Some(block);
    }
    out
}

fn needs_separator(prev: &Block, next: &Block) -> bool {
    if prev.is_blank() || next.is_blank() {
        return false;
    }
    if let (Some(a), Some(b)) = (prev.list_kind(), next.list_kind()) {
        return a != b;
    }
    !matches!(
        (prev, next),
        (Block::Blockquote(_), Block::Blockquote(_))
    )
}

fn encode_block(block: &Block, options: &EncodeOptions, out: &mut String) {
    match block {
        Block::CodeBlock { code, language } => {
            out.push_str("```");
            if let Some(language) = language {
                out.push_str(language);
            }
            out.push('\n');
            if !code.is_empty() {
                out.push_str(code);
                out.push('\n');
            }
            out.push_str("```");
        }
        Block::Image { alt, src } => {
            let span = InlineSpan::Image {
                alt: alt.clone(),
                src: src.clone(),
            };
            out.push_str(&inline::encode(&InlineRun::from_spans([span])));
        }
        Block::Blank => {}
        _ => {
            let line = content_line(block, options, false);
            if fence_open(&line).is_none() && classify_line(&line) == *block {
                out.push_str(&line);
            } else {
                out.push_str(&content_line(block, options, true));
            }
        }
    }
    out.push('\n');
}

/// The single line of a content-bearing block. With `escape_start`, the
/// first marker character of the content is backslash-escaped so the line
/// cannot be read as a different kind of block.
fn content_line(block: &Block, options: &EncodeOptions, escape_start: bool) -> String {
    let mut line = String::new();
    let content = match block {
        Block::Paragraph(content) => content,
        Block::Heading { level, content } => {
            let level = (*level).clamp(1, 6) as usize;
            line.push_str(&"#".repeat(level));
            line.push(' ');
            content
        }
        Block::BulletListItem(content) => {
            line.push(options.bullet_marker);
            line.push(' ');
            content
        }
        Block::OrderedListItem { index, content } => {
            line.push_str(&index.to_string());
            line.push_str(". ");
            content
        }
        Block::TaskListItem { checked, content } => {
            line.push_str(if *checked { "- [x] " } else { "- [ ] " });
            content
        }
        Block::Blockquote(content) => {
            line.push_str("> ");
            content
        }
        Block::CodeBlock { .. } | Block::Image { .. } | Block::Blank => return line,
    };

    let encoded = inline::encode(content);
    if escape_start {
        line.push_str(&escape_leading_marker(&encoded));
    } else {
        line.push_str(&encoded);
    }
    line
}

/// `# x` becomes `\# x`, `1. x` becomes `1\. x`.
fn escape_leading_marker(content: &str) -> String {
    let at = content.bytes().take_while(u8::is_ascii_digit).count();
    match content[at..].chars().next() {
        Some(ch) if ch.is_ascii_punctuation() && ch != '\\' => {
            format!("{}\\{}", &content[..at], &content[at..])
        }
        _ => content.to_string(),
    }
}

/// Drop blank blocks, for comparing sequences modulo inter-block spacing.
pub fn without_blanks(blocks: &[Block]) -> Vec<&Block> {
    blocks.iter().filter(|b| !b.is_blank()).collect()
}

/// All wikilink targets across the blocks, in document order.
pub fn wikilinks(blocks: &[Block]) -> Vec<&str> {
    blocks
        .iter()
        .filter_map(Block::content)
        .flat_map(inline::wikilinks)
        .collect()
}

/// Whether the markdown contains at least one task item marker.
pub fn has_task_markers(markdown: &str) -> bool {
    markdown.lines().any(|l| task_prefix(l).is_some())
}
