//! Inline span codec: markdown inline syntax to and from structured spans.
//!
//! Decoding is a small recursive-descent tokenizer. Each delimiter pair is
//! opened by `try_open` and closed by a recursive call to `parse_until`
//! with the matching terminator, so nested constructs close in the right
//! order without any global substitution passes.
//!
//! Nothing here fails: an opener with no matching closer is emitted as
//! literal text. A backslash before ASCII punctuation makes that character
//! literal.

use serde::Serialize;

/// An ordered sequence of inline spans, rendered left to right.
///
/// Adjacent `Text` spans are merged on every push so two runs that render
/// the same text compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InlineRun(Vec<InlineSpan>);

/// A character-level styled unit within a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineSpan {
    Text(String),
    Bold(InlineRun),
    Italic(InlineRun),
    Underline(InlineRun),
    Strikethrough(InlineRun),
    /// Literal code content, never contains nested spans.
    Code(String),
    /// `[[Title]]`. The title is kept verbatim; resolution trims and
    /// lowercases at lookup time.
    InternalLink(String),
    ExternalLink { text: InlineRun, url: String },
    Image { alt: String, src: String },
}

impl InlineRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a run from spans, merging adjacent text.
    pub fn from_spans(spans: impl IntoIterator<Item = InlineSpan>) -> Self {
        let mut run = Self::new();
        for span in spans {
            run.push(span);
        }
        run
    }

    /// A run holding a single text span (or nothing, for empty text).
    pub fn text(text: impl Into<String>) -> Self {
        let mut run = Self::new();
        run.push_text(text.into());
        run
    }

    /// Append a span.
    ///
    /// `Italic` wrapping a lone `Bold` is stored as `Bold(Italic(..))`; both
    /// are written `***x***`.
    pub fn push(&mut self, span: InlineSpan) {
        match span {
            InlineSpan::Text(text) => self.push_text(text),
            InlineSpan::Italic(mut inner) => {
                if let [InlineSpan::Bold(_)] = inner.0.as_slice()
                    && let Some(InlineSpan::Bold(bold)) = inner.0.pop()
                {
                    let italic = InlineSpan::Italic(bold);
                    self.0.push(InlineSpan::Bold(InlineRun::from_spans([italic])));
                } else {
                    self.0.push(InlineSpan::Italic(inner));
                }
            }
            other => self.0.push(other),
        }
    }

    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(InlineSpan::Text(last)) = self.0.last_mut() {
            last.push_str(&text);
        } else {
            self.0.push(InlineSpan::Text(text));
        }
    }

    pub fn spans(&self) -> &[InlineSpan] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InlineSpan> {
        self.0.iter()
    }

    /// Concatenated visible text, with all markup removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_plain(self, &mut out);
        out
    }
}

impl<'a> IntoIterator for &'a InlineRun {
    type Item = &'a InlineSpan;
    type IntoIter = std::slice::Iter<'a, InlineSpan>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<InlineSpan> for InlineRun {
    fn from_iter<I: IntoIterator<Item = InlineSpan>>(iter: I) -> Self {
        Self::from_spans(iter)
    }
}

fn collect_plain(run: &InlineRun, out: &mut String) {
    for span in run {
        match span {
            InlineSpan::Text(t) | InlineSpan::Code(t) | InlineSpan::InternalLink(t) => {
                out.push_str(t)
            }
            InlineSpan::Bold(inner)
            | InlineSpan::Italic(inner)
            | InlineSpan::Underline(inner)
            | InlineSpan::Strikethrough(inner) => collect_plain(inner, out),
            InlineSpan::ExternalLink { text, .. } => collect_plain(text, out),
            InlineSpan::Image { alt, .. } => out.push_str(alt),
        }
    }
}

// === Decoding ===

/// Decode a run of markdown inline syntax.
pub fn decode(text: &str) -> InlineRun {
    match parse_until(text, None) {
        Some((run, _)) => run,
        // Unreachable without a terminator, but stay total.
        None => InlineRun::text(text),
    }
}

/// Parse spans until `term` is found at a span boundary.
///
/// Returns the parsed run and the byte length consumed *before* the
/// terminator. With `term == None` the whole input is consumed. Returns
/// `None` when a terminator was requested but never found.
fn parse_until(s: &str, term: Option<&str>) -> Option<(InlineRun, usize)> {
    let mut run = InlineRun::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < s.len() {
        let rest = &s[i..];

        if let Some(ch) = escaped_char(rest) {
            run.push_text(s[text_start..i].to_string());
            run.push_text(ch.to_string());
            i += 1 + ch.len_utf8();
            text_start = i;
            continue;
        }

        if let Some(t) = term {
            if rest.starts_with(t) && !opens_nested_emphasis(rest, t) {
                run.push_text(s[text_start..i].to_string());
                return Some((run, i));
            }
        }

        if let Some((span, consumed)) = try_open(rest) {
            run.push_text(s[text_start..i].to_string());
            run.push(span);
            i += consumed;
            text_start = i;
            continue;
        }

        i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
    }

    if term.is_some() {
        return None;
    }
    run.push_text(s[text_start..].to_string());
    Some((run, s.len()))
}

/// A backslash followed by ASCII punctuation.
fn escaped_char(rest: &str) -> Option<char> {
    let mut chars = rest.strip_prefix('\\')?.chars();
    chars.next().filter(char::is_ascii_punctuation)
}

/// A `*` terminator followed by another `*` may instead open a nested bold
/// span (`*a **b** c*`). Only treat it as a closer when no bold can open.
fn opens_nested_emphasis(rest: &str, term: &str) -> bool {
    term == "*" && rest.starts_with("**") && try_open(rest).is_some()
}

/// Try to open a span at the start of `rest`, longest delimiter first.
fn try_open(rest: &str) -> Option<(InlineSpan, usize)> {
    if rest.starts_with("![") {
        if let Some(found) = open_image(rest) {
            return Some(found);
        }
    }
    if rest.starts_with("[[") {
        if let Some(found) = open_wikilink(rest) {
            return Some(found);
        }
    }
    if rest.starts_with('[') {
        if let Some(found) = open_link(rest) {
            return Some(found);
        }
    }
    if rest.starts_with('`') {
        if let Some(end) = rest[1..].find('`') {
            let code = rest[1..1 + end].to_string();
            return Some((InlineSpan::Code(code), end + 2));
        }
        return None;
    }
    if rest.starts_with("***") {
        if let Some((inner, consumed)) = open_delimited(rest, "***") {
            let italic = InlineSpan::Italic(inner);
            return Some((InlineSpan::Bold(InlineRun::from_spans([italic])), consumed));
        }
    }
    if rest.starts_with("**") {
        if let Some((inner, consumed)) = open_delimited(rest, "**") {
            return Some((InlineSpan::Bold(inner), consumed));
        }
    }
    if rest.starts_with("__") {
        if let Some((inner, consumed)) = open_delimited(rest, "__") {
            return Some((InlineSpan::Underline(inner), consumed));
        }
    }
    if rest.starts_with("~~") {
        if let Some((inner, consumed)) = open_delimited(rest, "~~") {
            return Some((InlineSpan::Strikethrough(inner), consumed));
        }
    }
    if rest.starts_with('*') {
        // `**` is never an empty italic; it is either bold or literal.
        if let Some((inner, consumed)) = open_delimited(rest, "*").filter(|(r, _)| !r.is_empty())
        {
            return Some((InlineSpan::Italic(inner), consumed));
        }
    }
    None
}

/// Symmetric delimiter pair: `delim inner delim`.
fn open_delimited(rest: &str, delim: &str) -> Option<(InlineRun, usize)> {
    let body = &rest[delim.len()..];
    let (inner, len) = parse_until(body, Some(delim))?;
    Some((inner, delim.len() * 2 + len))
}

fn open_wikilink(rest: &str) -> Option<(InlineSpan, usize)> {
    let body = &rest[2..];
    let end = body.find("]]")?;
    let target = &body[..end];
    if target.is_empty() || target.contains(['[', ']', '\n']) {
        return None;
    }
    Some((InlineSpan::InternalLink(target.to_string()), end + 4))
}

fn open_link(rest: &str) -> Option<(InlineSpan, usize)> {
    let text_end = matching_close(rest, 0, '[', ']')?;
    let after = &rest[text_end + 1..];
    if !after.starts_with('(') {
        return None;
    }
    let url_end = matching_close(rest, text_end + 1, '(', ')')?;
    let text = decode(&rest[1..text_end]);
    let url = rest[text_end + 2..url_end].to_string();
    Some((InlineSpan::ExternalLink { text, url }, url_end + 1))
}

fn open_image(rest: &str) -> Option<(InlineSpan, usize)> {
    let body = &rest[2..];
    let alt_end = body.find(']')?;
    let alt = &body[..alt_end];
    let src_start = 2 + alt_end + 1;
    if !rest[src_start..].starts_with('(') {
        return None;
    }

    let src_body = &rest[src_start + 1..];
    let src_len = if src_body.starts_with("data:") {
        greedy_close(src_body)?
    } else {
        matching_close(rest, src_start, '(', ')')? - (src_start + 1)
    };

    let src = src_body[..src_len].to_string();
    Some((
        InlineSpan::Image {
            alt: alt.to_string(),
            src,
        },
        src_start + 1 + src_len + 1,
    ))
}

/// Byte index of the bracket closing the one at `open_at`, tracking depth.
/// Escaped brackets do not count.
fn matching_close(s: &str, open_at: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (idx, ch) in s[open_at..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\n' {
            return None;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_at + idx);
            }
        }
    }
    None
}

/// Data URIs can be huge and contain parentheses. Take the *last* `)`
/// before the source token ends at whitespace.
fn greedy_close(src_body: &str) -> Option<usize> {
    let token_end = src_body
        .find(char::is_whitespace)
        .unwrap_or(src_body.len());
    src_body[..token_end].rfind(')')
}

// === Encoding ===

/// Encode a run back to markdown. Deterministic inverse of [`decode`].
///
/// Text is written verbatim when that already decodes to the same run.
/// Otherwise every delimiter character in text is backslash-escaped. Link
/// URLs, image sources and code are always written verbatim.
pub fn encode(run: &InlineRun) -> String {
    let verbatim = encode_with(run, false);
    if decode(&verbatim) == *run {
        return verbatim;
    }
    encode_with(run, true)
}

fn encode_with(run: &InlineRun, escape: bool) -> String {
    let mut out = String::new();
    encode_into(run, escape, &mut out);
    out
}

fn encode_into(run: &InlineRun, escape: bool, out: &mut String) {
    for span in run {
        encode_span(span, escape, out);
    }
}

/// Characters that can start or end an inline construct.
const DELIMITERS: &[char] = &['\\', '*', '_', '~', '`', '[', ']', '!'];

fn push_text(out: &mut String, text: &str, escape: bool) {
    if !escape {
        out.push_str(text);
        return;
    }
    for ch in text.chars() {
        if DELIMITERS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn encode_span(span: &InlineSpan, escape: bool, out: &mut String) {
    match span {
        InlineSpan::Text(text) => push_text(out, text, escape),
        InlineSpan::Bold(inner) => wrap(out, "**", inner, escape),
        InlineSpan::Italic(inner) => wrap(out, "*", inner, escape),
        InlineSpan::Underline(inner) => wrap(out, "__", inner, escape),
        InlineSpan::Strikethrough(inner) => wrap(out, "~~", inner, escape),
        InlineSpan::Code(code) => {
            out.push('`');
            out.push_str(code);
            out.push('`');
        }
        InlineSpan::InternalLink(target) => {
            out.push_str("[[");
            out.push_str(target);
            out.push_str("]]");
        }
        InlineSpan::ExternalLink { text, url } => {
            out.push('[');
            encode_into(text, escape, out);
            out.push_str("](");
            out.push_str(url);
            out.push(')');
        }
        InlineSpan::Image { alt, src } => {
            out.push_str("![");
            out.push_str(alt);
            out.push_str("](");
            out.push_str(src);
            out.push(')');
        }
    }
}

fn wrap(out: &mut String, delim: &str, inner: &InlineRun, escape: bool) {
    out.push_str(delim);
    encode_into(inner, escape, out);
    out.push_str(delim);
}

/// Every `[[target]]` in the run, in document order, including those
/// nested inside emphasis or link text.
pub fn wikilinks(run: &InlineRun) -> Vec<&str> {
    let mut found = Vec::new();
    collect_wikilinks(run, &mut found);
    found
}

fn collect_wikilinks<'a>(run: &'a InlineRun, found: &mut Vec<&'a str>) {
    for span in run {
        match span {
            InlineSpan::InternalLink(target) => found.push(target),
            InlineSpan::Bold(inner)
            | InlineSpan::Italic(inner)
            | InlineSpan::Underline(inner)
            | InlineSpan::Strikethrough(inner) => collect_wikilinks(inner, found),
            InlineSpan::ExternalLink { text, .. } => collect_wikilinks(text, found),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> InlineSpan {
        InlineSpan::Text(s.to_string())
    }

    fn run(spans: Vec<InlineSpan>) -> InlineRun {
        InlineRun::from_spans(spans)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(decode("hello world"), InlineRun::text("hello world"));
        assert_eq!(decode(""), InlineRun::new());
    }

    #[test]
    fn test_bold_italic_precedence() {
        assert_eq!(
            decode("***x***"),
            run(vec![InlineSpan::Bold(run(vec![InlineSpan::Italic(
                InlineRun::text("x")
            )]))])
        );
        assert_eq!(
            decode("**x**"),
            run(vec![InlineSpan::Bold(InlineRun::text("x"))])
        );
        assert_eq!(
            decode("*x*"),
            run(vec![InlineSpan::Italic(InlineRun::text("x"))])
        );
    }

    #[test]
    fn test_nested_italic_inside_bold() {
        let decoded = decode("**bold and *italic* text**");
        assert_eq!(
            decoded,
            run(vec![InlineSpan::Bold(run(vec![
                text("bold and "),
                InlineSpan::Italic(InlineRun::text("italic")),
                text(" text"),
            ]))])
        );
    }

    #[test]
    fn test_bold_inside_italic() {
        let decoded = decode("*a **b** c*");
        assert_eq!(
            decoded,
            run(vec![InlineSpan::Italic(run(vec![
                text("a "),
                InlineSpan::Bold(InlineRun::text("b")),
                text(" c"),
            ]))])
        );
    }

    #[test]
    fn test_trailing_italic_inside_bold() {
        let decoded = decode("**a *b***");
        assert_eq!(
            decoded,
            run(vec![InlineSpan::Bold(run(vec![
                text("a "),
                InlineSpan::Italic(InlineRun::text("b")),
            ]))])
        );
    }

    #[test]
    fn test_empty_bold() {
        assert_eq!(decode("****"), run(vec![InlineSpan::Bold(InlineRun::new())]));
    }

    #[test]
    fn test_unmatched_delimiters_are_literal() {
        assert_eq!(decode("a *"), InlineRun::text("a *"));
        assert_eq!(decode("**open"), InlineRun::text("**open"));
        assert_eq!(decode("`tick"), InlineRun::text("`tick"));
        assert_eq!(decode("[[]]"), InlineRun::text("[[]]"));
        assert_eq!(decode("[text]"), InlineRun::text("[text]"));
    }

    #[test]
    fn test_code_is_literal() {
        assert_eq!(
            decode("use `**not bold**` here"),
            run(vec![
                text("use "),
                InlineSpan::Code("**not bold**".into()),
                text(" here"),
            ])
        );
    }

    #[test]
    fn test_underline_and_strike() {
        assert_eq!(
            decode("__u__ ~~s~~"),
            run(vec![
                InlineSpan::Underline(InlineRun::text("u")),
                text(" "),
                InlineSpan::Strikethrough(InlineRun::text("s")),
            ])
        );
    }

    #[test]
    fn test_wikilink() {
        assert_eq!(
            decode("see [[Meeting Notes]]!"),
            run(vec![
                text("see "),
                InlineSpan::InternalLink("Meeting Notes".into()),
                text("!"),
            ])
        );
    }

    #[test]
    fn test_external_link_with_formatted_text() {
        assert_eq!(
            decode("[**docs**](https://example.com/a_(b))"),
            run(vec![InlineSpan::ExternalLink {
                text: run(vec![InlineSpan::Bold(InlineRun::text("docs"))]),
                url: "https://example.com/a_(b)".into(),
            }])
        );
    }

    #[test]
    fn test_data_uri_image_is_greedy() {
        let decoded = decode("![x](data:image/png;base64,AAA(BBB)CCC)");
        assert_eq!(
            decoded,
            run(vec![InlineSpan::Image {
                alt: "x".into(),
                src: "data:image/png;base64,AAA(BBB)CCC".into(),
            }])
        );
    }

    #[test]
    fn test_data_uri_with_unbalanced_paren() {
        let decoded = decode("![x](data:a)b)");
        assert_eq!(
            decoded,
            run(vec![InlineSpan::Image {
                alt: "x".into(),
                src: "data:a)b".into(),
            }])
        );
    }

    #[test]
    fn test_plain_image_stops_at_balanced_paren() {
        let decoded = decode("![cat](cat.png) (photo)");
        assert_eq!(
            decoded,
            run(vec![
                InlineSpan::Image {
                    alt: "cat".into(),
                    src: "cat.png".into(),
                },
                text(" (photo)"),
            ])
        );
    }

    #[test]
    fn test_round_trip_well_formed() {
        let inputs = [
            "plain",
            "**b** and *i* and `c`",
            "**bold and *italic* text**",
            "__u__ ~~s~~ [[Link]]",
            "[a **b**](http://x) ![alt](src.png)",
            "![x](data:image/png;base64,AAA(BBB)CCC)",
            "***both***",
            "****",
            "unicode é 日本 *ok*",
        ];
        for input in inputs {
            assert_eq!(encode(&decode(input)), input, "input: {input}");
        }
    }

    #[test]
    fn test_text_merge_on_construction() {
        let merged = run(vec![text("a"), text("b"), text(""), text("c")]);
        assert_eq!(merged.spans(), &[text("abc")]);
    }

    #[test]
    fn test_wikilinks_nested() {
        let decoded = decode("[[A]] **and [[B]]** [x [[C]]](u)");
        assert_eq!(wikilinks(&decoded), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(decode(r"2\*3\*4"), InlineRun::text("2*3*4"));
        assert_eq!(decode(r"\[[x]]"), InlineRun::text("[[x]]"));
        assert_eq!(decode(r"a\\b"), InlineRun::text(r"a\b"));
        // Not punctuation: the backslash is literal.
        assert_eq!(decode(r"C:\dir"), InlineRun::text(r"C:\dir"));
        assert_eq!(
            decode(r"**a\***"),
            run(vec![InlineSpan::Bold(InlineRun::text("a*"))])
        );
    }

    #[test]
    fn test_escaped_link_text() {
        assert_eq!(
            decode(r"[a\]b](u)"),
            run(vec![InlineSpan::ExternalLink {
                text: InlineRun::text("a]b"),
                url: "u".into(),
            }])
        );
    }

    #[test]
    fn test_encode_escapes_only_when_needed() {
        assert_eq!(encode(&InlineRun::text("5 * 3")), "5 * 3");
        assert_eq!(encode(&InlineRun::text("2*3*4")), r"2\*3\*4");
        assert_eq!(
            encode(&run(vec![InlineSpan::Bold(InlineRun::text("a*"))])),
            r"**a\***"
        );
        assert_eq!(encode(&InlineRun::text("see [[x]]")), r"see \[\[x\]\]");
    }

    #[test]
    fn test_italic_around_bold_is_canonical() {
        let italic_bold = run(vec![InlineSpan::Italic(run(vec![InlineSpan::Bold(
            InlineRun::text("x"),
        )]))]);
        let bold_italic = run(vec![InlineSpan::Bold(run(vec![InlineSpan::Italic(
            InlineRun::text("x"),
        )]))]);
        assert_eq!(italic_bold, bold_italic);
        assert_eq!(encode(&italic_bold), "***x***");
        assert_eq!(decode("***x***"), italic_bold);
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let decoded = decode("**a** *b* [c](u) `d`");
        assert_eq!(decoded.plain_text(), "a b c d");
    }
}
