//! Inline span tokenizer.
//!
//! Scans block text left to right with delimiter precedence
//! `code > bold > italic > strikethrough > link`, consuming the longest
//! valid delimiter pair at each position. Unterminated delimiters are
//! always treated as literal text — the tokenizer never fails.
//!
//! Nested emphasis is resolved by re-scanning the content of a matched
//! pair with the outer style flags inherited, so `**a *b* c**` yields
//! three non-overlapping spans: bold, bold-italic, bold.

use crate::document::InlineSpan;

/// Style flags inherited by nested delimiter content.
#[derive(Clone, Copy, Default)]
struct Flags {
    bold: bool,
    italic: bool,
    strikethrough: bool,
}

impl Flags {
    fn span(self, text: String) -> InlineSpan {
        InlineSpan {
            text,
            bold: self.bold,
            italic: self.italic,
            strikethrough: self.strikethrough,
            ..InlineSpan::default()
        }
    }
}

/// Tokenize block text into ordered, non-overlapping spans.
///
/// Concatenating the returned span texts reproduces the input with all
/// matched delimiters stripped.
#[must_use]
pub fn tokenize_inline(text: &str) -> Vec<InlineSpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    scan(&chars, Flags::default(), &mut spans);
    coalesce(spans)
}

/// Scan a character slice, appending spans styled with `flags`.
fn scan(chars: &[char], flags: Flags, out: &mut Vec<InlineSpan>) {
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        // Inline code: highest precedence, content taken literally.
        if chars[i] == '`' {
            if let Some(j) = find_char(chars, i + 1, '`')
                && j > i + 1
            {
                flush(&mut literal, flags, out);
                let mut span = flags.span(chars[i + 1..j].iter().collect());
                span.code = true;
                out.push(span);
                i = j + 1;
                continue;
            }
            literal.push('`');
            i += 1;
            continue;
        }

        // Bold, then italic: the double marker is tried first so the
        // longest delimiter wins at each position.
        if let Some(next) = match_pair(chars, i, flags, &mut literal, out) {
            i = next;
            continue;
        }

        // Link: [text](url), text taken literally.
        if chars[i] == '['
            && let Some((text, url, next)) = match_link(chars, i)
        {
            flush(&mut literal, flags, out);
            let mut span = flags.span(text);
            span.link = Some(url);
            out.push(span);
            i = next;
            continue;
        }

        literal.push(chars[i]);
        i += 1;
    }

    flush(&mut literal, flags, out);
}

/// Try emphasis and strikethrough delimiters at position `i`.
///
/// Returns the position after the consumed pair, or `None` if no valid
/// pair starts here.
fn match_pair(
    chars: &[char],
    i: usize,
    flags: Flags,
    literal: &mut String,
    out: &mut Vec<InlineSpan>,
) -> Option<usize> {
    for marker in ['*', '_'] {
        // Double marker: bold.
        if starts_with(chars, i, marker, 2)
            && let Some(j) = find_double(chars, i + 2, marker)
            && j > i + 2
        {
            flush(literal, flags, out);
            let mut inner = flags;
            inner.bold = true;
            scan(&chars[i + 2..j], inner, out);
            return Some(j + 2);
        }
        // Single marker: italic.
        if chars[i] == marker
            && !starts_with(chars, i, marker, 2)
            && let Some(j) = find_char(chars, i + 1, marker)
            && j > i + 1
        {
            flush(literal, flags, out);
            let mut inner = flags;
            inner.italic = true;
            scan(&chars[i + 1..j], inner, out);
            return Some(j + 1);
        }
    }

    if starts_with(chars, i, '~', 2)
        && let Some(j) = find_double(chars, i + 2, '~')
        && j > i + 2
    {
        flush(literal, flags, out);
        let mut inner = flags;
        inner.strikethrough = true;
        scan(&chars[i + 2..j], inner, out);
        return Some(j + 2);
    }

    None
}

/// Match `[text](url)` starting at `i`. Returns (text, url, next position).
fn match_link(chars: &[char], i: usize) -> Option<(String, String, usize)> {
    let close_bracket = find_char(chars, i + 1, ']')?;
    if close_bracket == i + 1 || chars.get(close_bracket + 1) != Some(&'(') {
        return None;
    }
    let close_paren = find_char(chars, close_bracket + 2, ')')?;
    let text = chars[i + 1..close_bracket].iter().collect();
    let url = chars[close_bracket + 2..close_paren].iter().collect();
    Some((text, url, close_paren + 1))
}

fn starts_with(chars: &[char], i: usize, marker: char, count: usize) -> bool {
    chars.len() >= i + count && chars[i..i + count].iter().all(|&c| c == marker)
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    chars[from.min(chars.len())..]
        .iter()
        .position(|&c| c == needle)
        .map(|p| from + p)
}

/// Find the next run of two `marker` characters at or after `from`.
fn find_double(chars: &[char], from: usize, marker: char) -> Option<usize> {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == marker && chars[i + 1] == marker {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Flush buffered literal text as a span with the inherited flags.
fn flush(literal: &mut String, flags: Flags, out: &mut Vec<InlineSpan>) {
    if !literal.is_empty() {
        out.push(flags.span(std::mem::take(literal)));
    }
}

/// Merge adjacent spans with identical styling and drop empty spans.
fn coalesce(spans: Vec<InlineSpan>) -> Vec<InlineSpan> {
    let mut merged: Vec<InlineSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        if let Some(last) = merged.last_mut()
            && same_style(last, &span)
        {
            last.text.push_str(&span.text);
            continue;
        }
        merged.push(span);
    }
    merged
}

fn same_style(a: &InlineSpan, b: &InlineSpan) -> bool {
    a.bold == b.bold
        && a.italic == b.italic
        && a.code == b.code
        && a.strikethrough == b.strikethrough
        && a.link == b.link
}
