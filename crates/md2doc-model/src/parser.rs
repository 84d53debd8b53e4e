//! Line-oriented block parser.
//!
//! A state machine over source lines with states `Normal`, `InList`,
//! `InTable` and `InCodeFence`. Blank lines terminate the current list or
//! table; unknown line shapes always fall back to `Paragraph` — parsing
//! never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Block, Document, InlineSpan, ListItem};
use crate::front_matter::extract_front_matter;
use crate::inline::tokenize_inline;

/// Spaces per list nesting level.
const INDENT_UNIT: usize = 2;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap());
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").unwrap());
static ORDERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\d+[.)]\s+(.*)$").unwrap());
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\s*(\S*)\s*$").unwrap());
static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap());
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?[\s:|-]*-[\s:|-]*\|?\s*$").unwrap());

/// Result of parsing a full document.
#[derive(Clone, Debug, Default)]
pub struct ParseOutcome {
    pub document: Document,
    /// Warnings from locally recovered parse problems (malformed front
    /// matter lines and the like). Never fatal.
    pub warnings: Vec<String>,
}

/// Parse raw markdown text (with optional front matter) into a [`Document`].
#[must_use]
pub fn parse_document(text: &str) -> ParseOutcome {
    let (front_matter, body, warnings) = extract_front_matter(text);
    let blocks = parse_blocks(body);
    ParseOutcome {
        document: Document {
            front_matter,
            blocks,
        },
        warnings,
    }
}

/// Parse a markdown body (front matter already stripped) into blocks.
#[must_use]
pub fn parse_blocks(body: &str) -> Vec<Block> {
    let mut parser = BlockParser::default();
    for line in body.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Pending multi-line construct being accumulated.
#[derive(Default)]
enum State {
    #[default]
    Normal,
    InList {
        ordered: bool,
        items: Vec<ListItem>,
    },
    InTable {
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
    InCodeFence {
        language: Option<String>,
        lines: Vec<String>,
    },
}

/// Line-oriented parser state machine.
#[derive(Default)]
struct BlockParser {
    blocks: Vec<Block>,
    state: State,
    paragraph: Vec<String>,
}

impl BlockParser {
    fn feed(&mut self, line: &str) {
        // Code fences capture everything verbatim until the closing fence.
        if let State::InCodeFence { .. } = self.state {
            if FENCE.is_match(line) {
                self.flush_state();
            } else if let State::InCodeFence { lines, .. } = &mut self.state {
                lines.push(line.to_owned());
            }
            return;
        }

        if let Some(caps) = FENCE.captures(line) {
            self.flush_all();
            let tag = caps.get(1).map_or("", |m| m.as_str());
            self.state = State::InCodeFence {
                language: (!tag.is_empty()).then(|| tag.to_owned()),
                lines: Vec::new(),
            };
            return;
        }

        if line.trim().is_empty() {
            self.flush_all();
            return;
        }

        if let Some(caps) = HEADING.captures(line) {
            self.flush_all();
            let level = u8::try_from(caps[1].len()).unwrap_or(6);
            self.blocks.push(Block::Heading {
                level,
                spans: tokenize_inline(caps[2].trim_end()),
            });
            return;
        }

        if let Some((ordered, depth, text)) = match_list_item(line) {
            self.push_list_item(ordered, depth, &text);
            return;
        }

        // Rules are checked after list items so `- item` never matches,
        // and only outside tables so alignment rows are not consumed here.
        if !matches!(self.state, State::InTable { .. }) && RULE.is_match(line) {
            self.flush_all();
            self.blocks.push(Block::Rule);
            return;
        }

        let in_table = matches!(self.state, State::InTable { .. });
        if is_table_row(line, in_table) {
            self.push_table_row(line);
            return;
        }

        // Anything else is paragraph text.
        self.flush_state();
        self.paragraph.push(line.trim().to_owned());
    }

    fn push_list_item(&mut self, ordered: bool, depth: usize, text: &str) {
        self.flush_paragraph();
        let item = ListItem {
            depth,
            spans: tokenize_inline(text),
        };
        match &mut self.state {
            State::InList {
                ordered: current,
                items,
            } if *current == ordered => items.push(item),
            _ => {
                self.flush_state();
                self.state = State::InList {
                    ordered,
                    items: vec![item],
                };
            }
        }
    }

    fn push_table_row(&mut self, line: &str) {
        self.flush_paragraph();
        let in_table = matches!(self.state, State::InTable { .. });
        // The alignment separator row is structural, not content.
        if in_table && TABLE_SEPARATOR.is_match(line) {
            return;
        }
        let cells: Vec<Vec<InlineSpan>> = split_cells(line)
            .into_iter()
            .map(|cell| tokenize_inline(&cell))
            .collect();
        match &mut self.state {
            State::InTable { rows } => rows.push(cells),
            _ => {
                self.flush_state();
                self.state = State::InTable { rows: vec![cells] };
            }
        }
    }

    /// Close the pending multi-line construct, if any.
    fn flush_state(&mut self) {
        match std::mem::take(&mut self.state) {
            State::Normal => {}
            State::InList { ordered, items } => {
                let block = if ordered {
                    Block::OrderedList { items }
                } else {
                    Block::BulletList { items }
                };
                self.blocks.push(block);
            }
            State::InTable { rows } => {
                self.blocks.push(Block::Table {
                    rows: pad_rows(rows),
                });
            }
            State::InCodeFence { language, lines } => {
                self.blocks.push(Block::CodeBlock {
                    language,
                    text: lines.join("\n"),
                });
            }
        }
    }

    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let text = self.paragraph.join(" ");
            self.paragraph.clear();
            self.blocks.push(Block::Paragraph {
                spans: tokenize_inline(&text),
            });
        }
    }

    fn flush_all(&mut self) {
        self.flush_state();
        self.flush_paragraph();
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_all();
        self.blocks
    }
}

/// Match a bullet or ordered list item, returning (ordered, depth, text).
fn match_list_item(line: &str) -> Option<(bool, usize, String)> {
    if let Some(caps) = BULLET.captures(line) {
        let depth = indent_depth(&caps[1]);
        return Some((false, depth, caps[2].trim_end().to_owned()));
    }
    if let Some(caps) = ORDERED.captures(line) {
        let depth = indent_depth(&caps[1]);
        return Some((true, depth, caps[2].trim_end().to_owned()));
    }
    None
}

/// Nesting depth from leading whitespace (tabs count as one unit).
fn indent_depth(indent: &str) -> usize {
    let width: usize = indent
        .chars()
        .map(|c| if c == '\t' { INDENT_UNIT } else { 1 })
        .sum();
    width / INDENT_UNIT
}

/// A pipe-prefixed line starts a table; once inside, any line containing
/// pipe-delimited cells continues it.
fn is_table_row(line: &str, in_table: bool) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') || (in_table && trimmed.contains('|'))
}

/// Split a pipe-delimited row into trimmed cell texts.
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line
        .trim()
        .trim_start_matches('|')
        .trim_end_matches('|');
    trimmed
        .split('|')
        .map(|cell| cell.trim().to_owned())
        .collect()
}

/// Pad short rows with empty cells so every row has the same column count.
fn pad_rows(mut rows: Vec<Vec<Vec<InlineSpan>>>) -> Vec<Vec<Vec<InlineSpan>>> {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        while row.len() < cols {
            row.push(Vec::new());
        }
    }
    rows
}
