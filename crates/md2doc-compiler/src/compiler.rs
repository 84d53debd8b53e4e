//! The document-to-mutation compiler.
//!
//! Maintains a single cursor threaded through a strict left fold over the
//! block sequence: operations for a block are fully emitted and the
//! cursor advanced before the next block is considered. There is no
//! lookahead and no shared state, so compilation is pure and
//! deterministic — independent documents can compile concurrently.
//!
//! Offsets count Unicode scalar values. The cursor starts at 1 because
//! the remote buffer reserves offset 0.

use tracing::debug;

use md2doc_model::{Block, Document, FrontMatter, InlineSpan, ListItem};

use crate::error::CompileError;
use crate::ops::{
    BulletPreset, CellWrite, CharStyle, CompiledDocument, MutationOp, PendingTable,
    paragraph_style,
};
use crate::table::table_advance;

/// Compile a document into its mutation operation sequence.
///
/// # Errors
///
/// Returns [`CompileError`] if any computed offset violates an internal
/// invariant. Nothing is dispatched in that case — a wrong offset would
/// corrupt the remote document silently rather than fail.
pub fn compile(document: &Document) -> Result<CompiledDocument, CompileError> {
    let mut emitter = Emitter::new();

    emitter.front_matter(&document.front_matter)?;
    for block in &document.blocks {
        emitter.block(block)?;
    }

    let compiled = emitter.finish();
    debug!(
        ops = compiled.ops.len(),
        tables = compiled.tables.len(),
        chars = compiled.inserted_chars(),
        "compiled document"
    );
    Ok(compiled)
}

/// Character count of a string in buffer units.
fn char_len(text: &str) -> u64 {
    text.chars().count() as u64
}

fn concat_spans(spans: &[InlineSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// The explicit accumulator of the compilation fold.
struct Emitter {
    cursor: u64,
    last_insert: u64,
    /// Previous text-style range, for overlap checking. Repeating the
    /// exact same range is allowed (one op per active span flag).
    last_text_range: Option<(u64, u64)>,
    ops: Vec<MutationOp>,
    tables: Vec<PendingTable>,
}

impl Emitter {
    fn new() -> Self {
        Self {
            cursor: 1,
            last_insert: 1,
            last_text_range: None,
            ops: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn finish(self) -> CompiledDocument {
        CompiledDocument {
            ops: self.ops,
            tables: self.tables,
        }
    }

    /// Compile the front-matter header as synthetic title and subtitle
    /// blocks ahead of any body block.
    fn front_matter(&mut self, front_matter: &FrontMatter) -> Result<(), CompileError> {
        if front_matter.is_empty() {
            return Ok(());
        }

        if let Some(title) = front_matter.title() {
            let start = self.text_block(title, paragraph_style::TITLE)?;
            self.set_text_style(start, start + char_len(title), CharStyle::Bold)?;
        }

        let subtitle: Vec<String> = front_matter
            .iter()
            .filter(|(key, _)| key != "title")
            .map(|(key, value)| format!("{}: {}", display_key(key), value.display()))
            .collect();
        if !subtitle.is_empty() {
            self.text_block(&subtitle.join(" | "), paragraph_style::SUBTITLE)?;
        }

        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), CompileError> {
        match block {
            Block::Heading { level, spans } => {
                let start = self.text_block(&concat_spans(spans), &paragraph_style::heading(*level))?;
                self.span_styles(start, spans)
            }
            Block::Paragraph { spans } => {
                let start = self.text_block(&concat_spans(spans), paragraph_style::NORMAL)?;
                self.span_styles(start, spans)
            }
            Block::BulletList { items } => self.list(items, BulletPreset::Disc),
            Block::OrderedList { items } => self.list(items, BulletPreset::Decimal),
            Block::Table { rows } => self.table(rows),
            Block::CodeBlock { text, .. } => {
                let start = self.text_block(text, paragraph_style::CODE)?;
                self.set_text_style(start, start + char_len(text), CharStyle::Code)
            }
            Block::Rule => self.rule(),
        }
    }

    /// Insert one block's text with its trailing newline and paragraph
    /// style. Returns the block's start offset.
    fn text_block(&mut self, text: &str, style: &str) -> Result<u64, CompileError> {
        let start = self.cursor;
        let len = char_len(text);
        self.insert(format!("{text}\n"))?;
        self.set_paragraph_style(start, start + len, style)?;
        Ok(start)
    }

    /// Emit one `SetTextStyle` per active flag of each span.
    fn span_styles(&mut self, base: u64, spans: &[InlineSpan]) -> Result<(), CompileError> {
        let mut offset = base;
        for span in spans {
            let end = offset + char_len(&span.text);
            if span.bold {
                self.set_text_style(offset, end, CharStyle::Bold)?;
            }
            if span.italic {
                self.set_text_style(offset, end, CharStyle::Italic)?;
            }
            if span.code {
                self.set_text_style(offset, end, CharStyle::Code)?;
            }
            if span.strikethrough {
                self.set_text_style(offset, end, CharStyle::Strikethrough)?;
            }
            if let Some(url) = &span.link {
                self.set_text_style(offset, end, CharStyle::Link(url.clone()))?;
            }
            offset = end;
        }
        Ok(())
    }

    /// Compile list items as ordinary blocks, then cover the whole
    /// contiguous range with a single bullet-range operation. Nesting is
    /// carried as leading tabs consumed by the preset, one per depth
    /// level.
    fn list(&mut self, items: &[ListItem], preset: BulletPreset) -> Result<(), CompileError> {
        if items.is_empty() {
            return Ok(());
        }

        let first_start = self.cursor;
        for item in items {
            let indent = "\t".repeat(item.depth);
            let text = format!("{indent}{}", concat_spans(&item.spans));
            let start = self.text_block(&text, paragraph_style::NORMAL)?;
            self.span_styles(start + item.depth as u64, &item.spans)?;
        }
        let last_end = self.cursor - 1;

        self.ops.push(MutationOp::CreateBulletRange {
            start: first_start,
            end: last_end,
            preset,
        });
        Ok(())
    }

    /// Phase one of table compilation: insert the structure and advance
    /// the cursor by the analytic estimate; defer all cell text.
    fn table(&mut self, rows: &[Vec<Vec<InlineSpan>>]) -> Result<(), CompileError> {
        let Some(first_row) = rows.first() else {
            return Ok(());
        };
        let too_large = || CompileError::TableTooLarge {
            rows: rows.len(),
            cols: first_row.len(),
        };
        let row_count = u32::try_from(rows.len()).map_err(|_| too_large())?;
        let col_count = u32::try_from(first_row.len()).map_err(|_| too_large())?;
        if col_count == 0 {
            return Ok(());
        }

        let offset = self.cursor;
        self.ops.push(MutationOp::InsertTable {
            offset,
            rows: row_count,
            cols: col_count,
        });

        // Approximate advance; cell offsets are re-resolved at population
        // time, so drift here cannot leak past the table itself.
        self.cursor += table_advance(row_count, col_count);
        self.last_insert = self.cursor;

        let mut cells = Vec::with_capacity(rows.len() * first_row.len());
        for (row_index, row) in (0..row_count).zip(rows) {
            for (col_index, cell) in (0..col_count).zip(row) {
                cells.push(CellWrite {
                    row: row_index,
                    col: col_index,
                    text: concat_spans(cell),
                    bold: row_index == 0,
                });
            }
        }

        self.tables.push(PendingTable {
            offset,
            rows: row_count,
            cols: col_count,
            cells,
        });
        Ok(())
    }

    /// A rule consumes one newline of cursor advance as a styled empty
    /// paragraph.
    fn rule(&mut self) -> Result<(), CompileError> {
        let start = self.cursor;
        self.insert("\n".to_owned())?;
        self.set_paragraph_style(start, start, paragraph_style::HORIZONTAL_RULE)
    }

    fn insert(&mut self, text: String) -> Result<(), CompileError> {
        let offset = self.cursor;
        if offset < self.last_insert {
            return Err(CompileError::NonMonotonicInsert {
                offset,
                previous: self.last_insert,
            });
        }
        self.last_insert = offset;
        self.cursor = offset + char_len(&text);
        self.ops.push(MutationOp::InsertText { offset, text });
        Ok(())
    }

    fn set_paragraph_style(
        &mut self,
        start: u64,
        end: u64,
        style: &str,
    ) -> Result<(), CompileError> {
        self.check_range(start, end)?;
        self.ops.push(MutationOp::SetParagraphStyle {
            start,
            end,
            style: style.to_owned(),
        });
        Ok(())
    }

    fn set_text_style(
        &mut self,
        start: u64,
        end: u64,
        style: CharStyle,
    ) -> Result<(), CompileError> {
        self.check_range(start, end)?;
        if let Some((prior_start, prior_end)) = self.last_text_range
            && start < prior_end
            && (start, end) != (prior_start, prior_end)
        {
            return Err(CompileError::OverlappingRange {
                start,
                end,
                prior_start,
                prior_end,
            });
        }
        self.last_text_range = Some((start, end));
        self.ops.push(MutationOp::SetTextStyle { start, end, style });
        Ok(())
    }

    /// Every style range must lie within already-inserted text.
    fn check_range(&self, start: u64, end: u64) -> Result<(), CompileError> {
        if start < 1 || end < start {
            return Err(CompileError::InvalidRange { start, end });
        }
        if end > self.cursor {
            return Err(CompileError::RangeOutOfBounds {
                start,
                end,
                limit: self.cursor,
            });
        }
        Ok(())
    }
}

/// Format a front-matter key for display: `snake_case` becomes spaced
/// Title Case.
fn display_key(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use md2doc_model::parse_document;

    use super::*;

    fn compile_markdown(text: &str) -> CompiledDocument {
        compile(&parse_document(text).document).unwrap()
    }

    #[test]
    fn test_heading_and_bold_paragraph_offsets() {
        let compiled = compile_markdown("# Title\n\nHello **world**");
        assert_eq!(
            compiled.ops[0],
            MutationOp::InsertText {
                offset: 1,
                text: "Title\n".to_owned()
            }
        );
        assert_eq!(
            compiled.ops[1],
            MutationOp::SetParagraphStyle {
                start: 1,
                end: 6,
                style: "HEADING_1".to_owned()
            }
        );
        assert_eq!(
            compiled.ops[2],
            MutationOp::InsertText {
                offset: 7,
                text: "Hello world\n".to_owned()
            }
        );
        assert_eq!(
            compiled.ops[4],
            MutationOp::SetTextStyle {
                start: 13,
                end: 18,
                style: CharStyle::Bold
            }
        );
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let text = "---\ntitle: T\n---\n# A\n\n- x\n- y\n\n| h |\n|---|\n| v |";
        let first = compile_markdown(text);
        let second = compile_markdown(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_insert_offsets_non_decreasing_and_ranges_in_bounds() {
        let compiled =
            compile_markdown("# H\n\npara with *i* and `c`\n\n- a\n- b\n\n```\ncode\n```\n\n---");
        let mut last_insert = 0;
        let mut end_of_text = 1;
        for op in &compiled.ops {
            match op {
                MutationOp::InsertText { offset, text } => {
                    assert!(*offset >= last_insert);
                    last_insert = *offset;
                    end_of_text = offset + text.chars().count() as u64;
                }
                MutationOp::SetTextStyle { start, end, .. }
                | MutationOp::SetParagraphStyle { start, end, .. }
                | MutationOp::CreateBulletRange { start, end, .. } => {
                    assert!(start <= end);
                    assert!(*end <= end_of_text);
                }
                MutationOp::InsertTable { .. } => {}
            }
        }
    }

    #[test]
    fn test_insert_length_sum_matches_rendered_text() {
        // No lists or tables: inserted length is exactly the rendered
        // character count.
        let compiled = compile_markdown("# Title\n\nHello **world**");
        assert_eq!(compiled.inserted_chars(), 6 + 12);
    }

    #[test]
    fn test_bullet_range_spans_entire_list() {
        let compiled = compile_markdown("- a\n  - b\n- c");
        // Items: "a\n" at 1, "\tb\n" at 3, "c\n" at 6.
        let bullet = compiled
            .ops
            .iter()
            .find_map(|op| match op {
                MutationOp::CreateBulletRange { start, end, preset } => {
                    Some((*start, *end, *preset))
                }
                _ => None,
            })
            .expect("bullet range emitted");
        assert_eq!(bullet, (1, 7, BulletPreset::Disc));
        // Depth is carried as a leading tab, not a separate range.
        assert_eq!(
            compiled.ops[2],
            MutationOp::InsertText {
                offset: 3,
                text: "\tb\n".to_owned()
            }
        );
    }

    #[test]
    fn test_single_bullet_range_per_list() {
        let compiled = compile_markdown("- a\n- b\n- c");
        let count = compiled
            .ops
            .iter()
            .filter(|op| matches!(op, MutationOp::CreateBulletRange { .. }))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_ordered_list_uses_decimal_preset() {
        let compiled = compile_markdown("1. a\n2. b");
        assert!(compiled.ops.iter().any(|op| matches!(
            op,
            MutationOp::CreateBulletRange {
                preset: BulletPreset::Decimal,
                ..
            }
        )));
    }

    #[test]
    fn test_table_emits_structure_and_defers_cells() {
        let compiled = compile_markdown("| h1 | h2 |\n|----|----|\n| r1 | r2 |");
        assert_eq!(
            compiled.ops[0],
            MutationOp::InsertTable {
                offset: 1,
                rows: 2,
                cols: 2
            }
        );
        let table = &compiled.tables[0];
        assert_eq!(table.cells.len(), 4);
        assert!(table.cells[0].bold && table.cells[1].bold);
        assert!(!table.cells[2].bold);
        assert_eq!(table.cells[3].text, "r2");
    }

    #[test]
    fn test_padded_table_rows_emit_full_cell_grid() {
        let compiled = compile_markdown("| h1 | h2 |\n|---|---|\n| only |");
        let table = &compiled.tables[0];
        assert_eq!(table.cells.len(), usize::try_from(table.rows * table.cols).unwrap());
        assert_eq!(table.cells[3].text, "");
    }

    #[test]
    fn test_overwide_table_row_is_clipped_to_header_width() {
        // The parser pads rows to equal width, but a hand-built document
        // can carry a row wider than the header. Extra cells would be
        // unaddressable in the grid, so they are dropped.
        let document = Document {
            front_matter: FrontMatter::default(),
            blocks: vec![Block::Table {
                rows: vec![
                    vec![vec![InlineSpan::plain("h")]],
                    vec![vec![InlineSpan::plain("v")], vec![InlineSpan::plain("extra")]],
                ],
            }],
        };
        let compiled = compile(&document).unwrap();
        let table = &compiled.tables[0];
        assert_eq!((table.rows, table.cols), (2, 1));
        assert_eq!(table.cells.len(), 2);
        assert!(table.cells.iter().all(|cell| cell.col == 0));
    }

    #[test]
    fn test_cursor_advances_past_table_for_next_block() {
        let compiled = compile_markdown("| h |\n|---|\n| v |\n\nafter");
        // Table at 1 advances 1 + 2*(1+2) + 1 = 8, next insert at 9.
        assert!(compiled.ops.iter().any(|op| matches!(
            op,
            MutationOp::InsertText { offset: 9, text } if text == "after\n"
        )));
    }

    #[test]
    fn test_front_matter_compiles_before_body() {
        let compiled =
            compile_markdown("---\ntitle: My Doc\nauthor: Jane\npub_date: 2024-01-02\n---\n# H");
        assert_eq!(
            compiled.ops[0],
            MutationOp::InsertText {
                offset: 1,
                text: "My Doc\n".to_owned()
            }
        );
        assert_eq!(
            compiled.ops[1],
            MutationOp::SetParagraphStyle {
                start: 1,
                end: 7,
                style: "TITLE".to_owned()
            }
        );
        // Title is bold, then the remaining pairs become one subtitle line.
        assert_eq!(
            compiled.ops[2],
            MutationOp::SetTextStyle {
                start: 1,
                end: 7,
                style: CharStyle::Bold
            }
        );
        assert_eq!(
            compiled.ops[3],
            MutationOp::InsertText {
                offset: 8,
                text: "Author: Jane | Pub Date: 2024-01-02\n".to_owned()
            }
        );
    }

    #[test]
    fn test_code_block_styled_as_code() {
        let compiled = compile_markdown("```rust\nlet x = 1;\n```");
        assert_eq!(
            compiled.ops[0],
            MutationOp::InsertText {
                offset: 1,
                text: "let x = 1;\n".to_owned()
            }
        );
        assert!(matches!(
            &compiled.ops[1],
            MutationOp::SetParagraphStyle { style, .. } if style == "CODE"
        ));
        assert_eq!(
            compiled.ops[2],
            MutationOp::SetTextStyle {
                start: 1,
                end: 11,
                style: CharStyle::Code
            }
        );
    }

    #[test]
    fn test_rule_consumes_one_newline() {
        let compiled = compile_markdown("---\n\nafter");
        assert_eq!(
            compiled.ops[0],
            MutationOp::InsertText {
                offset: 1,
                text: "\n".to_owned()
            }
        );
        assert!(compiled.ops.iter().any(|op| matches!(
            op,
            MutationOp::InsertText { offset: 2, text } if text == "after\n"
        )));
    }

    #[test]
    fn test_link_span_emits_link_style() {
        let compiled = compile_markdown("see [docs](https://example.com)");
        assert!(compiled.ops.iter().any(|op| matches!(
            op,
            MutationOp::SetTextStyle {
                start: 5,
                end: 9,
                style: CharStyle::Link(url)
            } if url == "https://example.com"
        )));
    }

    #[test]
    fn test_display_key_formatting() {
        assert_eq!(display_key("pub_date"), "Pub Date");
        assert_eq!(display_key("author"), "Author");
    }
}
