//! Mutation operations and style vocabulary.
//!
//! The remote document API has no tree or markup model — only a linear
//! character buffer addressed by absolute integer offsets. A compiled
//! document is an ordered [`MutationOp`] sequence plus, for each table,
//! a [`PendingTable`] whose cell text is written in a second batch once
//! the table's real cell offsets are known.

/// A character-level style applied over an offset range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CharStyle {
    Bold,
    Italic,
    /// Monospace font with background shading.
    Code,
    Strikethrough,
    Link(String),
}

/// Named paragraph styles understood by the remote document service.
pub mod paragraph_style {
    pub const NORMAL: &str = "NORMAL_TEXT";
    pub const TITLE: &str = "TITLE";
    pub const SUBTITLE: &str = "SUBTITLE";
    /// Monospace paragraph with background shading for code blocks.
    pub const CODE: &str = "CODE";
    /// Styled empty paragraph standing in for a thematic break.
    pub const HORIZONTAL_RULE: &str = "HORIZONTAL_RULE";

    /// Heading style name for a level in 1..=6.
    #[must_use]
    pub fn heading(level: u8) -> String {
        format!("HEADING_{}", level.clamp(1, 6))
    }
}

/// Bullet preset applied over a whole list range.
///
/// Item nesting is expressed by leading tabs inside the range, which the
/// remote API converts to indent levels when the preset is applied — not
/// by separate ranges per depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulletPreset {
    /// Disc/circle/square glyph rotation for bullet lists.
    Disc,
    /// Decimal/alpha/roman numbering for ordered lists.
    Decimal,
}

/// A single mutation against the remote document's linear buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOp {
    InsertText {
        offset: u64,
        text: String,
    },
    SetTextStyle {
        start: u64,
        end: u64,
        style: CharStyle,
    },
    SetParagraphStyle {
        start: u64,
        end: u64,
        style: String,
    },
    CreateBulletRange {
        start: u64,
        end: u64,
        preset: BulletPreset,
    },
    InsertTable {
        offset: u64,
        rows: u32,
        cols: u32,
    },
}

/// A deferred cell write, resolved to an offset by the gateway's table
/// offset strategy after the table exists in the live document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellWrite {
    pub row: u32,
    pub col: u32,
    pub text: String,
    /// Header-row cells are written bold.
    pub bold: bool,
}

/// A table whose structure is in the primary batch but whose cell text is
/// still pending. `offset` is where the table was inserted; the analytic
/// cursor advance past it is an approximation corrected at population time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTable {
    pub offset: u64,
    pub rows: u32,
    pub cols: u32,
    /// Exactly `rows * cols` writes in row-major order.
    pub cells: Vec<CellWrite>,
}

/// Output of compiling one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledDocument {
    /// Primary batch, in application order.
    pub ops: Vec<MutationOp>,
    /// Tables awaiting phase-two cell population, in document order.
    pub tables: Vec<PendingTable>,
}

impl CompiledDocument {
    /// Total character count of all inserted text (including newlines).
    #[must_use]
    pub fn inserted_chars(&self) -> u64 {
        self.ops
            .iter()
            .filter_map(|op| match op {
                MutationOp::InsertText { text, .. } => {
                    Some(text.chars().count() as u64)
                }
                _ => None,
            })
            .sum()
    }

    /// Whether phase-two table population is required.
    #[must_use]
    pub fn has_tables(&self) -> bool {
        !self.tables.is_empty()
    }
}
