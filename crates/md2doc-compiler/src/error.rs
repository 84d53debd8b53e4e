//! Compiler error types.

/// Internal invariant violation during compilation.
///
/// Fatal by design: a corrupted offset would silently produce a wrong but
/// "successful" remote document, so compilation aborts before any network
/// call is made.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// An insert was computed at an offset before a previous insert.
    #[error("insert offset {offset} precedes previous insert at {previous}")]
    NonMonotonicInsert { offset: u64, previous: u64 },

    /// A style range is inverted or starts before the buffer origin.
    #[error("invalid style range {start}..{end}")]
    InvalidRange { start: u64, end: u64 },

    /// A style range extends past the text inserted so far.
    #[error("style range {start}..{end} extends past inserted text (end of buffer {limit})")]
    RangeOutOfBounds { start: u64, end: u64, limit: u64 },

    /// A text style range partially overlaps the previous one.
    #[error("style range {start}..{end} overlaps prior range {prior_start}..{prior_end}")]
    OverlappingRange {
        start: u64,
        end: u64,
        prior_start: u64,
        prior_end: u64,
    },

    /// A table's row or column count does not fit the wire representation.
    #[error("table of {rows}x{cols} cells exceeds the addressable size")]
    TableTooLarge { rows: usize, cols: usize },
}

/// Failure to resolve a table cell offset.
#[derive(Debug, thiserror::Error)]
pub enum TableOffsetError {
    /// The resolved document structure has no such cell.
    #[error("document structure has no cell at row {row}, column {col}")]
    MissingCell { row: u32, col: u32 },

    /// The resolved document structure has fewer tables than were compiled.
    #[error("document structure has no table at position {index}")]
    MissingTable { index: usize },
}
