//! Remote document compiler.
//!
//! Turns a [`md2doc_model::Document`] into an ordered [`MutationOp`]
//! sequence with absolute offsets for the remote document service's
//! batch-mutation API. The target has no tree or markup concept — every
//! insertion and style change is an exact offset range against a linear
//! character buffer, so correctness rests entirely on the cursor
//! arithmetic in [`compile`].
//!
//! Table cell text is not part of the primary operation sequence: phase
//! one inserts the table structure, and the dispatch gateway writes cell
//! text in a second batch after resolving real cell offsets through a
//! [`TableOffsetStrategy`].
//!
//! # Example
//!
//! ```
//! use md2doc_model::parse_document;
//! use md2doc_compiler::{MutationOp, compile};
//!
//! let document = parse_document("# Title\n\nHello **world**").document;
//! let compiled = compile(&document).unwrap();
//! assert!(matches!(
//!     &compiled.ops[0],
//!     MutationOp::InsertText { offset: 1, .. }
//! ));
//! ```

mod compiler;
mod error;
mod ops;
mod table;

pub use compiler::compile;
pub use error::{CompileError, TableOffsetError};
pub use ops::{
    BulletPreset, CellWrite, CharStyle, CompiledDocument, MutationOp, PendingTable,
    paragraph_style,
};
pub use table::{
    AnalyticalOffsetStrategy, ReadBackOffsetStrategy, TableGrid, TableOffsetStrategy,
    table_advance,
};
