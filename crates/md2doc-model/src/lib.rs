//! Markdown document model and parser.
//!
//! This crate turns raw markdown text (optionally preceded by a YAML
//! front-matter block) into a target-agnostic [`Document`]: an ordered
//! sequence of [`Block`] values, each containing ordered, non-overlapping
//! [`InlineSpan`]s.
//!
//! The model is consumed by every renderer target. It deliberately does not
//! pre-render front matter or apply any target-specific styling — that is
//! left to the compilers so each target can style it independently.
//!
//! # Example
//!
//! ```
//! use md2doc_model::{parse_document, Block};
//!
//! let outcome = parse_document("---\ntitle: Notes\n---\n# Hello\n\nSome **bold** text");
//! assert_eq!(outcome.document.front_matter.title(), Some("Notes"));
//! assert!(matches!(outcome.document.blocks[0], Block::Heading { level: 1, .. }));
//! ```

mod document;
mod front_matter;
mod inline;
mod parser;

pub use document::{Block, Document, FieldValue, FrontMatter, InlineSpan, ListItem};
pub use front_matter::extract_front_matter;
pub use inline::tokenize_inline;
pub use parser::{ParseOutcome, parse_blocks, parse_document};
