//! The intermediate representation shared by all renderer targets.
//!
//! A [`Document`] is front matter plus an ordered block sequence. Blocks
//! contain ordered, non-overlapping [`InlineSpan`]s whose concatenated text
//! equals the block's rendered plain text.
//!
//! Instances are created fresh per conversion request and never reused or
//! mutated across requests.

/// A single value in the front-matter mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// Scalar value (strings, numbers, booleans and dates are all carried
    /// as their string rendering).
    Scalar(String),
    /// List of scalar values.
    List(Vec<String>),
}

impl FieldValue {
    /// Render the value as display text (lists are comma-joined).
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }
}

/// Ordered front-matter mapping extracted from the document header.
///
/// Absent front matter yields an empty mapping. Key order from the source
/// is preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: Vec<(String, FieldValue)>,
}

impl FrontMatter {
    /// Create front matter from ordered key/value pairs.
    #[must_use]
    pub fn from_fields(fields: Vec<(String, FieldValue)>) -> Self {
        Self { fields }
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// The `title` field as a plain string, if present.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self.get("title") {
            Some(FieldValue::Scalar(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Iterate over fields in source order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldValue)> {
        self.fields.iter()
    }
}

/// A run of text with uniform styling inside a block.
///
/// Spans within a block are ordered and non-overlapping; concatenating
/// their texts yields the block's plain text. A span may carry several
/// style flags at once (e.g. bold italic).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineSpan {
    /// Plain text of the span (delimiters stripped).
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strikethrough: bool,
    /// Link target, if this span is a link.
    pub link: Option<String>,
}

impl InlineSpan {
    /// Create an unstyled span.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the span carries any style flag.
    #[must_use]
    pub fn is_styled(&self) -> bool {
        self.bold || self.italic || self.code || self.strikethrough || self.link.is_some()
    }
}

/// A single list item with its nesting depth.
///
/// Depth is derived from source indentation (0 = top level, one level per
/// two spaces of leading whitespace).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub depth: usize,
    pub spans: Vec<InlineSpan>,
}

/// A block-level element of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Heading with level 1..=6.
    Heading { level: u8, spans: Vec<InlineSpan> },
    Paragraph { spans: Vec<InlineSpan> },
    BulletList { items: Vec<ListItem> },
    OrderedList { items: Vec<ListItem> },
    /// Table rows in source order; every row has the same column count
    /// (short rows are padded with empty cells at parse time).
    Table { rows: Vec<Vec<Vec<InlineSpan>>> },
    /// Fenced code block with its raw, unparsed text.
    CodeBlock { language: Option<String>, text: String },
    /// Thematic break.
    Rule,
}

impl Block {
    /// Concatenated plain text of the block's spans.
    ///
    /// Code blocks return their raw text; tables and rules return an empty
    /// string (tables are populated cell by cell, not as linear text).
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Heading { spans, .. } | Self::Paragraph { spans } => concat_spans(spans),
            Self::CodeBlock { text, .. } => text.clone(),
            Self::BulletList { items } | Self::OrderedList { items } => items
                .iter()
                .map(|item| concat_spans(&item.spans))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Table { .. } | Self::Rule => String::new(),
        }
    }
}

/// Concatenate span texts into the block's plain text.
#[must_use]
pub(crate) fn concat_spans(spans: &[InlineSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Front matter plus the ordered block sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub front_matter: FrontMatter,
    pub blocks: Vec<Block>,
}
