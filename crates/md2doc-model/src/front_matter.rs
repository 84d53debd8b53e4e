//! Front-matter extraction.
//!
//! Splits an optional `---`-delimited metadata header from the markdown
//! body. The header is parsed with `serde_yaml` first; if the block as a
//! whole is malformed, a line-wise salvage pass keeps every parsable
//! `key: value` line and drops the rest with a logged warning, so a single
//! bad line never aborts a conversion.

use serde_yaml::Value;
use tracing::warn;

use crate::document::{FieldValue, FrontMatter};

/// Front-matter delimiter line.
const DELIMITER: &str = "---";

/// Split front matter from the document body.
///
/// Returns the parsed front matter, the body text and any warnings
/// produced while recovering from malformed metadata. If the text does not
/// begin with a delimiter line, front matter is empty and the entire text
/// is the body.
#[must_use]
pub fn extract_front_matter(text: &str) -> (FrontMatter, &str, Vec<String>) {
    let Some(rest) = strip_opening_delimiter(text) else {
        return (FrontMatter::default(), text, Vec::new());
    };

    // Find the matching closing delimiter line.
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let (front_matter, warnings) = parse_header(header);
            return (front_matter, body, warnings);
        }
        offset += line.len();
    }

    // No closing delimiter: the opening line was ordinary content.
    (FrontMatter::default(), text, Vec::new())
}

/// Strip the opening delimiter line, returning the remainder.
fn strip_opening_delimiter(text: &str) -> Option<&str> {
    let first_line_end = text.find('\n')?;
    if text[..first_line_end].trim_end() == DELIMITER {
        Some(&text[first_line_end + 1..])
    } else {
        None
    }
}

/// Parse the header block into ordered key/value pairs.
fn parse_header(header: &str) -> (FrontMatter, Vec<String>) {
    if header.trim().is_empty() {
        return (FrontMatter::default(), Vec::new());
    }

    match serde_yaml::from_str::<serde_yaml::Mapping>(header) {
        Ok(mapping) => convert_mapping(mapping),
        Err(err) => {
            warn!("front matter is not valid YAML ({err}), salvaging line by line");
            salvage_lines(header)
        }
    }
}

/// Convert a YAML mapping into front-matter fields, preserving key order.
fn convert_mapping(mapping: serde_yaml::Mapping) -> (FrontMatter, Vec<String>) {
    let mut fields = Vec::new();
    let mut warnings = Vec::new();

    for (key, value) in mapping {
        let Some(key) = scalar_text(&key) else {
            let msg = "dropped front-matter entry with non-scalar key".to_owned();
            warn!("{msg}");
            warnings.push(msg);
            continue;
        };
        match convert_value(&value) {
            Some(value) => fields.push((key, value)),
            None => {
                let msg = format!("dropped front-matter field '{key}' with unsupported value");
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    (FrontMatter::from_fields(fields), warnings)
}

/// Convert a YAML value to a field value. Nested mappings are unsupported.
fn convert_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => Some(FieldValue::Scalar(String::new())),
        Value::Sequence(items) => {
            let items = items.iter().map(|v| scalar_text(v).unwrap_or_default());
            Some(FieldValue::List(items.collect()))
        }
        other => scalar_text(other).map(FieldValue::Scalar),
    }
}

/// Render a scalar YAML value as text. Dates arrive as plain strings
/// already in their source spelling (YAML has no native date type here).
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Line-wise recovery for a header that is not valid YAML as a whole.
///
/// Each `key: value` line is kept; anything else is dropped with a warning.
fn salvage_lines(header: &str) -> (FrontMatter, Vec<String>) {
    let mut fields = Vec::new();
    let mut warnings = Vec::new();

    for line in header.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                fields.push((
                    key.trim().to_owned(),
                    FieldValue::Scalar(value.trim().to_owned()),
                ));
            }
            _ => {
                let msg = format!("dropped malformed front-matter line: {}", line.trim());
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    (FrontMatter::from_fields(fields), warnings)
}
