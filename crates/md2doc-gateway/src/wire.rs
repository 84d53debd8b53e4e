//! Wire encoding for the remote batch-mutation API.
//!
//! Translates [`MutationOp`] values into the service's JSON request
//! shapes and parses table cell offsets out of a read-back document
//! structure.

use serde_json::{Value, json};

use md2doc_compiler::{BulletPreset, CharStyle, MutationOp, TableGrid};

/// Encode a full operation sequence as batch request objects.
#[must_use]
pub fn encode_batch(ops: &[MutationOp]) -> Vec<Value> {
    ops.iter().map(encode_op).collect()
}

/// Encode one mutation operation.
#[must_use]
pub fn encode_op(op: &MutationOp) -> Value {
    match op {
        MutationOp::InsertText { offset, text } => json!({
            "insertText": {
                "location": { "index": offset },
                "text": text,
            }
        }),
        MutationOp::SetTextStyle { start, end, style } => {
            let (text_style, fields) = encode_char_style(style);
            json!({
                "updateTextStyle": {
                    "range": { "startIndex": start, "endIndex": end },
                    "textStyle": text_style,
                    "fields": fields,
                }
            })
        }
        MutationOp::SetParagraphStyle { start, end, style } => json!({
            "updateParagraphStyle": {
                "range": { "startIndex": start, "endIndex": end },
                "paragraphStyle": { "namedStyleType": style },
                "fields": "namedStyleType",
            }
        }),
        MutationOp::CreateBulletRange { start, end, preset } => json!({
            "createParagraphBullets": {
                "range": { "startIndex": start, "endIndex": end },
                "bulletPreset": preset_name(*preset),
            }
        }),
        MutationOp::InsertTable { offset, rows, cols } => json!({
            "insertTable": {
                "location": { "index": offset },
                "rows": rows,
                "columns": cols,
            }
        }),
    }
}

/// Insert request for resolved table cell text.
#[must_use]
pub fn encode_cell_text(offset: u64, text: &str) -> Value {
    json!({
        "insertText": {
            "location": { "index": offset },
            "text": text,
        }
    })
}

fn encode_char_style(style: &CharStyle) -> (Value, &'static str) {
    match style {
        CharStyle::Bold => (json!({ "bold": true }), "bold"),
        CharStyle::Italic => (json!({ "italic": true }), "italic"),
        CharStyle::Strikethrough => (json!({ "strikethrough": true }), "strikethrough"),
        CharStyle::Code => (
            json!({
                "weightedFontFamily": { "fontFamily": "Courier New" },
                "backgroundColor": {
                    "color": { "rgbColor": { "red": 0.95, "green": 0.95, "blue": 0.95 } }
                },
            }),
            "weightedFontFamily,backgroundColor",
        ),
        CharStyle::Link(url) => (json!({ "link": { "url": url } }), "link"),
    }
}

fn preset_name(preset: BulletPreset) -> &'static str {
    match preset {
        BulletPreset::Disc => "BULLET_DISC_CIRCLE_SQUARE",
        BulletPreset::Decimal => "NUMBERED_DECIMAL_ALPHA_ROMAN",
    }
}

/// Extract table cell content start offsets from a read-back document.
///
/// Walks `body.content` for table elements and takes the start index of
/// each cell's first content element. Tables appear in document order.
#[must_use]
pub fn parse_table_grids(document: &Value) -> Vec<TableGrid> {
    let Some(content) = document["body"]["content"].as_array() else {
        return Vec::new();
    };

    content
        .iter()
        .filter_map(|element| element.get("table"))
        .map(|table| {
            let rows = table["tableRows"].as_array().cloned().unwrap_or_default();
            TableGrid {
                cell_starts: rows.iter().map(row_cell_starts).collect(),
            }
        })
        .collect()
}

fn row_cell_starts(row: &Value) -> Vec<u64> {
    row["tableCells"]
        .as_array()
        .map(|cells| {
            cells
                .iter()
                .filter_map(|cell| cell["content"][0]["startIndex"].as_u64())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_encode_insert_text() {
        let op = MutationOp::InsertText {
            offset: 1,
            text: "Title\n".to_owned(),
        };
        assert_eq!(
            encode_op(&op),
            json!({
                "insertText": { "location": { "index": 1 }, "text": "Title\n" }
            })
        );
    }

    #[test]
    fn test_encode_bold_style() {
        let op = MutationOp::SetTextStyle {
            start: 13,
            end: 18,
            style: CharStyle::Bold,
        };
        let encoded = encode_op(&op);
        assert_eq!(encoded["updateTextStyle"]["fields"], "bold");
        assert_eq!(encoded["updateTextStyle"]["textStyle"]["bold"], true);
        assert_eq!(encoded["updateTextStyle"]["range"]["startIndex"], 13);
    }

    #[test]
    fn test_encode_paragraph_style() {
        let op = MutationOp::SetParagraphStyle {
            start: 1,
            end: 6,
            style: "HEADING_1".to_owned(),
        };
        let encoded = encode_op(&op);
        assert_eq!(
            encoded["updateParagraphStyle"]["paragraphStyle"]["namedStyleType"],
            "HEADING_1"
        );
    }

    #[test]
    fn test_encode_bullet_presets() {
        let op = MutationOp::CreateBulletRange {
            start: 1,
            end: 7,
            preset: BulletPreset::Disc,
        };
        assert_eq!(
            encode_op(&op)["createParagraphBullets"]["bulletPreset"],
            "BULLET_DISC_CIRCLE_SQUARE"
        );
    }

    #[test]
    fn test_encode_link_style() {
        let op = MutationOp::SetTextStyle {
            start: 5,
            end: 9,
            style: CharStyle::Link("https://example.com".to_owned()),
        };
        let encoded = encode_op(&op);
        assert_eq!(
            encoded["updateTextStyle"]["textStyle"]["link"]["url"],
            "https://example.com"
        );
    }

    #[test]
    fn test_parse_table_grids_from_document_structure() {
        let document = json!({
            "body": {
                "content": [
                    { "paragraph": {} },
                    {
                        "table": {
                            "tableRows": [
                                { "tableCells": [
                                    { "content": [{ "startIndex": 5 }] },
                                    { "content": [{ "startIndex": 7 }] },
                                ]},
                                { "tableCells": [
                                    { "content": [{ "startIndex": 10 }] },
                                    { "content": [{ "startIndex": 12 }] },
                                ]},
                            ]
                        }
                    },
                ]
            }
        });
        let grids = parse_table_grids(&document);
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].cell_starts, vec![vec![5, 7], vec![10, 12]]);
    }

    #[test]
    fn test_parse_table_grids_handles_missing_body() {
        assert!(parse_table_grids(&json!({})).is_empty());
    }
}
