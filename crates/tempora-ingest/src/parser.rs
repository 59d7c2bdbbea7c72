//! Content parser: decodes raw CSV/JSON/text payloads into row-level
//! records.
//!
//! Failure policy: a malformed row is recorded as a warning and never aborts
//! the batch; only a content-level failure (an unreadable JSON document)
//! errors the parse itself.

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use tempora_core::{Error, Result, SourceType};

use crate::template::ImportTemplate;

/// One decoded row, pre-normalization.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Physical line number in the source (CSV header = line 1), or the
    /// 1-based element index for JSON arrays.
    pub row_number: i32,
    pub raw_text: String,
    pub original_data: Map<String, JsonValue>,
}

/// A row-local parsing problem.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub row_number: Option<i32>,
    pub message: String,
}

/// Result of parsing one payload: rows plus row-local warnings.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub rows: Vec<RawRow>,
    pub warnings: Vec<ParseWarning>,
}

/// Decode raw content into rows according to its source type, applying the
/// template's field renaming to each row.
pub fn parse(
    content: &str,
    source_type: SourceType,
    template: Option<&ImportTemplate>,
) -> Result<ParseOutcome> {
    let mut outcome = match source_type {
        SourceType::Csv => parse_csv(content),
        SourceType::Json => parse_json(content)?,
        SourceType::Text | SourceType::Manual => parse_text(content),
        SourceType::Excel => {
            // No spreadsheet decoder; tabular exports usually arrive as CSV.
            warn!(
                subsystem = "ingest",
                component = "parser",
                "Excel ingestion falls back to the CSV parser"
            );
            parse_csv(content)
        }
        SourceType::Ics => {
            warn!(
                subsystem = "ingest",
                component = "parser",
                "ICS ingestion is not implemented; no rows produced"
            );
            ParseOutcome::default()
        }
    };

    if let Some(template) = template {
        for row in &mut outcome.rows {
            template.apply_mapping(&mut row.original_data);
        }
    }

    Ok(outcome)
}

/// CSV: first line is the header row. A record shorter than the header list
/// yields nulls for the missing trailing fields; it is never dropped. Blank
/// lines contribute no row and leave a gap in the numbering.
fn parse_csv(content: &str) -> ParseOutcome {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => {
            return ParseOutcome {
                rows: vec![],
                warnings: vec![ParseWarning {
                    row_number: Some(1),
                    message: format!("unreadable header row: {e}"),
                }],
            }
        }
    };

    let mut outcome = ParseOutcome::default();
    let mut record = csv::StringRecord::new();
    loop {
        // The reader's position points at the upcoming record, which is the
        // best line estimate available when the record itself is malformed.
        let fallback_line = reader.position().line() as i32;
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record
                    .position()
                    .map(|p| p.line() as i32)
                    .unwrap_or(fallback_line);

                let mut data = Map::new();
                for (idx, header) in headers.iter().enumerate() {
                    let value = record
                        .get(idx)
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(|v| JsonValue::String(v.to_string()))
                        .unwrap_or(JsonValue::Null);
                    data.insert(header.clone(), value);
                }

                outcome.rows.push(RawRow {
                    row_number: line,
                    raw_text: record.iter().collect::<Vec<_>>().join(","),
                    original_data: data,
                });
            }
            Err(e) => {
                outcome.warnings.push(ParseWarning {
                    row_number: Some(fallback_line),
                    message: format!("malformed CSV record: {e}"),
                });
                if e.is_io_error() {
                    break;
                }
            }
        }
    }
    outcome
}

/// JSON: a top-level array of objects, or a single object treated as a
/// one-element array. Non-object elements are wrapped under `"value"`.
fn parse_json(content: &str) -> Result<ParseOutcome> {
    let document: JsonValue = serde_json::from_str(content)
        .map_err(|e| Error::Parse(format!("invalid JSON document: {e}")))?;

    let elements = match document {
        JsonValue::Array(items) => items,
        object @ JsonValue::Object(_) => vec![object],
        other => {
            return Err(Error::Parse(format!(
                "expected a JSON object or array, got {}",
                json_type_name(&other)
            )))
        }
    };

    let mut outcome = ParseOutcome::default();
    for (idx, element) in elements.into_iter().enumerate() {
        let row_number = idx as i32 + 1;
        let raw_text = element.to_string();
        let data = match element {
            JsonValue::Object(map) => map,
            scalar => {
                let mut map = Map::new();
                map.insert("value".to_string(), scalar);
                map
            }
        };
        outcome.rows.push(RawRow {
            row_number,
            raw_text,
            original_data: data,
        });
    }
    Ok(outcome)
}

/// Text/manual: one entry per non-blank line.
fn parse_text(content: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut data = Map::new();
        data.insert(
            "text".to_string(),
            JsonValue::String(trimmed.to_string()),
        );
        outcome.rows.push(RawRow {
            row_number: idx as i32 + 1,
            raw_text: trimmed.to_string(),
            original_data: data,
        });
    }
    outcome
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_blank_line_is_skipped_and_numbering_is_physical() {
        let content = "title,start\nA,2024-01-01 09:00\n\nB,2024-01-02 10:00";
        let outcome = parse(content, SourceType::Csv, None).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].row_number, 2);
        assert_eq!(outcome.rows[1].row_number, 4);
        assert_eq!(
            outcome.rows[0].original_data.get("title"),
            Some(&JsonValue::String("A".into()))
        );
        assert_eq!(
            outcome.rows[1].original_data.get("title"),
            Some(&JsonValue::String("B".into()))
        );
    }

    #[test]
    fn csv_short_row_yields_nulls_not_a_drop() {
        let content = "title,start,location\nOnly title";
        let outcome = parse(content, SourceType::Csv, None).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        let row = &outcome.rows[0];
        assert_eq!(
            row.original_data.get("title"),
            Some(&JsonValue::String("Only title".into()))
        );
        assert_eq!(row.original_data.get("start"), Some(&JsonValue::Null));
        assert_eq!(row.original_data.get("location"), Some(&JsonValue::Null));
    }

    #[test]
    fn csv_quoted_fields() {
        let content = "title,notes\n\"Lecture, room change\",\"bring \"\"notes\"\"\"";
        let outcome = parse(content, SourceType::Csv, None).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(
            outcome.rows[0].original_data.get("title"),
            Some(&JsonValue::String("Lecture, room change".into()))
        );
        assert_eq!(
            outcome.rows[0].original_data.get("notes"),
            Some(&JsonValue::String("bring \"notes\"".into()))
        );
    }

    #[test]
    fn json_array_of_objects() {
        let content = r#"[{"title": "A"}, {"title": "B"}]"#;
        let outcome = parse(content, SourceType::Json, None).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].row_number, 1);
        assert_eq!(outcome.rows[1].row_number, 2);
    }

    #[test]
    fn json_single_object_is_one_row() {
        let content = r#"{"title": "Solo"}"#;
        let outcome = parse(content, SourceType::Json, None).unwrap();

        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(
            outcome.rows[0].original_data.get("title"),
            Some(&JsonValue::String("Solo".into()))
        );
    }

    #[test]
    fn json_invalid_document_is_a_parse_error() {
        let err = parse("{not json", SourceType::Json, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn json_scalar_document_is_rejected() {
        let err = parse("42", SourceType::Json, None).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn text_one_row_per_nonblank_line() {
        let content = "Meet advisor\n\n  \nSubmit report\n";
        let outcome = parse(content, SourceType::Text, None).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].row_number, 1);
        assert_eq!(outcome.rows[0].raw_text, "Meet advisor");
        assert_eq!(outcome.rows[1].row_number, 4);
        assert_eq!(
            outcome.rows[1].original_data.get("text"),
            Some(&JsonValue::String("Submit report".into()))
        );
    }

    #[test]
    fn ics_yields_no_rows() {
        let outcome = parse("BEGIN:VCALENDAR", SourceType::Ics, None).unwrap();
        assert!(outcome.rows.is_empty());
    }

    #[test]
    fn template_mapping_is_applied_per_row() {
        let template = ImportTemplate {
            field_mappings: [("mon_hoc".to_string(), "title".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let content = "mon_hoc,phong\nToan,B2";
        let outcome = parse(content, SourceType::Csv, Some(&template)).unwrap();

        let row = &outcome.rows[0];
        assert_eq!(
            row.original_data.get("title"),
            Some(&JsonValue::String("Toan".into()))
        );
        // unmapped key preserved
        assert_eq!(
            row.original_data.get("phong"),
            Some(&JsonValue::String("B2".into()))
        );
    }
}
