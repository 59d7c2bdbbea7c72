//! Entry normalizer: best-effort extraction of typed fields from
//! heterogeneous row data.
//!
//! Field extraction walks an ordered candidate-key list per target field:
//! English names first, then the Vietnamese school-schedule vocabulary the
//! import sources use. First match wins. Unparseable values leave the field
//! null with a recorded warning; normalization itself never fails.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

use tempora_core::{defaults, temporal, TaskPriority};

use crate::parser::RawRow;
use crate::template::ImportTemplate;

/// Candidate keys per target field, in precedence order.
const TITLE_KEYS: &[&str] = &[
    "title", "name", "subject", "task", "summary", "mon_hoc", "ten_mon", "cong_viec",
];
const DESCRIPTION_KEYS: &[&str] = &[
    "description",
    "desc",
    "details",
    "notes",
    "note",
    "text",
    "ghi_chu",
    "chi_tiet",
    "noi_dung",
];
const LOCATION_KEYS: &[&str] = &[
    "location", "place", "room", "venue", "address", "phong", "phong_hoc", "dia_diem",
];
const START_KEYS: &[&str] = &[
    "start_datetime",
    "start_time",
    "start",
    "begin",
    "datetime",
    "date",
    "ngay",
    "ngay_hoc",
    "thoi_gian",
    "thoi_gian_bat_dau",
];
const END_KEYS: &[&str] = &[
    "end_datetime",
    "end_time",
    "end",
    "finish",
    "ket_thuc",
    "thoi_gian_ket_thuc",
];
const PRIORITY_KEYS: &[&str] = &["priority", "importance", "urgency", "uu_tien", "muc_do"];

/// Typed fields extracted from one raw row.
#[derive(Debug, Clone, Default)]
pub struct NormalizedEntry {
    pub parsed_title: Option<String>,
    pub parsed_description: Option<String>,
    pub parsed_location: Option<String>,
    pub parsed_start_at: Option<DateTime<Utc>>,
    pub parsed_end_at: Option<DateTime<Utc>>,
    pub parsed_priority: i16,
    pub detected_keywords: Vec<String>,
    pub detected_category: Option<String>,
    /// Baseline completeness confidence in [0.3, 1.0].
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// Normalize one parsed row into typed fields.
pub fn normalize_row(row: &RawRow, template: Option<&ImportTemplate>) -> NormalizedEntry {
    let mut entry = NormalizedEntry {
        parsed_priority: defaults::DEFAULT_PRIORITY,
        ..Default::default()
    };
    let data = &row.original_data;

    entry.parsed_title = find_string(data, TITLE_KEYS);
    entry.parsed_description = find_string(data, DESCRIPTION_KEYS);
    entry.parsed_location = find_string(data, LOCATION_KEYS);

    if let Some(raw) = find_string(data, START_KEYS) {
        match temporal::parse_datetime(&raw) {
            Some(dt) => entry.parsed_start_at = Some(dt),
            None => entry
                .warnings
                .push(format!("unparseable start datetime: {raw:?}")),
        }
    }
    if let Some(raw) = find_string(data, END_KEYS) {
        match temporal::parse_datetime(&raw) {
            Some(dt) => entry.parsed_end_at = Some(dt),
            None => entry
                .warnings
                .push(format!("unparseable end datetime: {raw:?}")),
        }
    }

    // Priority: explicit field value → template default → global default.
    entry.parsed_priority = find_string(data, PRIORITY_KEYS)
        .map(|raw| priority_level(&raw))
        .or_else(|| template.and_then(|t| t.default_priority))
        .unwrap_or(defaults::DEFAULT_PRIORITY);

    entry.confidence = baseline_confidence(
        entry.parsed_title.is_some(),
        entry.parsed_start_at.is_some(),
        entry.parsed_description.is_some(),
        entry.parsed_location.is_some(),
    );

    entry
}

/// Baseline confidence gating automatic conversion:
/// `0.3 + 0.2·title + 0.2·start + 0.15·description + 0.15·location`,
/// capped at 1.0.
pub fn baseline_confidence(title: bool, start: bool, description: bool, location: bool) -> f32 {
    let mut score = defaults::CONFIDENCE_BASE;
    if title {
        score += defaults::CONFIDENCE_TITLE_WEIGHT;
    }
    if start {
        score += defaults::CONFIDENCE_START_WEIGHT;
    }
    if description {
        score += defaults::CONFIDENCE_DESCRIPTION_WEIGHT;
    }
    if location {
        score += defaults::CONFIDENCE_LOCATION_WEIGHT;
    }
    score.min(1.0)
}

/// Map an explicit priority value onto the numeric 1..5 scale.
fn priority_level(raw: &str) -> i16 {
    if let Ok(level) = raw.trim().parse::<i16>() {
        if (1..=5).contains(&level) {
            return level;
        }
    }
    match TaskPriority::from_str_loose(raw) {
        TaskPriority::Critical => 1,
        TaskPriority::High => 2,
        TaskPriority::Medium => 3,
        TaskPriority::Low => 4,
    }
}

/// Find the first candidate key carrying a usable value: exact key first,
/// then a case-insensitive pass, in listed precedence order.
fn find_string(data: &Map<String, JsonValue>, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        if let Some(value) = data.get(*candidate).and_then(value_to_string) {
            return Some(value);
        }
        for (key, value) in data {
            if key.to_lowercase() == *candidate {
                if let Some(value) = value_to_string(value) {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn value_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(data: serde_json::Value) -> RawRow {
        let map = match data {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        };
        RawRow {
            row_number: 2,
            raw_text: "test".into(),
            original_data: map,
        }
    }

    #[test]
    fn confidence_all_fields_present_is_one() {
        assert!((baseline_confidence(true, true, true, true) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_no_fields_is_base() {
        assert!((baseline_confidence(false, false, false, false) - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn confidence_partial_combinations() {
        assert!((baseline_confidence(true, false, false, false) - 0.5).abs() < 1e-6);
        assert!((baseline_confidence(true, true, false, false) - 0.7).abs() < 1e-6);
        assert!((baseline_confidence(false, false, true, true) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn extracts_english_fields() {
        let entry = normalize_row(
            &row(json!({
                "title": "Team sync",
                "description": "Weekly standup",
                "location": "Room 4",
                "start": "2024-03-04 09:00",
            })),
            None,
        );

        assert_eq!(entry.parsed_title.as_deref(), Some("Team sync"));
        assert_eq!(entry.parsed_description.as_deref(), Some("Weekly standup"));
        assert_eq!(entry.parsed_location.as_deref(), Some("Room 4"));
        assert!(entry.parsed_start_at.is_some());
        assert!((entry.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn extracts_vietnamese_synonyms() {
        let entry = normalize_row(
            &row(json!({
                "mon_hoc": "Giai tich",
                "ghi_chu": "Mang theo may tinh",
                "phong": "B2-301",
                "ngay": "2024-09-05",
            })),
            None,
        );

        assert_eq!(entry.parsed_title.as_deref(), Some("Giai tich"));
        assert_eq!(
            entry.parsed_description.as_deref(),
            Some("Mang theo may tinh")
        );
        assert_eq!(entry.parsed_location.as_deref(), Some("B2-301"));
        assert!(entry.parsed_start_at.is_some());
    }

    #[test]
    fn precedence_prefers_earlier_candidates() {
        // "title" is listed before "subject", so it wins even when both exist.
        let entry = normalize_row(
            &row(json!({"subject": "Loser", "title": "Winner"})),
            None,
        );
        assert_eq!(entry.parsed_title.as_deref(), Some("Winner"));
    }

    #[test]
    fn case_insensitive_fallback() {
        let entry = normalize_row(&row(json!({"Title": "Mixed case"})), None);
        assert_eq!(entry.parsed_title.as_deref(), Some("Mixed case"));
    }

    #[test]
    fn unparseable_date_leaves_null_and_warns() {
        let entry = normalize_row(&row(json!({"title": "A", "start": "someday"})), None);

        assert!(entry.parsed_start_at.is_none());
        assert_eq!(entry.warnings.len(), 1);
        assert!(entry.warnings[0].contains("someday"));
    }

    #[test]
    fn priority_explicit_beats_template_default() {
        let template = ImportTemplate {
            default_priority: Some(2),
            ..Default::default()
        };
        let entry = normalize_row(&row(json!({"priority": "4"})), Some(&template));
        assert_eq!(entry.parsed_priority, 4);
    }

    #[test]
    fn priority_template_default_beats_global() {
        let template = ImportTemplate {
            default_priority: Some(2),
            ..Default::default()
        };
        let entry = normalize_row(&row(json!({"title": "x"})), Some(&template));
        assert_eq!(entry.parsed_priority, 2);
    }

    #[test]
    fn priority_global_default_is_three() {
        let entry = normalize_row(&row(json!({"title": "x"})), None);
        assert_eq!(entry.parsed_priority, 3);
    }

    #[test]
    fn priority_synonyms_map_to_levels() {
        assert_eq!(
            normalize_row(&row(json!({"priority": "urgent"})), None).parsed_priority,
            1
        );
        assert_eq!(
            normalize_row(&row(json!({"uu_tien": "important"})), None).parsed_priority,
            2
        );
        assert_eq!(
            normalize_row(&row(json!({"priority": "minor"})), None).parsed_priority,
            4
        );
    }

    #[test]
    fn numeric_values_are_stringified() {
        let entry = normalize_row(&row(json!({"title": 42, "priority": 2})), None);
        assert_eq!(entry.parsed_title.as_deref(), Some("42"));
        assert_eq!(entry.parsed_priority, 2);
    }
}
