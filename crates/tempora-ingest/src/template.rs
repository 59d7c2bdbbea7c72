//! Import templates: field renaming and per-template defaults.
//!
//! Template CRUD lives outside this crate; a template arrives as plain data
//! alongside the import payload.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// A saved import template: maps source field names to canonical names and
/// carries per-template defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportTemplate {
    pub id: Option<Uuid>,
    pub name: String,
    /// original field name → canonical field name
    pub field_mappings: HashMap<String, String>,
    pub default_priority: Option<i16>,
    pub profession_id: Option<Uuid>,
}

impl ImportTemplate {
    /// Rename mapped keys to their canonical names, preserving every
    /// unmapped key. A mapped value overwrites an existing value under the
    /// canonical name; renaming is otherwise non-destructive.
    pub fn apply_mapping(&self, data: &mut Map<String, JsonValue>) {
        for (from, to) in &self.field_mappings {
            if from == to {
                continue;
            }
            if let Some(value) = data.remove(from) {
                data.insert(to.clone(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(mappings: &[(&str, &str)]) -> ImportTemplate {
        ImportTemplate {
            field_mappings: mappings
                .iter()
                .map(|(f, t)| (f.to_string(), t.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn renames_mapped_keys() {
        let tpl = template(&[("subject_name", "title")]);
        let mut data = Map::new();
        data.insert("subject_name".into(), json!("Math"));

        tpl.apply_mapping(&mut data);

        assert_eq!(data.get("title"), Some(&json!("Math")));
        assert!(!data.contains_key("subject_name"));
    }

    #[test]
    fn preserves_unmapped_keys() {
        let tpl = template(&[("subject_name", "title")]);
        let mut data = Map::new();
        data.insert("subject_name".into(), json!("Math"));
        data.insert("teacher".into(), json!("Ms. Lan"));

        tpl.apply_mapping(&mut data);

        assert_eq!(data.get("teacher"), Some(&json!("Ms. Lan")));
    }

    #[test]
    fn missing_source_key_is_a_no_op() {
        let tpl = template(&[("absent", "title")]);
        let mut data = Map::new();
        data.insert("other".into(), json!(1));

        tpl.apply_mapping(&mut data);

        assert!(!data.contains_key("title"));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn identity_mapping_keeps_value() {
        let tpl = template(&[("title", "title")]);
        let mut data = Map::new();
        data.insert("title".into(), json!("Kept"));

        tpl.apply_mapping(&mut data);

        assert_eq!(data.get("title"), Some(&json!("Kept")));
    }
}
