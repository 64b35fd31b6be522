//! REDCap API response models
//!
//! Wire shapes for the subset of the REDCap API Ferry uses. REDCap is loose
//! with scalar types (flags arrive as `0`/`1` numbers, strings or booleans
//! depending on version), so the flag fields deserialize through a
//! tolerant helper.

use serde::{Deserialize, Deserializer};

/// Project attributes from `content=project`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectInfo {
    pub project_id: i64,

    pub project_title: String,

    #[serde(deserialize_with = "flag_from_any")]
    pub is_longitudinal: bool,

    #[serde(default, deserialize_with = "flag_from_any")]
    pub has_repeating_instruments_or_events: bool,
}

/// One field entry of the data dictionary from `content=metadata`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldMetadata {
    pub field_name: String,

    pub form_name: String,

    #[serde(default)]
    pub field_type: String,

    #[serde(default)]
    pub field_label: String,
}

/// One entry of the instrument listing from `content=instrument`
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentEntry {
    pub instrument_name: String,

    #[serde(default)]
    pub instrument_label: String,
}

/// Import response from `content=record action=import`
#[derive(Debug, Clone, Deserialize)]
pub struct ImportResponse {
    pub count: usize,
}

/// One export field-name mapping from `content=exportFieldNames`
#[derive(Debug, Clone, Deserialize)]
pub struct ExportFieldName {
    #[serde(default)]
    pub original_field_name: String,

    pub export_field_name: String,
}

/// Accept a boolean flag encoded as bool, integer or string
fn flag_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Str(s) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
    })
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            project_id: 0,
            project_title: String::new(),
            is_longitudinal: false,
            has_repeating_instruments_or_events: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_info_with_integer_flags() {
        let json = r#"{
            "project_id": 142,
            "project_title": "ADRC Longitudinal Cohort",
            "is_longitudinal": 1,
            "has_repeating_instruments_or_events": 0
        }"#;

        let info: ProjectInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.project_id, 142);
        assert!(info.is_longitudinal);
        assert!(!info.has_repeating_instruments_or_events);
    }

    #[test]
    fn test_project_info_with_string_flags() {
        let json = r#"{
            "project_id": 7,
            "project_title": "Pilot",
            "is_longitudinal": "0"
        }"#;

        let info: ProjectInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_longitudinal);
    }

    #[test]
    fn test_field_metadata_defaults() {
        let json = r#"[{"field_name": "record_id", "form_name": "demographics"}]"#;
        let fields: Vec<FieldMetadata> = serde_json::from_str(json).unwrap();
        assert_eq!(fields[0].field_name, "record_id");
        assert_eq!(fields[0].field_type, "");
    }

    #[test]
    fn test_import_response() {
        let response: ImportResponse = serde_json::from_str(r#"{"count": 42}"#).unwrap();
        assert_eq!(response.count, 42);
    }

    #[test]
    fn test_export_field_name() {
        let json = r#"[{"original_field_name": "record_id", "choice_value": "", "export_field_name": "record_id"}]"#;
        let fields: Vec<ExportFieldName> = serde_json::from_str(json).unwrap();
        assert_eq!(fields[0].export_field_name, "record_id");
    }
}
