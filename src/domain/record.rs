//! Record model
//!
//! A [`Record`] is the unit of transfer and validation: one form instance
//! for one record id (and one event in longitudinal projects), holding the
//! raw string values as they came off the wire. Field order is preserved
//! from the wire so violation reporting is deterministic.

use crate::domain::ids::{EventName, FormName, RecordId};
use serde_json::{Map, Value};

/// REDCap bookkeeping field carrying the event name in longitudinal exports
pub const EVENT_FIELD: &str = "redcap_event_name";

/// REDCap bookkeeping fields that are part of the export envelope rather
/// than the form data; these never participate in rule evaluation.
const BOOKKEEPING_FIELDS: &[&str] = &[
    EVENT_FIELD,
    "redcap_repeat_instrument",
    "redcap_repeat_instance",
    "redcap_data_access_group",
];

/// One form instance fetched from the source project
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    form: FormName,
    event: Option<EventName>,
    // (variable, raw value) in wire order
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record
    pub fn new(id: RecordId, form: FormName, event: Option<EventName>) -> Self {
        Self {
            id,
            form,
            event,
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving insertion order (builder style)
    pub fn with_field(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((variable.into(), value.into()));
        self
    }

    /// The source-assigned record identifier
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// The form this instance belongs to
    pub fn form(&self) -> &FormName {
        &self.form
    }

    /// The event this instance was collected under, if longitudinal
    pub fn event(&self) -> Option<&EventName> {
        self.event.as_ref()
    }

    /// Look up a field value by variable name
    pub fn value(&self, variable: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate fields in wire order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of data fields (bookkeeping fields excluded)
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Build a record from one wire row of a flat REDCap record export
    ///
    /// The primary key field becomes the record id, `redcap_event_name`
    /// (when present and non-empty) becomes the event, and the remaining
    /// bookkeeping fields are dropped. All values are carried as raw
    /// strings; REDCap exports numbers as strings but a JSON number in the
    /// row is stringified rather than rejected.
    pub fn from_wire(
        row: &Map<String, Value>,
        primary_key: &str,
        form: &FormName,
    ) -> Result<Self, String> {
        let id_value = row
            .get(primary_key)
            .map(value_to_string)
            .unwrap_or_default();
        let id = RecordId::new(id_value)
            .map_err(|_| format!("record row is missing primary key field '{primary_key}'"))?;

        let event = match row.get(EVENT_FIELD) {
            Some(value) => {
                let name = value_to_string(value);
                if name.is_empty() {
                    None
                } else {
                    Some(EventName::new(name)?)
                }
            }
            None => None,
        };

        let mut record = Record::new(id, form.clone(), event);
        for (name, value) in row {
            if name == primary_key || BOOKKEEPING_FIELDS.contains(&name.as_str()) {
                continue;
            }
            record.fields.push((name.clone(), value_to_string(value)));
        }

        Ok(record)
    }

    /// Serialize the record back to a wire row for import
    pub fn to_wire(&self, primary_key: &str) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert(
            primary_key.to_string(),
            Value::String(self.id.as_str().to_string()),
        );
        if let Some(event) = &self.event {
            row.insert(
                EVENT_FIELD.to_string(),
                Value::String(event.as_str().to_string()),
            );
        }
        for (name, value) in &self.fields {
            row.insert(name.clone(), Value::String(value.clone()));
        }
        row
    }
}

/// Render a wire value as the raw string REDCap semantics expect
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn demographics() -> FormName {
        FormName::from_str("demographics").unwrap()
    }

    fn wire_row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_wire_basic() {
        let row = wire_row(&[
            ("record_id", Value::String("17".into())),
            ("age", Value::String("45".into())),
            ("sex", Value::String("F".into())),
        ]);

        let record = Record::from_wire(&row, "record_id", &demographics()).unwrap();
        assert_eq!(record.id().as_str(), "17");
        assert_eq!(record.value("age"), Some("45"));
        assert_eq!(record.value("sex"), Some("F"));
        assert!(record.event().is_none());
        assert_eq!(record.field_count(), 2);
    }

    #[test]
    fn test_from_wire_preserves_field_order() {
        let row = wire_row(&[
            ("record_id", Value::String("1".into())),
            ("zeta", Value::String("z".into())),
            ("alpha", Value::String("a".into())),
            ("mid", Value::String("m".into())),
        ]);

        let record = Record::from_wire(&row, "record_id", &demographics()).unwrap();
        let names: Vec<&str> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_from_wire_extracts_event_and_drops_bookkeeping() {
        let row = wire_row(&[
            ("record_id", Value::String("9".into())),
            ("redcap_event_name", Value::String("visit_1_arm_1".into())),
            ("redcap_repeat_instance", Value::String("2".into())),
            ("weight", Value::String("70".into())),
        ]);

        let record = Record::from_wire(&row, "record_id", &demographics()).unwrap();
        assert_eq!(record.event().unwrap().as_str(), "visit_1_arm_1");
        assert_eq!(record.field_count(), 1);
        assert!(record.value("redcap_repeat_instance").is_none());
    }

    #[test]
    fn test_from_wire_missing_primary_key() {
        let row = wire_row(&[("age", Value::String("45".into()))]);
        let result = Record::from_wire(&row, "record_id", &demographics());
        assert!(result.is_err());
    }

    #[test]
    fn test_from_wire_stringifies_numbers_and_nulls() {
        let row = wire_row(&[
            ("record_id", Value::Number(3.into())),
            ("age", Value::Number(45.into())),
            ("notes", Value::Null),
        ]);

        let record = Record::from_wire(&row, "record_id", &demographics()).unwrap();
        assert_eq!(record.id().as_str(), "3");
        assert_eq!(record.value("age"), Some("45"));
        assert_eq!(record.value("notes"), Some(""));
    }

    #[test]
    fn test_to_wire_round_trip() {
        let record = Record::new(
            RecordId::new("22").unwrap(),
            demographics(),
            Some(EventName::new("visit_2_arm_1").unwrap()),
        )
        .with_field("age", "61")
        .with_field("sex", "M");

        let row = record.to_wire("record_id");
        assert_eq!(row.get("record_id"), Some(&Value::String("22".into())));
        assert_eq!(
            row.get("redcap_event_name"),
            Some(&Value::String("visit_2_arm_1".into()))
        );

        let parsed = Record::from_wire(&row, "record_id", &demographics()).unwrap();
        assert_eq!(parsed, record);
    }
}
