//! Common types used across the survey workspace

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Reserved field name for the submitter's derived origin address.
///
/// Always written by the server at ingestion time, overwriting any
/// client-supplied value of the same name so the form body cannot spoof it.
pub const IP_ADDRESS_FIELD: &str = "ip_address";

/// One normalized survey submission: a flat string-to-string field mapping.
///
/// Records are schema-less at ingestion time. Duplicate field names keep
/// their first submitted value; see [`Record::insert_first`]. Serializes as
/// a plain JSON object, which is also the on-disk document format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field only if no field of that name exists yet.
    ///
    /// Returns `true` if the value was inserted. This is the first-value-wins
    /// policy applied to duplicate form fields: determinism over completeness.
    pub fn insert_first(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.fields.entry(name.into()) {
            Entry::Vacant(entry) => {
                entry.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Insert a field, overwriting any existing value of that name.
    ///
    /// Used for server-derived fields such as [`IP_ADDRESS_FIELD`].
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Iterate over the field names of this record
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields in this record
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the pretty-printed JSON document format used on disk
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a record from a stored JSON document
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl FromIterator<(String, String)> for Record {
    /// Builds a record from ordered pairs with first-value-wins semantics.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert_first(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_first_keeps_first_value() {
        let mut record = Record::new();
        assert!(record.insert_first("field1", "value1"));
        assert!(!record.insert_first("field1", "value2"));
        assert_eq!(record.get("field1"), Some("value1"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let mut record = Record::new();
        record.insert_first(IP_ADDRESS_FIELD, "6.6.6.6");
        record.set(IP_ADDRESS_FIELD, "203.0.113.5");
        assert_eq!(record.get(IP_ADDRESS_FIELD), Some("203.0.113.5"));
    }

    #[test]
    fn test_from_iter_first_wins() {
        let record: Record = vec![
            ("field1".to_string(), "value1".to_string()),
            ("field1".to_string(), "value2".to_string()),
            ("gender".to_string(), "F".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.get("field1"), Some("value1"));
        assert_eq!(record.get("gender"), Some("F"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_json_round_trip() {
        let mut record = Record::new();
        record.set("gender", "F");
        record.set("age", "22");

        let bytes = record.to_json_pretty().unwrap();
        let parsed = Record::from_json_slice(&bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_from_json_slice_rejects_non_object() {
        assert!(Record::from_json_slice(b"[1, 2, 3]").is_err());
        assert!(Record::from_json_slice(b"{\"truncated\": ").is_err());
    }

    #[test]
    fn test_field_names_are_sorted() {
        let mut record = Record::new();
        record.set("zeta", "1");
        record.set("alpha", "2");
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
