//! A single row: field name to scalar value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::{FieldValue, RecordKey};

/// A row of a table at one instant.
///
/// `version_start` is store metadata (when this row version became current)
/// and never takes part in comparisons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_start: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_version_start(mut self, at: DateTime<Utc>) -> Self {
        self.version_start = Some(at);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field value, treating an absent field as NULL.
    pub fn value(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&FieldValue::Null)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Identity of this record under the given key field.
    pub fn key(&self, key_field: &str) -> Option<RecordKey> {
        self.fields.get(key_field).and_then(FieldValue::to_key)
    }

    /// Same fields, without store metadata.
    pub fn without_metadata(&self) -> Record {
        Record {
            fields: self.fields.clone(),
            version_start: None,
        }
    }
}
