//! Immutable point-in-time row sets.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::record::Record;
use super::value::RecordKey;
use crate::errors::{FlightVaultResult, RecoveryError};

/// The full row set of one table as of one instant, ordered by identity.
///
/// Constructed once from adapter output and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    table: String,
    key_field: String,
    as_of: DateTime<Utc>,
    records: BTreeMap<RecordKey, Record>,
}

impl Snapshot {
    /// Build a snapshot, validating that every record carries a unique,
    /// non-null identity.
    pub fn new(
        table: impl Into<String>,
        key_field: impl Into<String>,
        as_of: DateTime<Utc>,
        records: impl IntoIterator<Item = Record>,
    ) -> FlightVaultResult<Self> {
        let table = table.into();
        let key_field = key_field.into();
        let mut map = BTreeMap::new();

        for record in records {
            let key = record.key(&key_field).ok_or_else(|| RecoveryError::InvalidRecord {
                table: table.clone(),
                reason: format!("record has no usable identity in field {key_field:?}"),
            })?;
            if map.contains_key(&key) {
                return Err(RecoveryError::DuplicateKey {
                    table: table.clone(),
                    key: key.to_string(),
                }
                .into());
            }
            map.insert(key, record);
        }

        Ok(Self {
            table,
            key_field,
            as_of,
            records: map,
        })
    }

    /// An empty snapshot (table existed but held no rows).
    pub fn empty(table: impl Into<String>, key_field: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            table: table.into(),
            key_field: key_field.into(),
            as_of,
            records: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &Record)> {
        self.records.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Union of field names across all records.
    pub fn field_names(&self) -> BTreeSet<String> {
        self.records
            .values()
            .flat_map(|r| r.fields.keys().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_ordered_by_identity() {
        let snap = Snapshot::new(
            "airports",
            "airport_id",
            Utc::now(),
            vec![
                Record::new().with("airport_id", 3).with("name", "C"),
                Record::new().with("airport_id", 1).with("name", "A"),
                Record::new().with("airport_id", 2).with("name", "B"),
            ],
        )
        .unwrap();
        let keys: Vec<_> = snap.keys().cloned().collect();
        assert_eq!(keys, vec![RecordKey::Int(1), RecordKey::Int(2), RecordKey::Int(3)]);
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let result = Snapshot::new(
            "airports",
            "airport_id",
            Utc::now(),
            vec![
                Record::new().with("airport_id", 1),
                Record::new().with("airport_id", 1),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_identity_is_rejected() {
        let result = Snapshot::new(
            "airports",
            "airport_id",
            Utc::now(),
            vec![Record::new().with("name", "nameless")],
        );
        assert!(result.is_err());
    }
}
