//! SQL for the row history, snapshots, and the restore log.
//!
//! Row identities and field maps are stored as JSON text; timestamps use
//! the fixed-width exchange format so string comparison is chronological.

pub mod restore_ops;
pub mod snapshot_ops;
pub mod version_ops;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use flightvault_core::errors::{StoreError, StoreResult};
use flightvault_core::models::{FieldValue, Record, RecordKey};

pub(crate) fn encode_key(table: &str, key: &RecordKey) -> StoreResult<String> {
    serde_json::to_string(key).map_err(|e| StoreError::CorruptRow {
        table: table.to_string(),
        reason: format!("encode key {key}: {e}"),
    })
}

pub(crate) fn decode_key(table: &str, raw: &str) -> StoreResult<RecordKey> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table: table.to_string(),
        reason: format!("decode key {raw}: {e}"),
    })
}

pub(crate) fn encode_fields(table: &str, record: &Record) -> StoreResult<String> {
    serde_json::to_string(&record.fields).map_err(|e| StoreError::CorruptRow {
        table: table.to_string(),
        reason: format!("encode fields: {e}"),
    })
}

/// Rebuild a record from its stored field map and version start.
pub(crate) fn decode_record(table: &str, raw: &str, valid_from: DateTime<Utc>) -> StoreResult<Record> {
    let fields: BTreeMap<String, FieldValue> =
        serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
            table: table.to_string(),
            reason: format!("decode fields: {e}"),
        })?;
    Ok(Record {
        fields,
        version_start: Some(valid_from),
    })
}

pub(crate) fn parse_ts(table: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table: table.to_string(),
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}
