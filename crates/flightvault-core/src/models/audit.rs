//! Change history read back from a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::Record;
use super::value::RecordKey;

/// One historical version of a row, valid over `[valid_from, valid_until)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowVersion {
    pub table: String,
    pub key: RecordKey,
    pub data: Record,
    pub valid_from: DateTime<Utc>,
    /// `None` while the version is current. A closed version with no
    /// successor marks a delete.
    pub valid_until: Option<DateTime<Utc>>,
}

impl RowVersion {
    pub fn is_current(&self) -> bool {
        self.valid_until.is_none()
    }

    pub fn valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| at < until)
    }
}

/// One executed restore, as recorded in the store's restore log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreLogEntry {
    pub operation_id: Uuid,
    pub table: String,
    pub target_as_of: DateTime<Utc>,
    pub applied_at: DateTime<Utc>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}
