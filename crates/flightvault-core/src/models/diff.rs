//! Snapshot diff types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::Record;
use super::value::{FieldValue, RecordKey};

/// A record with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRecord {
    pub key: RecordKey,
    pub record: Record,
}

/// One changed field: (name, before, after).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: FieldValue,
    pub after: FieldValue,
}

/// A record present in both snapshots with at least one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedRecord {
    pub key: RecordKey,
    pub before: Record,
    pub after: Record,
    pub changes: Vec<FieldChange>,
}

impl ModifiedRecord {
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.field.as_str())
    }
}

/// Where an identity landed in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffClass {
    Added,
    Deleted,
    Modified,
    Unchanged,
}

/// Summary statistics for a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub count_before: usize,
    pub count_after: usize,
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// added + deleted + modified
    pub total_changes: usize,
    /// count_after - count_before
    pub net_change: i64,
}

/// Result of comparing an earlier snapshot to a later one.
///
/// `added`, `deleted`, and `modified` are disjoint and ordered by identity;
/// together with `unchanged` they cover every identity of both snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub table: String,
    pub earlier_as_of: DateTime<Utc>,
    pub later_as_of: DateTime<Utc>,
    /// Present in later, absent in earlier.
    pub added: Vec<KeyedRecord>,
    /// Present in earlier, absent in later.
    pub deleted: Vec<KeyedRecord>,
    pub modified: Vec<ModifiedRecord>,
    pub unchanged: Vec<RecordKey>,
    pub summary: DiffSummary,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    pub fn added_keys(&self) -> BTreeSet<RecordKey> {
        self.added.iter().map(|r| r.key.clone()).collect()
    }

    pub fn deleted_keys(&self) -> BTreeSet<RecordKey> {
        self.deleted.iter().map(|r| r.key.clone()).collect()
    }

    pub fn modified_keys(&self) -> BTreeSet<RecordKey> {
        self.modified.iter().map(|m| m.key.clone()).collect()
    }

    /// Classification of one identity, or `None` if it is in neither snapshot.
    pub fn class_of(&self, key: &RecordKey) -> Option<DiffClass> {
        if self.added.iter().any(|r| &r.key == key) {
            Some(DiffClass::Added)
        } else if self.deleted.iter().any(|r| &r.key == key) {
            Some(DiffClass::Deleted)
        } else if self.modified.iter().any(|m| &m.key == key) {
            Some(DiffClass::Modified)
        } else if self.unchanged.binary_search(key).is_ok() {
            Some(DiffClass::Unchanged)
        } else {
            None
        }
    }
}
