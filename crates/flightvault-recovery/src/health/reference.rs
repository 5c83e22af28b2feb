//! Key sets of referenced tables, for referential integrity checks.

use std::collections::{HashMap, HashSet};

use flightvault_core::models::{RecordKey, Snapshot};

/// Values present in `(table, field)` of each referenced table's current
/// state.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    keys: HashMap<(String, String), HashSet<RecordKey>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the values of `field` across `snapshot`.
    pub fn index_snapshot(&mut self, snapshot: &Snapshot, field: &str) {
        let values = field_keys(snapshot, field);
        self.keys
            .insert((snapshot.table().to_string(), field.to_string()), values);
    }

    pub fn insert(&mut self, table: &str, field: &str, keys: impl IntoIterator<Item = RecordKey>) {
        self.keys
            .entry((table.to_string(), field.to_string()))
            .or_default()
            .extend(keys);
    }

    pub fn is_indexed(&self, table: &str, field: &str) -> bool {
        self.keys.contains_key(&(table.to_string(), field.to_string()))
    }

    /// `None` when the target is not indexed.
    pub fn contains(&self, table: &str, field: &str, key: &RecordKey) -> Option<bool> {
        self.keys
            .get(&(table.to_string(), field.to_string()))
            .map(|set| set.contains(key))
    }

    pub fn keys(&self, table: &str, field: &str) -> Option<&HashSet<RecordKey>> {
        self.keys.get(&(table.to_string(), field.to_string()))
    }
}

/// Identity view of every non-null value of `field` in `snapshot`.
pub fn field_keys(snapshot: &Snapshot, field: &str) -> HashSet<RecordKey> {
    if field == snapshot.key_field() {
        return snapshot.keys().cloned().collect();
    }
    snapshot
        .records()
        .filter_map(|r| r.value(field).to_key())
        .collect()
}
