//! ITemporalStore: the adapter boundary between the engine and a
//! system-versioned table store.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::StoreResult;
use crate::models::{AppliedRestore, RestoreBatch, Snapshot};

/// A store that can answer "what did this table look like at T".
///
/// Calls are blocking. Implementations report a missing or expired point in
/// time as `NoSuchTimestamp` / `OutOfRetentionWindow`, and transport
/// failures as `AdapterTimeout` / `AdapterUnavailable`.
pub trait ITemporalStore: Send + Sync {
    /// Full row set of `table` as of `at`, keyed by `key_field`.
    fn snapshot_at(&self, table: &str, key_field: &str, at: DateTime<Utc>) -> StoreResult<Snapshot>;

    /// Present state of `table`.
    fn current(&self, table: &str, key_field: &str) -> StoreResult<Snapshot>;

    /// Apply every op of `batch` atomically. On error the store is unchanged.
    fn apply_restore(&self, batch: &RestoreBatch) -> StoreResult<AppliedRestore>;
}

impl<T: ITemporalStore + ?Sized> ITemporalStore for Arc<T> {
    fn snapshot_at(&self, table: &str, key_field: &str, at: DateTime<Utc>) -> StoreResult<Snapshot> {
        (**self).snapshot_at(table, key_field, at)
    }

    fn current(&self, table: &str, key_field: &str) -> StoreResult<Snapshot> {
        (**self).current(table, key_field)
    }

    fn apply_restore(&self, batch: &RestoreBatch) -> StoreResult<AppliedRestore> {
        (**self).apply_restore(batch)
    }
}
