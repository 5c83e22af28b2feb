//! SqliteTemporalStore: a system-versioned table store over `row_versions`.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use flightvault_core::config::StorageConfig;
use flightvault_core::errors::{StoreError, StoreResult};
use flightvault_core::models::{
    AppliedRestore, Record, RecordKey, RestoreBatch, RestoreLogEntry, RowVersion, Snapshot,
};
use flightvault_core::traits::ITemporalStore;

use crate::pool::ConnectionPool;
use crate::queries::{restore_ops, snapshot_ops, version_ops};
use crate::to_store_err;

/// SQLite-backed temporal store.
///
/// Every write carries an explicit timestamp and closes the previous
/// version of the row, so any past state within retention can be read back.
pub struct SqliteTemporalStore {
    pool: ConnectionPool,
    retention: Option<Duration>,
}

impl SqliteTemporalStore {
    pub fn open(path: &Path, config: &StorageConfig) -> StoreResult<Self> {
        let pool = ConnectionPool::open(path, config.read_pool_size)?;
        info!(path = %path.display(), readers = pool.reader_count(), "temporal store opened");
        Ok(Self {
            pool,
            retention: None,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            pool: ConnectionPool::open_in_memory()?,
            retention: None,
        })
    }

    /// File-backed when `db_path` is set, in-memory otherwise.
    pub fn from_config(config: &StorageConfig) -> StoreResult<Self> {
        match &config.db_path {
            Some(path) => Self::open(Path::new(path), config),
            None => Self::open_in_memory(),
        }
    }

    /// Only states younger than `retention` can be read.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Start tracking a table. Its history begins at `created_at`.
    pub fn register_table(&self, table: &str, key_field: &str, created_at: DateTime<Utc>) -> StoreResult<()> {
        self.pool
            .with_writer(|conn| version_ops::register_table(conn, table, key_field, created_at))
    }

    pub fn insert(&self, table: &str, record: &Record, at: DateTime<Utc>) -> StoreResult<()> {
        self.pool.with_writer(|conn| {
            let info = version_ops::require_table(conn, table)?;
            let key = identity(table, &info.key_field, record)?;
            version_ops::insert_row(conn, table, &key, record, at)
        })
    }

    /// Insert many rows at one instant, all or nothing.
    pub fn bulk_insert(&self, table: &str, records: &[Record], at: DateTime<Utc>) -> StoreResult<usize> {
        self.pool.with_writer(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_store_err("bulk_insert", table, e))?;
            let info = version_ops::require_table(&tx, table)?;
            for record in records {
                let key = identity(table, &info.key_field, record)?;
                version_ops::insert_row(&tx, table, &key, record, at)?;
            }
            tx.commit().map_err(|e| to_store_err("bulk_insert", table, e))?;
            debug!(table, rows = records.len(), "bulk insert committed");
            Ok(records.len())
        })
    }

    pub fn update(&self, table: &str, record: &Record, at: DateTime<Utc>) -> StoreResult<()> {
        self.pool.with_writer(|conn| {
            let info = version_ops::require_table(conn, table)?;
            let key = identity(table, &info.key_field, record)?;
            version_ops::update_row(conn, table, &key, record, at)
        })
    }

    pub fn delete(&self, table: &str, key: &RecordKey, at: DateTime<Utc>) -> StoreResult<()> {
        self.pool.with_writer(|conn| {
            version_ops::require_table(conn, table)?;
            version_ops::delete_row(conn, table, key, at)
        })
    }

    /// Every version of one row, oldest first.
    pub fn history(&self, table: &str, key: &RecordKey) -> StoreResult<Vec<RowVersion>> {
        self.pool.with_reader(|conn| {
            version_ops::require_table(conn, table)?;
            version_ops::history(conn, table, key)
        })
    }

    /// Executed restores of one table, oldest first.
    pub fn restore_log(&self, table: &str) -> StoreResult<Vec<RestoreLogEntry>> {
        self.pool.with_reader(|conn| restore_ops::list_log(conn, table))
    }

    fn retained_from(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.retention {
            Some(retention) => created_at.max(now - retention),
            None => created_at,
        }
    }
}

fn identity(table: &str, key_field: &str, record: &Record) -> StoreResult<RecordKey> {
    record.key(key_field).ok_or_else(|| StoreError::RowConflict {
        table: table.to_string(),
        key: "<none>".to_string(),
        reason: format!("record has no usable identity in {key_field:?}"),
    })
}

fn build_snapshot(
    table: &str,
    key_field: &str,
    at: DateTime<Utc>,
    records: Vec<Record>,
) -> StoreResult<Snapshot> {
    Snapshot::new(table, key_field, at, records).map_err(|e| StoreError::CorruptRow {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

impl ITemporalStore for SqliteTemporalStore {
    #[instrument(level = "debug", skip(self), fields(rows = tracing::field::Empty))]
    fn snapshot_at(&self, table: &str, key_field: &str, at: DateTime<Utc>) -> StoreResult<Snapshot> {
        self.pool.with_reader(|conn| {
            let info = version_ops::require_table(conn, table)?;
            let now = Utc::now();
            if at > now {
                return Err(StoreError::NoSuchTimestamp {
                    table: table.to_string(),
                    at,
                });
            }
            let retained_from = self.retained_from(info.created_at, now);
            if at < retained_from {
                return Err(StoreError::OutOfRetentionWindow {
                    table: table.to_string(),
                    at,
                    retained_from,
                });
            }
            let records = snapshot_ops::rows_at(conn, table, at)?;
            tracing::Span::current().record("rows", records.len());
            build_snapshot(table, key_field, at, records)
        })
    }

    fn current(&self, table: &str, key_field: &str) -> StoreResult<Snapshot> {
        self.pool.with_reader(|conn| {
            version_ops::require_table(conn, table)?;
            let records = snapshot_ops::current_rows(conn, table)?;
            build_snapshot(table, key_field, Utc::now(), records)
        })
    }

    #[instrument(level = "info", skip(self, batch), fields(table = %batch.table, ops = batch.ops.len()))]
    fn apply_restore(&self, batch: &RestoreBatch) -> StoreResult<AppliedRestore> {
        self.pool.with_writer(|conn| restore_ops::apply_batch(conn, batch))
    }
}
