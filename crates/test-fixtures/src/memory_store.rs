//! InMemoryTemporalStore: row history held in memory, with injectable
//! adapter faults.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use flightvault_core::errors::{StoreError, StoreResult};
use flightvault_core::models::{
    AppliedRestore, Record, RecordKey, RestoreBatch, RestoreLogEntry, RestoreOp, RowVersion,
    Snapshot,
};
use flightvault_core::traits::ITemporalStore;

/// Transport failure to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Unavailable,
}

impl Fault {
    fn to_error(self, operation: &str, table: &str) -> StoreError {
        match self {
            Self::Timeout => StoreError::AdapterTimeout {
                operation: operation.to_string(),
                table: table.to_string(),
                elapsed_ms: 0,
            },
            Self::Unavailable => StoreError::AdapterUnavailable {
                operation: operation.to_string(),
                reason: "injected fault".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Version {
    record: Record,
    from: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
}

impl Version {
    fn valid_at(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && self.until.map_or(true, |u| at < u)
    }
}

#[derive(Debug, Clone)]
struct TableHistory {
    key_field: String,
    created_at: DateTime<Utc>,
    rows: BTreeMap<RecordKey, Vec<Version>>,
}

impl TableHistory {
    fn current_mut(&mut self, key: &RecordKey) -> Option<&mut Version> {
        self.rows
            .get_mut(key)
            .and_then(|versions| versions.last_mut())
            .filter(|v| v.until.is_none())
    }

    fn upsert(&mut self, table: &str, key: RecordKey, record: Record, at: DateTime<Utc>) -> StoreResult<bool> {
        let replaced = match self.current_mut(&key) {
            Some(current) => {
                if at < current.from {
                    return Err(conflict(table, &key, "write precedes current version"));
                }
                current.until = Some(at);
                true
            }
            None => false,
        };
        self.rows.entry(key).or_default().push(Version {
            record: record.without_metadata(),
            from: at,
            until: None,
        });
        Ok(replaced)
    }

    fn delete(&mut self, table: &str, key: &RecordKey, at: DateTime<Utc>) -> StoreResult<()> {
        let current = self
            .current_mut(key)
            .ok_or_else(|| conflict(table, key, "row does not exist"))?;
        if at < current.from {
            return Err(conflict(table, key, "write precedes current version"));
        }
        current.until = Some(at);
        Ok(())
    }

    fn rows_at(&self, at: DateTime<Utc>) -> Vec<Record> {
        self.rows
            .values()
            .filter_map(|versions| versions.iter().rev().find(|v| v.valid_at(at)))
            .map(|v| v.record.clone().with_version_start(v.from))
            .collect()
    }

    fn current_rows(&self) -> Vec<Record> {
        self.rows
            .values()
            .filter_map(|versions| versions.last().filter(|v| v.until.is_none()))
            .map(|v| v.record.clone().with_version_start(v.from))
            .collect()
    }
}

fn conflict(table: &str, key: &RecordKey, reason: &str) -> StoreError {
    StoreError::RowConflict {
        table: table.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Default)]
struct Faults {
    /// Remaining calls (any operation) that fail.
    failures_left: AtomicU32,
    kind: Mutex<Option<Fault>>,
    /// Snapshot reads at or after this instant fail.
    snapshots_after: Mutex<Option<(DateTime<Utc>, Fault)>>,
    /// Next apply fails after validating, leaving the store unchanged.
    fail_next_apply: Mutex<Option<Fault>>,
    latency: Mutex<Option<StdDuration>>,
}

/// Temporal store kept in process memory.
///
/// Same semantics as the SQLite store: half-open version intervals, a
/// retention start per table, rejection of future timestamps, and
/// all-or-nothing restore batches.
#[derive(Default)]
pub struct InMemoryTemporalStore {
    tables: RwLock<BTreeMap<String, TableHistory>>,
    log: Mutex<Vec<RestoreLogEntry>>,
    faults: Faults,
    snapshot_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl InMemoryTemporalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_table(&self, table: &str, key_field: &str, created_at: DateTime<Utc>) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables.entry(table.to_string()).or_insert_with(|| TableHistory {
            key_field: key_field.to_string(),
            created_at,
            rows: BTreeMap::new(),
        });
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&mut TableHistory) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let history = tables.get_mut(table).ok_or_else(|| StoreError::UnknownTable {
            table: table.to_string(),
        })?;
        f(history)
    }

    fn key_of(table: &str, key_field: &str, record: &Record) -> StoreResult<RecordKey> {
        record.key(key_field).ok_or_else(|| StoreError::RowConflict {
            table: table.to_string(),
            key: "<none>".to_string(),
            reason: format!("record has no usable identity in {key_field:?}"),
        })
    }

    pub fn insert(&self, table: &str, record: Record, at: DateTime<Utc>) -> StoreResult<()> {
        self.with_table(table, |h| {
            let key = Self::key_of(table, &h.key_field, &record)?;
            if h.current_mut(&key).is_some() {
                return Err(conflict(table, &key, "row already exists"));
            }
            h.upsert(table, key, record, at).map(|_| ())
        })
    }

    /// Insert many rows at one instant, all or nothing.
    pub fn bulk_insert(&self, table: &str, records: Vec<Record>, at: DateTime<Utc>) -> StoreResult<usize> {
        self.with_table(table, |h| {
            let mut staged = h.clone();
            let count = records.len();
            for record in records {
                let key = Self::key_of(table, &staged.key_field, &record)?;
                if staged.current_mut(&key).is_some() {
                    return Err(conflict(table, &key, "row already exists"));
                }
                staged.upsert(table, key, record, at)?;
            }
            *h = staged;
            Ok(count)
        })
    }

    pub fn update(&self, table: &str, record: Record, at: DateTime<Utc>) -> StoreResult<()> {
        self.with_table(table, |h| {
            let key = Self::key_of(table, &h.key_field, &record)?;
            if h.current_mut(&key).is_none() {
                return Err(conflict(table, &key, "row does not exist"));
            }
            h.upsert(table, key, record, at).map(|_| ())
        })
    }

    pub fn delete(&self, table: &str, key: &RecordKey, at: DateTime<Utc>) -> StoreResult<()> {
        self.with_table(table, |h| h.delete(table, key, at))
    }

    pub fn history(&self, table: &str, key: &RecordKey) -> StoreResult<Vec<RowVersion>> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let history = tables.get(table).ok_or_else(|| StoreError::UnknownTable {
            table: table.to_string(),
        })?;
        Ok(history
            .rows
            .get(key)
            .map(|versions| {
                versions
                    .iter()
                    .map(|v| RowVersion {
                        table: table.to_string(),
                        key: key.clone(),
                        data: v.record.clone().with_version_start(v.from),
                        valid_from: v.from,
                        valid_until: v.until,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn restore_log(&self) -> Vec<RestoreLogEntry> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    // ─── Fault injection ─────────────────────────────────────────────────

    /// The next `count` adapter calls fail with `fault`.
    pub fn fail_next(&self, count: u32, fault: Fault) {
        *self.faults.kind.lock().unwrap_or_else(|e| e.into_inner()) = Some(fault);
        self.faults.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every snapshot read at or after `at` fails with `fault`.
    pub fn fail_snapshots_after(&self, at: DateTime<Utc>, fault: Fault) {
        *self.faults.snapshots_after.lock().unwrap_or_else(|e| e.into_inner()) = Some((at, fault));
    }

    /// The next restore batch fails after validation.
    pub fn fail_next_apply(&self, fault: Fault) {
        *self.faults.fail_next_apply.lock().unwrap_or_else(|e| e.into_inner()) = Some(fault);
    }

    /// Every adapter call sleeps this long first.
    pub fn set_latency(&self, latency: StdDuration) {
        *self.faults.latency.lock().unwrap_or_else(|e| e.into_inner()) = Some(latency);
    }

    pub fn clear_faults(&self) {
        self.faults.failures_left.store(0, Ordering::SeqCst);
        *self.faults.snapshots_after.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.faults.fail_next_apply.lock().unwrap_or_else(|e| e.into_inner()) = None;
        *self.faults.latency.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    fn before_call(&self, operation: &str, table: &str) -> StoreResult<()> {
        let latency = *self.faults.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }
        let left = self.faults.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.faults.failures_left.store(left - 1, Ordering::SeqCst);
            let kind = *self.faults.kind.lock().unwrap_or_else(|e| e.into_inner());
            let fault = kind.unwrap_or(Fault::Unavailable);
            tracing::debug!(operation, table, ?fault, "injecting adapter fault");
            return Err(fault.to_error(operation, table));
        }
        Ok(())
    }
}

impl ITemporalStore for InMemoryTemporalStore {
    fn snapshot_at(&self, table: &str, key_field: &str, at: DateTime<Utc>) -> StoreResult<Snapshot> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call("snapshot_at", table)?;
        let after = *self.faults.snapshots_after.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((from, fault)) = after {
            if at >= from {
                return Err(fault.to_error("snapshot_at", table));
            }
        }

        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let history = tables.get(table).ok_or_else(|| StoreError::UnknownTable {
            table: table.to_string(),
        })?;
        if at > Utc::now() {
            return Err(StoreError::NoSuchTimestamp {
                table: table.to_string(),
                at,
            });
        }
        if at < history.created_at {
            return Err(StoreError::OutOfRetentionWindow {
                table: table.to_string(),
                at,
                retained_from: history.created_at,
            });
        }
        Snapshot::new(table, key_field, at, history.rows_at(at)).map_err(|e| StoreError::CorruptRow {
            table: table.to_string(),
            reason: e.to_string(),
        })
    }

    fn current(&self, table: &str, key_field: &str) -> StoreResult<Snapshot> {
        self.before_call("current", table)?;
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let history = tables.get(table).ok_or_else(|| StoreError::UnknownTable {
            table: table.to_string(),
        })?;
        Snapshot::new(table, key_field, Utc::now(), history.current_rows()).map_err(|e| {
            StoreError::CorruptRow {
                table: table.to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn apply_restore(&self, batch: &RestoreBatch) -> StoreResult<AppliedRestore> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call("apply_restore", &batch.table)?;
        let table = batch.table.as_str();

        self.with_table(table, |h| {
            if h.key_field != batch.key_field {
                return Err(StoreError::InvalidRestore {
                    table: table.to_string(),
                    reason: format!(
                        "batch keyed by {:?}, table keyed by {:?}",
                        batch.key_field, h.key_field
                    ),
                });
            }

            let mut staged = h.clone();
            let (mut inserted, mut updated, mut deleted) = (0, 0, 0);
            for (index, op) in batch.ops.iter().enumerate() {
                let result = match op {
                    RestoreOp::Upsert(record) => Self::key_of(table, &batch.key_field, record)
                        .and_then(|key| staged.upsert(table, key, record.clone(), batch.applied_at))
                        .map(|replaced| {
                            if replaced {
                                updated += 1;
                            } else {
                                inserted += 1;
                            }
                        }),
                    RestoreOp::Delete(key) => staged
                        .delete(table, key, batch.applied_at)
                        .map(|()| deleted += 1),
                };
                if let Err(e) = result {
                    return Err(StoreError::InvalidRestore {
                        table: table.to_string(),
                        reason: format!("op {index}: {e}"),
                    });
                }
            }

            let injected = self
                .faults
                .fail_next_apply
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(fault) = injected {
                return Err(fault.to_error("apply_restore", table));
            }

            *h = staged;
            let record_count = h.current_rows().len();
            self.log
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(RestoreLogEntry {
                    operation_id: batch.operation_id,
                    table: table.to_string(),
                    target_as_of: batch.target_as_of,
                    applied_at: batch.applied_at,
                    inserted,
                    updated,
                    deleted,
                });
            Ok(AppliedRestore {
                operation_id: batch.operation_id,
                table: table.to_string(),
                applied_at: batch.applied_at,
                inserted,
                updated,
                deleted,
                record_count,
            })
        })
    }
}
