//! Atomic restore batches and the restore log.

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use flightvault_core::errors::{StoreError, StoreResult};
use flightvault_core::models::{AppliedRestore, RestoreBatch, RestoreLogEntry, RestoreOp};
use flightvault_core::time::format_timestamp;

use super::{parse_ts, snapshot_ops, version_ops};
use crate::to_store_err;

/// Apply every op of a batch in one transaction. Any failing op rolls the
/// whole batch back.
pub fn apply_batch(conn: &Connection, batch: &RestoreBatch) -> StoreResult<AppliedRestore> {
    let table = batch.table.as_str();
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_store_err("apply_restore", table, e))?;

    let info = version_ops::require_table(&tx, table)?;
    if info.key_field != batch.key_field {
        return Err(StoreError::InvalidRestore {
            table: table.to_string(),
            reason: format!(
                "batch keyed by {:?}, table keyed by {:?}",
                batch.key_field, info.key_field
            ),
        });
    }

    let (mut inserted, mut updated, mut deleted) = (0, 0, 0);
    for (index, op) in batch.ops.iter().enumerate() {
        let outcome = match op {
            RestoreOp::Upsert(record) => {
                let key = record.key(&batch.key_field).ok_or_else(|| StoreError::InvalidRestore {
                    table: table.to_string(),
                    reason: format!("op {index}: record has no identity in {:?}", batch.key_field),
                })?;
                version_ops::upsert_row(&tx, table, &key, record, batch.applied_at).map(|replaced| {
                    if replaced {
                        updated += 1;
                    } else {
                        inserted += 1;
                    }
                })
            }
            RestoreOp::Delete(key) => {
                version_ops::delete_row(&tx, table, key, batch.applied_at).map(|()| deleted += 1)
            }
        };
        if let Err(e) = outcome {
            warn!(table, op = index, error = %e, "restore op failed, rolling back batch");
            return Err(match e {
                StoreError::RowConflict { key, reason, .. } => StoreError::InvalidRestore {
                    table: table.to_string(),
                    reason: format!("op {index} on row {key}: {reason}"),
                },
                other => other,
            });
        }
    }

    let entry = RestoreLogEntry {
        operation_id: batch.operation_id,
        table: table.to_string(),
        target_as_of: batch.target_as_of,
        applied_at: batch.applied_at,
        inserted,
        updated,
        deleted,
    };
    insert_log(&tx, &entry)?;
    let record_count = snapshot_ops::count_current(&tx, table)?;

    tx.commit().map_err(|e| to_store_err("apply_restore", table, e))?;
    debug!(table, inserted, updated, deleted, record_count, "restore batch committed");

    Ok(AppliedRestore {
        operation_id: batch.operation_id,
        table: table.to_string(),
        applied_at: batch.applied_at,
        inserted,
        updated,
        deleted,
        record_count,
    })
}

pub fn insert_log(conn: &Connection, entry: &RestoreLogEntry) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO restore_log
            (operation_id, table_name, target_as_of, applied_at, inserted, updated, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.operation_id.to_string(),
            entry.table,
            format_timestamp(&entry.target_as_of),
            format_timestamp(&entry.applied_at),
            entry.inserted as i64,
            entry.updated as i64,
            entry.deleted as i64,
        ],
    )
    .map_err(|e| to_store_err("insert_log", &entry.table, e))?;
    Ok(())
}

/// Executed restores of one table, oldest first.
pub fn list_log(conn: &Connection, table: &str) -> StoreResult<Vec<RestoreLogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT operation_id, target_as_of, applied_at, inserted, updated, deleted
             FROM restore_log WHERE table_name = ?1 ORDER BY applied_at ASC",
        )
        .map_err(|e| to_store_err("list_log", table, e))?;

    let rows = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .map_err(|e| to_store_err("list_log", table, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_store_err("list_log", table, e))?;

    rows.into_iter()
        .map(|(id, target, applied, inserted, updated, deleted)| {
            let operation_id = uuid::Uuid::parse_str(&id).map_err(|e| StoreError::CorruptRow {
                table: table.to_string(),
                reason: format!("bad operation id {id:?}: {e}"),
            })?;
            Ok(RestoreLogEntry {
                operation_id,
                table: table.to_string(),
                target_as_of: parse_ts(table, &target)?,
                applied_at: parse_ts(table, &applied)?,
                inserted: inserted as usize,
                updated: updated as usize,
                deleted: deleted as usize,
            })
        })
        .collect()
}
