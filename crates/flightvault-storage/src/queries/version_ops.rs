//! Versioned table registry and row version writes.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use flightvault_core::errors::{StoreError, StoreResult};
use flightvault_core::models::{Record, RecordKey, RowVersion};
use flightvault_core::time::format_timestamp;

use super::{decode_key, decode_record, encode_fields, encode_key, parse_ts};
use crate::to_store_err;

/// Registry row for one versioned table.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub key_field: String,
    pub created_at: DateTime<Utc>,
}

pub fn register_table(
    conn: &Connection,
    table: &str,
    key_field: &str,
    created_at: DateTime<Utc>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO versioned_tables (table_name, key_field, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(table_name) DO NOTHING",
        params![table, key_field, format_timestamp(&created_at)],
    )
    .map_err(|e| to_store_err("register_table", table, e))?;
    Ok(())
}

pub fn table_info(conn: &Connection, table: &str) -> StoreResult<Option<TableInfo>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT key_field, created_at FROM versioned_tables WHERE table_name = ?1",
            params![table],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| to_store_err("table_info", table, e))?;

    row.map(|(key_field, created_at)| {
        Ok(TableInfo {
            key_field,
            created_at: parse_ts(table, &created_at)?,
        })
    })
    .transpose()
}

/// Registry row, or `UnknownTable`.
pub fn require_table(conn: &Connection, table: &str) -> StoreResult<TableInfo> {
    table_info(conn, table)?.ok_or_else(|| StoreError::UnknownTable {
        table: table.to_string(),
    })
}

/// Start of the current version of a row, if the row exists now.
pub fn current_version_start(
    conn: &Connection,
    table: &str,
    key: &RecordKey,
) -> StoreResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT valid_from FROM row_versions
             WHERE table_name = ?1 AND row_key = ?2 AND valid_until IS NULL",
            params![table, encode_key(table, key)?],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_store_err("current_version_start", table, e))?;
    raw.map(|s| parse_ts(table, &s)).transpose()
}

fn insert_version(
    conn: &Connection,
    table: &str,
    key: &RecordKey,
    record: &Record,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO row_versions (table_name, row_key, data, valid_from, valid_until)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![
            table,
            encode_key(table, key)?,
            encode_fields(table, record)?,
            format_timestamp(&at)
        ],
    )
    .map_err(|e| to_store_err("insert_version", table, e))?;
    Ok(())
}

fn close_current(conn: &Connection, table: &str, key: &RecordKey, at: DateTime<Utc>) -> StoreResult<usize> {
    conn.execute(
        "UPDATE row_versions SET valid_until = ?3
         WHERE table_name = ?1 AND row_key = ?2 AND valid_until IS NULL",
        params![table, encode_key(table, key)?, format_timestamp(&at)],
    )
    .map_err(|e| to_store_err("close_current", table, e))
}

/// Reject writes that would reorder history.
fn ensure_not_before(
    table: &str,
    key: &RecordKey,
    current_start: DateTime<Utc>,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    if at < current_start {
        return Err(StoreError::RowConflict {
            table: table.to_string(),
            key: key.to_string(),
            reason: format!(
                "write at {} precedes current version from {}",
                format_timestamp(&at),
                format_timestamp(&current_start)
            ),
        });
    }
    Ok(())
}

/// Open the first version of a row. Fails if the row exists now.
pub fn insert_row(
    conn: &Connection,
    table: &str,
    key: &RecordKey,
    record: &Record,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    if current_version_start(conn, table, key)?.is_some() {
        return Err(StoreError::RowConflict {
            table: table.to_string(),
            key: key.to_string(),
            reason: "row already exists".to_string(),
        });
    }
    insert_version(conn, table, key, record, at)
}

/// Close the current version and open a new one. Fails if the row does
/// not exist now.
pub fn update_row(
    conn: &Connection,
    table: &str,
    key: &RecordKey,
    record: &Record,
    at: DateTime<Utc>,
) -> StoreResult<()> {
    let start = current_version_start(conn, table, key)?.ok_or_else(|| StoreError::RowConflict {
        table: table.to_string(),
        key: key.to_string(),
        reason: "row does not exist".to_string(),
    })?;
    ensure_not_before(table, key, start, at)?;
    close_current(conn, table, key, at)?;
    insert_version(conn, table, key, record, at)
}

/// Insert or replace. Returns `true` when an existing row was replaced.
pub fn upsert_row(
    conn: &Connection,
    table: &str,
    key: &RecordKey,
    record: &Record,
    at: DateTime<Utc>,
) -> StoreResult<bool> {
    match current_version_start(conn, table, key)? {
        Some(start) => {
            ensure_not_before(table, key, start, at)?;
            close_current(conn, table, key, at)?;
            insert_version(conn, table, key, record, at)?;
            Ok(true)
        }
        None => {
            insert_version(conn, table, key, record, at)?;
            Ok(false)
        }
    }
}

/// Close the current version. Fails if the row does not exist now.
pub fn delete_row(conn: &Connection, table: &str, key: &RecordKey, at: DateTime<Utc>) -> StoreResult<()> {
    let start = current_version_start(conn, table, key)?.ok_or_else(|| StoreError::RowConflict {
        table: table.to_string(),
        key: key.to_string(),
        reason: "row does not exist".to_string(),
    })?;
    ensure_not_before(table, key, start, at)?;
    close_current(conn, table, key, at)?;
    Ok(())
}

/// Every version of one row, oldest first.
pub fn history(conn: &Connection, table: &str, key: &RecordKey) -> StoreResult<Vec<RowVersion>> {
    let mut stmt = conn
        .prepare(
            "SELECT row_key, data, valid_from, valid_until FROM row_versions
             WHERE table_name = ?1 AND row_key = ?2
             ORDER BY valid_from ASC, version_id ASC",
        )
        .map_err(|e| to_store_err("history", table, e))?;

    let rows = stmt
        .query_map(params![table, encode_key(table, key)?], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map_err(|e| to_store_err("history", table, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_store_err("history", table, e))?;

    rows.into_iter()
        .map(|(raw_key, data, from, until)| {
            let valid_from = parse_ts(table, &from)?;
            Ok(RowVersion {
                table: table.to_string(),
                key: decode_key(table, &raw_key)?,
                data: decode_record(table, &data, valid_from)?,
                valid_from,
                valid_until: until.map(|u| parse_ts(table, &u)).transpose()?,
            })
        })
        .collect()
}
