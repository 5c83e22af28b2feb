//! Point-in-time reads over the row history.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use flightvault_core::errors::StoreResult;
use flightvault_core::models::Record;
use flightvault_core::time::format_timestamp;

use super::{decode_record, parse_ts};
use crate::to_store_err;

fn collect_records(
    conn: &Connection,
    table: &str,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> StoreResult<Vec<Record>> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| to_store_err("snapshot", table, e))?;
    let rows = stmt
        .query_map(params, |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| to_store_err("snapshot", table, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_store_err("snapshot", table, e))?;

    rows.iter()
        .map(|(data, from)| decode_record(table, data, parse_ts(table, from)?))
        .collect()
}

/// Rows whose version interval contains `at`.
pub fn rows_at(conn: &Connection, table: &str, at: DateTime<Utc>) -> StoreResult<Vec<Record>> {
    let at = format_timestamp(&at);
    collect_records(
        conn,
        table,
        "SELECT data, valid_from FROM row_versions
         WHERE table_name = ?1 AND valid_from <= ?2
           AND (valid_until IS NULL OR valid_until > ?2)",
        &[&table, &at],
    )
}

/// Rows whose current version is open.
pub fn current_rows(conn: &Connection, table: &str) -> StoreResult<Vec<Record>> {
    collect_records(
        conn,
        table,
        "SELECT data, valid_from FROM row_versions
         WHERE table_name = ?1 AND valid_until IS NULL",
        &[&table],
    )
}

pub fn count_current(conn: &Connection, table: &str) -> StoreResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM row_versions WHERE table_name = ?1 AND valid_until IS NULL",
            params![table],
            |row| row.get(0),
        )
        .map_err(|e| to_store_err("count_current", table, e))?;
    Ok(count as usize)
}
