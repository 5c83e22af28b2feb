//! v001: versioned table registry and row history.

use rusqlite::Connection;

use flightvault_core::errors::StoreResult;

use crate::to_sqlite_err;

pub fn migrate(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS versioned_tables (
            table_name TEXT PRIMARY KEY,
            key_field  TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS row_versions (
            version_id  INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name  TEXT NOT NULL REFERENCES versioned_tables(table_name),
            row_key     TEXT NOT NULL,
            data        TEXT NOT NULL,
            valid_from  TEXT NOT NULL,
            valid_until TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_row_versions_key
            ON row_versions(table_name, row_key, valid_from);
        CREATE INDEX IF NOT EXISTS idx_row_versions_time
            ON row_versions(table_name, valid_from, valid_until);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_row_versions_current
            ON row_versions(table_name, row_key) WHERE valid_until IS NULL;
        ",
    )
    .map_err(|e| to_sqlite_err(format!("v001 row_versions: {e}")))
}
