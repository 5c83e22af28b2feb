//! v002: audit log of executed restores.

use rusqlite::Connection;

use flightvault_core::errors::StoreResult;

use crate::to_sqlite_err;

pub fn migrate(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS restore_log (
            operation_id TEXT PRIMARY KEY,
            table_name   TEXT NOT NULL,
            target_as_of TEXT NOT NULL,
            applied_at   TEXT NOT NULL,
            inserted     INTEGER NOT NULL,
            updated      INTEGER NOT NULL,
            deleted      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_restore_log_table
            ON restore_log(table_name, applied_at);
        ",
    )
    .map_err(|e| to_sqlite_err(format!("v002 restore_log: {e}")))
}
