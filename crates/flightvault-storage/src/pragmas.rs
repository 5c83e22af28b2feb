//! Connection PRAGMAs.

use rusqlite::Connection;

use flightvault_core::errors::StoreResult;

use crate::to_sqlite_err;

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configure a read-write connection.
pub fn configure_connection(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        "
    ))
    .map_err(|e| to_sqlite_err(format!("configure connection: {e}")))
}

/// Configure a reader. Same PRAGMAs plus `query_only = ON`.
pub fn configure_readonly_connection(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&format!(
        "
        PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        PRAGMA query_only = ON;
        "
    ))
    .map_err(|e| to_sqlite_err(format!("configure reader: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_connection_rejects_writes() {
        let conn = Connection::open_in_memory().unwrap();
        configure_readonly_connection(&conn).unwrap();
        let result = conn.execute_batch("CREATE TABLE t (x INTEGER)");
        assert!(result.is_err());
    }

    #[test]
    fn busy_timeout_is_applied() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout as u64, BUSY_TIMEOUT_MS);
    }
}
