//! Migration runner: version tracking, forward-only, transactional per migration.

mod v001_row_versions;
mod v002_restore_log;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use flightvault_core::errors::{StoreError, StoreResult};

use crate::to_sqlite_err;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 2;

type MigrationFn = fn(&Connection) -> StoreResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 2] = [
    (1, "row_versions", v001_row_versions::migrate),
    (2, "restore_log", v002_restore_log::migrate),
];

/// Current schema version, or 0 if `schema_version` doesn't exist yet.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(|e| to_sqlite_err(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_sqlite_err(e.to_string()))
}

/// Run all pending migrations. Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> StoreResult<u32> {
    let current = current_version(conn)?;

    if current >= LATEST_VERSION {
        debug!("database schema is up to date (v{current})");
        return Ok(0);
    }

    info!("running migrations: v{current} → v{LATEST_VERSION}");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_sqlite_err(format!("create schema_version: {e}")))?;

    let mut applied = 0;
    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_sqlite_err(format!("begin transaction for v{version:03}: {e}")))?;

        let result = migrate_fn(conn).and_then(|()| {
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
                .map(|_| ())
                .map_err(|e| to_sqlite_err(format!("record version v{version:03}: {e}")))
        });

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| to_sqlite_err(format!("commit v{version:03}: {e}")))?;
                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    warn!("rollback of migration v{version:03} failed: {rollback}");
                }
                return Err(StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
