//! # flightvault-storage
//!
//! SQLite persistence for system-versioned tables.
//! Implements `ITemporalStore` over a row history table.
//! Single write connection + read pool (WAL mode).

pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;
pub mod retry;
pub mod store;

pub use retry::RetryingStore;
pub use store::SqliteTemporalStore;

use flightvault_core::errors::StoreError;

/// Map a rusqlite error into the adapter taxonomy. Lock contention is
/// reported as a timeout so callers retry it.
pub fn to_store_err(operation: &str, table: &str, e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
            StoreError::AdapterTimeout {
                operation: operation.to_string(),
                table: table.to_string(),
                elapsed_ms: pragmas::BUSY_TIMEOUT_MS,
            }
        }
        _ => StoreError::Sqlite {
            message: format!("{operation}: {e}"),
        },
    }
}

/// Helper to convert a string message into a StoreError::Sqlite.
pub fn to_sqlite_err(msg: String) -> StoreError {
    StoreError::Sqlite { message: msg }
}
