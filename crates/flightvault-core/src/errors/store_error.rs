//! Temporal store adapter errors.

use chrono::{DateTime, Utc};

use super::error_code::ErrorCode;
use crate::time::format_timestamp;

/// Errors raised at the temporal store adapter boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("no state for table {table} at {}", format_timestamp(.at))]
    NoSuchTimestamp { table: String, at: DateTime<Utc> },

    #[error(
        "{} is outside the retention window of table {table} (retained from {})",
        format_timestamp(.at),
        format_timestamp(.retained_from)
    )]
    OutOfRetentionWindow {
        table: String,
        at: DateTime<Utc>,
        retained_from: DateTime<Utc>,
    },

    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("adapter timeout during {operation} on {table} after {elapsed_ms}ms")]
    AdapterTimeout {
        operation: String,
        table: String,
        elapsed_ms: u64,
    },

    #[error("adapter unavailable during {operation}: {reason}")]
    AdapterUnavailable { operation: String, reason: String },

    #[error("restore batch rejected for {table}: {reason}")]
    InvalidRestore { table: String, reason: String },

    #[error("row {key} of {table}: {reason}")]
    RowConflict {
        table: String,
        key: String,
        reason: String,
    },

    #[error("stored row for {table} is unreadable: {reason}")]
    CorruptRow { table: String, reason: String },

    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },
}

impl StoreError {
    /// Transport-level failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AdapterTimeout { .. } | Self::AdapterUnavailable { .. }
        )
    }
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSuchTimestamp { .. } => "STORE_NO_SUCH_TIMESTAMP",
            Self::OutOfRetentionWindow { .. } => "STORE_OUT_OF_RETENTION_WINDOW",
            Self::UnknownTable { .. } => "STORE_UNKNOWN_TABLE",
            Self::AdapterTimeout { .. } => "STORE_ADAPTER_TIMEOUT",
            Self::AdapterUnavailable { .. } => "STORE_ADAPTER_UNAVAILABLE",
            Self::InvalidRestore { .. } => "STORE_INVALID_RESTORE",
            Self::RowConflict { .. } => "STORE_ROW_CONFLICT",
            Self::CorruptRow { .. } => "STORE_CORRUPT_ROW",
            Self::Sqlite { .. } => "STORE_SQLITE_ERROR",
            Self::MigrationFailed { .. } => "STORE_MIGRATION_FAILED",
        }
    }
}

/// Convenience type alias for adapter calls.
pub type StoreResult<T> = Result<T, StoreError>;
