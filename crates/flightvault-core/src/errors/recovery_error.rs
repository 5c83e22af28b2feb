//! Recovery engine errors.

use super::error_code::ErrorCode;

/// Errors raised by the diff, health, locate, and restore components.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecoveryError {
    #[error("schema mismatch on {table}: {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("table {table} has no schema descriptor")]
    UnknownTable { table: String },

    #[error("invalid record in {table}: {reason}")]
    InvalidRecord { table: String, reason: String },

    #[error("duplicate identity {key} in {table}")]
    DuplicateKey { table: String, key: String },

    #[error("invalid search window: {reason}")]
    InvalidWindow { reason: String },

    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    #[error(
        "restore point for {table} has confidence {confidence:.1}% (floor {floor:.1}%); confirmation required"
    )]
    LowConfidence {
        table: String,
        confidence: f64,
        floor: f64,
    },

    #[error("restore of {table} blocked by {count} dependency violation(s); first: {first}")]
    DependencyViolation {
        table: String,
        count: usize,
        first: String,
    },

    #[error("table {table} is busy: {operation} in progress")]
    Busy { table: String, operation: String },

    #[error("no restore point available for {table}: {reason}")]
    NoRestorePoint { table: String, reason: String },
}

impl ErrorCode for RecoveryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaMismatch { .. } => "RECOVERY_SCHEMA_MISMATCH",
            Self::UnknownTable { .. } => "RECOVERY_UNKNOWN_TABLE",
            Self::InvalidRecord { .. } => "RECOVERY_INVALID_RECORD",
            Self::DuplicateKey { .. } => "RECOVERY_DUPLICATE_KEY",
            Self::InvalidWindow { .. } => "RECOVERY_INVALID_WINDOW",
            Self::InvalidTimestamp { .. } => "RECOVERY_INVALID_TIMESTAMP",
            Self::LowConfidence { .. } => "RECOVERY_LOW_CONFIDENCE",
            Self::DependencyViolation { .. } => "RECOVERY_DEPENDENCY_VIOLATION",
            Self::Busy { .. } => "RECOVERY_BUSY",
            Self::NoRestorePoint { .. } => "RECOVERY_NO_RESTORE_POINT",
        }
    }
}
