//! RecoveryAction enum: what a caller should do when an operation fails.

use std::fmt;

use super::{FlightVaultError, RecoveryError, StoreError};

/// Recommended action for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Transient failure; the same call may succeed later.
    Retry,
    /// A human must decide before anything destructive happens.
    Confirm,
    /// The request cannot be answered as posed; change its inputs.
    Abort,
}

impl RecoveryAction {
    /// Classify an adapter error.
    pub fn for_store_error(error: &StoreError) -> Self {
        if error.is_transient() {
            Self::Retry
        } else {
            Self::Abort
        }
    }

    /// Classify any workspace error.
    pub fn for_error(error: &FlightVaultError) -> Self {
        match error {
            FlightVaultError::Store(e) => Self::for_store_error(e),
            FlightVaultError::Recovery(e) => match e {
                RecoveryError::Busy { .. } => Self::Retry,
                RecoveryError::LowConfidence { .. }
                | RecoveryError::DependencyViolation { .. }
                | RecoveryError::SchemaMismatch { .. } => Self::Confirm,
                RecoveryError::UnknownTable { .. }
                | RecoveryError::InvalidRecord { .. }
                | RecoveryError::DuplicateKey { .. }
                | RecoveryError::InvalidWindow { .. }
                | RecoveryError::InvalidTimestamp { .. }
                | RecoveryError::NoRestorePoint { .. } => Self::Abort,
            },
            FlightVaultError::ConfigError(_)
            | FlightVaultError::ConfigParse(_)
            | FlightVaultError::SerializationError(_) => Self::Abort,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "Retry"),
            Self::Confirm => write!(f, "Confirm"),
            Self::Abort => write!(f, "Abort"),
        }
    }
}
