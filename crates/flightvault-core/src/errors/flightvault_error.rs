use super::error_code::ErrorCode;
use super::{RecoveryError, StoreError};

/// Top-level error type for the FlightVault workspace.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum FlightVaultError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FlightVaultError {
    /// The adapter error behind this failure, if any.
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }

    /// The engine error behind this failure, if any.
    pub fn as_recovery(&self) -> Option<&RecoveryError> {
        match self {
            Self::Recovery(e) => Some(e),
            _ => None,
        }
    }
}

impl ErrorCode for FlightVaultError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Recovery(e) => e.error_code(),
            Self::ConfigError(_) | Self::ConfigParse(_) => "CONFIG_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Convenience type alias.
pub type FlightVaultResult<T> = Result<T, FlightVaultError>;
