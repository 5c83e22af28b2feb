mod error_code;
mod flightvault_error;
mod recovery_action;
mod recovery_error;
mod store_error;

pub use error_code::ErrorCode;
pub use flightvault_error::{FlightVaultError, FlightVaultResult};
pub use recovery_action::RecoveryAction;
pub use recovery_error::RecoveryError;
pub use store_error::{StoreError, StoreResult};
