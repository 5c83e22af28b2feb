//! # flightvault-core
//!
//! Foundation crate for the FlightVault temporal recovery engine.
//! Defines the record/snapshot model, the temporal store adapter trait,
//! errors, configuration, and tracing setup. Every other crate in the
//! workspace depends on this.

pub mod config;
pub mod errors;
pub mod models;
pub mod telemetry;
pub mod time;
pub mod traits;

pub use config::FlightVaultConfig;
pub use errors::{FlightVaultError, FlightVaultResult};
