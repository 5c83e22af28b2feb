//! Selective restore configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the selective restore executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Length of the default corruption window after the target.
    pub corruption_span_seconds: u64,
    /// Refuse to execute located points below the confidence floor unless
    /// the caller confirms.
    pub require_confirmation_below_floor: bool,
    /// Re-read restored identities after apply and compare to the target.
    pub verify_after_apply: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            corruption_span_seconds: 300,
            require_confirmation_below_floor: true,
            verify_after_apply: true,
        }
    }
}

impl RestoreConfig {
    pub fn corruption_span(&self) -> Duration {
        Duration::seconds(self.corruption_span_seconds as i64)
    }
}
