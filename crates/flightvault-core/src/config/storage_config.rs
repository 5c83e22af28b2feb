//! Temporal store adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the SQLite store and adapter retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. `None` opens an in-memory database.
    pub db_path: Option<String>,
    /// Attempts after the first for transient adapter errors.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_retries: 3,
            backoff_base_ms: 50,
            backoff_max_ms: 2_000,
            read_pool_size: 2,
        }
    }
}

impl StorageConfig {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped at `backoff_max_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let ms = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_max_ms);
        Duration::from_millis(ms)
    }
}
