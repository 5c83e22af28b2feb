//! RetryingStore: bounded exponential backoff at the adapter boundary.

use std::thread;

use chrono::{DateTime, Utc};
use tracing::warn;

use flightvault_core::config::StorageConfig;
use flightvault_core::errors::{RecoveryAction, StoreResult};
use flightvault_core::models::{AppliedRestore, RestoreBatch, Snapshot};
use flightvault_core::traits::ITemporalStore;

/// Wraps a store and retries transient failures (timeouts, unavailability)
/// up to `max_retries` times. Non-transient errors surface immediately; the
/// last transient error surfaces once retries run out.
pub struct RetryingStore<S> {
    inner: S,
    config: StorageConfig,
}

impl<S: ITemporalStore> RetryingStore<S> {
    pub fn new(inner: S, config: StorageConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn retry<T>(&self, operation: &str, table: &str, mut call: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
        let mut attempt = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if RecoveryAction::for_store_error(&e) == RecoveryAction::Retry
                    && attempt < self.config.max_retries =>
                {
                    attempt += 1;
                    let delay = self.config.backoff(attempt);
                    warn!(
                        operation,
                        table,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient adapter failure, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: ITemporalStore> ITemporalStore for RetryingStore<S> {
    fn snapshot_at(&self, table: &str, key_field: &str, at: DateTime<Utc>) -> StoreResult<Snapshot> {
        self.retry("snapshot_at", table, || self.inner.snapshot_at(table, key_field, at))
    }

    fn current(&self, table: &str, key_field: &str) -> StoreResult<Snapshot> {
        self.retry("current", table, || self.inner.current(table, key_field))
    }

    /// A failed batch leaves the store unchanged, so replaying it is safe.
    fn apply_restore(&self, batch: &RestoreBatch) -> StoreResult<AppliedRestore> {
        self.retry("apply_restore", &batch.table, || self.inner.apply_restore(batch))
    }
}
