//! RetryingStore: transient failures are retried with backoff, permanent
//! ones surface immediately.

use flightvault_core::config::StorageConfig;
use flightvault_core::errors::StoreError;
use flightvault_core::traits::ITemporalStore;
use flightvault_storage::RetryingStore;
use test_fixtures::{at, hours_ago, AirlineScenario, Fault};

fn fast_config(max_retries: u32) -> StorageConfig {
    StorageConfig {
        max_retries,
        backoff_base_ms: 1,
        backoff_max_ms: 4,
        ..StorageConfig::default()
    }
}

#[test]
fn transient_failures_within_budget_succeed() {
    let s = AirlineScenario::airports_only(hours_ago(1), 10).unwrap();
    s.store.fail_next(2, Fault::Timeout);
    let store = RetryingStore::new(s.store.clone(), fast_config(3));

    let snap = store.snapshot_at("airports", "airport_id", at(s.t0, 60)).unwrap();
    assert_eq!(snap.len(), 10);
    assert_eq!(s.store.snapshot_calls(), 3);
}

#[test]
fn exhausted_retries_surface_last_error() {
    let s = AirlineScenario::airports_only(hours_ago(1), 10).unwrap();
    s.store.fail_next(10, Fault::Unavailable);
    let store = RetryingStore::new(s.store.clone(), fast_config(2));

    let err = store.snapshot_at("airports", "airport_id", at(s.t0, 60)).unwrap_err();
    assert!(matches!(err, StoreError::AdapterUnavailable { .. }));
    assert_eq!(s.store.snapshot_calls(), 3);
}

#[test]
fn permanent_errors_are_not_retried() {
    let s = AirlineScenario::airports_only(hours_ago(1), 10).unwrap();
    let store = RetryingStore::new(s.store.clone(), fast_config(3));

    let err = store
        .snapshot_at("airports", "airport_id", s.t0 - chrono::Duration::hours(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::OutOfRetentionWindow { .. }));
    assert_eq!(s.store.snapshot_calls(), 1);
}
