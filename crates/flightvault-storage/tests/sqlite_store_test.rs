//! SQLite temporal store: point-in-time reads, retention, atomic restores,
//! audit trail.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use flightvault_core::config::StorageConfig;
use flightvault_core::errors::{ErrorCode, StoreError};
use flightvault_core::models::{FieldValue, Record, RecordKey, RestoreBatch, RestoreOp};
use flightvault_core::traits::ITemporalStore;
use flightvault_storage::SqliteTemporalStore;

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn airport(id: i64, name: &str) -> Record {
    Record::new()
        .with("airport_id", id)
        .with("name", name)
        .with("country", "United Kingdom")
}

/// Whole seconds, so stored timestamps compare equal after a round trip.
fn base() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0) - Duration::hours(6)
}

/// File-backed store with three airports inserted at `t0`.
fn seeded(t0: DateTime<Utc>) -> (SqliteTemporalStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTemporalStore::open(&dir.path().join("vault.db"), &StorageConfig::default()).unwrap();
    store.register_table("airports", "airport_id", t0).unwrap();
    store
        .bulk_insert(
            "airports",
            &[airport(1, "Heathrow"), airport(2, "Gatwick"), airport(3, "Stansted")],
            t0,
        )
        .unwrap();
    (store, dir)
}

fn batch(ops: Vec<RestoreOp>, target: DateTime<Utc>, applied_at: DateTime<Utc>) -> RestoreBatch {
    RestoreBatch {
        operation_id: Uuid::new_v4(),
        table: "airports".to_string(),
        key_field: "airport_id".to_string(),
        target_as_of: target,
        applied_at,
        ops,
    }
}

// ─── Point-in-time reads ─────────────────────────────────────────────────────

#[test]
fn snapshot_reflects_each_point_in_time() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    store
        .update("airports", &airport(2, "London Gatwick"), t0 + Duration::minutes(10))
        .unwrap();
    store
        .delete("airports", &RecordKey::Int(3), t0 + Duration::minutes(20))
        .unwrap();

    let before = store
        .snapshot_at("airports", "airport_id", t0 + Duration::minutes(5))
        .unwrap();
    assert_eq!(before.len(), 3);
    assert_eq!(
        before.get(&RecordKey::Int(2)).unwrap().value("name").as_str(),
        Some("Gatwick")
    );

    let middle = store
        .snapshot_at("airports", "airport_id", t0 + Duration::minutes(15))
        .unwrap();
    assert_eq!(middle.len(), 3);
    let gatwick = middle.get(&RecordKey::Int(2)).unwrap();
    assert_eq!(gatwick.value("name").as_str(), Some("London Gatwick"));
    assert_eq!(gatwick.version_start, Some(t0 + Duration::minutes(10)));

    let current = store.current("airports", "airport_id").unwrap();
    assert_eq!(current.len(), 2);
    assert!(!current.contains(&RecordKey::Int(3)));
}

#[test]
fn version_boundaries_are_half_open() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let t1 = t0 + Duration::minutes(1);
    store.delete("airports", &RecordKey::Int(1), t1).unwrap();

    let just_before = store
        .snapshot_at("airports", "airport_id", t1 - Duration::microseconds(1))
        .unwrap();
    assert!(just_before.contains(&RecordKey::Int(1)));
    let at_delete = store.snapshot_at("airports", "airport_id", t1).unwrap();
    assert!(!at_delete.contains(&RecordKey::Int(1)));
}

#[test]
fn timestamps_outside_history_are_rejected() {
    let t0 = base();
    let (store, _dir) = seeded(t0);

    let err = store
        .snapshot_at("airports", "airport_id", t0 - Duration::hours(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::OutOfRetentionWindow { .. }));

    let err = store
        .snapshot_at("airports", "airport_id", Utc::now() + Duration::hours(1))
        .unwrap_err();
    assert_eq!(err.error_code(), "STORE_NO_SUCH_TIMESTAMP");

    let err = store.current("planes", "plane_id").unwrap_err();
    assert!(matches!(err, StoreError::UnknownTable { .. }));
}

#[test]
fn retention_limit_hides_old_states() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let store = store.with_retention(Duration::hours(1));
    let err = store
        .snapshot_at("airports", "airport_id", t0 + Duration::minutes(30))
        .unwrap_err();
    assert!(matches!(err, StoreError::OutOfRetentionWindow { .. }));
    assert!(store
        .snapshot_at("airports", "airport_id", Utc::now() - Duration::minutes(30))
        .is_ok());
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[test]
fn duplicate_insert_and_missing_update_conflict() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let err = store.insert("airports", &airport(1, "Again"), t0).unwrap_err();
    assert!(matches!(err, StoreError::RowConflict { .. }));
    let err = store
        .update("airports", &airport(99, "Nowhere"), t0 + Duration::minutes(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::RowConflict { .. }));
}

#[test]
fn writes_cannot_precede_current_version() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let err = store
        .update("airports", &airport(1, "Earlier"), t0 - Duration::minutes(1))
        .unwrap_err();
    assert!(matches!(err, StoreError::RowConflict { .. }));
}

#[test]
fn failed_bulk_insert_leaves_no_rows() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let result = store.bulk_insert(
        "airports",
        &[airport(10, "Luton"), airport(1, "Duplicate")],
        t0 + Duration::minutes(1),
    );
    assert!(result.is_err());
    assert!(!store
        .current("airports", "airport_id")
        .unwrap()
        .contains(&RecordKey::Int(10)));
}

// ─── Restores ────────────────────────────────────────────────────────────────

#[test]
fn restore_batch_applies_and_is_logged() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let t1 = t0 + Duration::minutes(10);
    store.delete("airports", &RecordKey::Int(3), t1).unwrap();
    store.update("airports", &airport(2, "Corrupted"), t1).unwrap();
    store.insert("airports", &airport(4, "Luton"), t1).unwrap();

    let applied_at = t0 + Duration::minutes(20);
    let applied = store
        .apply_restore(&batch(
            vec![
                RestoreOp::Upsert(airport(3, "Stansted")),
                RestoreOp::Upsert(airport(2, "Gatwick")),
                RestoreOp::Delete(RecordKey::Int(4)),
            ],
            t0,
            applied_at,
        ))
        .unwrap();

    assert_eq!((applied.inserted, applied.updated, applied.deleted), (1, 1, 1));
    assert_eq!(applied.record_count, 3);

    let current = store.current("airports", "airport_id").unwrap();
    let at_target = store.snapshot_at("airports", "airport_id", t0).unwrap();
    let names = |s: &flightvault_core::models::Snapshot| {
        s.records()
            .map(|r| r.value("name").to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&current), names(&at_target));

    let log = store.restore_log("airports").unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].operation_id, applied.operation_id);
    assert_eq!(log[0].target_as_of, t0);
}

#[test]
fn failing_op_rolls_back_whole_batch() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let applied_at = t0 + Duration::minutes(5);

    let err = store
        .apply_restore(&batch(
            vec![
                RestoreOp::Upsert(airport(1, "Changed")),
                RestoreOp::Delete(RecordKey::Int(42)),
            ],
            t0,
            applied_at,
        ))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRestore { .. }));

    let current = store.current("airports", "airport_id").unwrap();
    assert_eq!(
        current.get(&RecordKey::Int(1)).unwrap().value("name").as_str(),
        Some("Heathrow")
    );
    assert!(store.restore_log("airports").unwrap().is_empty());
}

#[test]
fn batch_with_wrong_key_field_is_rejected() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let mut b = batch(vec![], t0, t0 + Duration::minutes(1));
    b.key_field = "id".to_string();
    assert!(matches!(
        store.apply_restore(&b).unwrap_err(),
        StoreError::InvalidRestore { .. }
    ));
}

#[test]
fn non_finite_floats_are_readable() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let t1 = t0 + Duration::minutes(1);
    store
        .insert("airports", &airport(4, "Nowhere").with("latitude", f64::NAN), t1)
        .unwrap();
    store
        .update("airports", &airport(1, "Heathrow").with("latitude", f64::INFINITY), t1)
        .unwrap();

    let now = store.current("airports", "airport_id").unwrap();
    assert_eq!(now.len(), 4);
    match now.get(&RecordKey::Int(4)).unwrap().value("latitude") {
        FieldValue::Float(f) => assert!(f.is_nan()),
        other => panic!("expected NaN, got {other:?}"),
    }
    assert_eq!(
        now.get(&RecordKey::Int(1)).unwrap().value("latitude"),
        &FieldValue::Float(f64::INFINITY)
    );

    let then = store
        .snapshot_at("airports", "airport_id", t1 + Duration::seconds(30))
        .unwrap();
    assert_eq!(then.len(), 4);
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[test]
fn history_lists_every_version() {
    let t0 = base();
    let (store, _dir) = seeded(t0);
    let t1 = t0 + Duration::minutes(1);
    let t2 = t0 + Duration::minutes(2);
    store.update("airports", &airport(1, "London Heathrow"), t1).unwrap();
    store.delete("airports", &RecordKey::Int(1), t2).unwrap();

    let history = store.history("airports", &RecordKey::Int(1)).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].valid_from, t0);
    assert_eq!(history[0].valid_until, Some(t1));
    assert_eq!(history[1].data.value("name").as_str(), Some("London Heathrow"));
    assert_eq!(history[1].valid_until, Some(t2));
    assert!(!history.iter().any(|v| v.is_current()));
}

#[test]
fn text_keys_round_trip() {
    let t0 = base();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteTemporalStore::open(&dir.path().join("vault.db"), &StorageConfig::default()).unwrap();
    store.register_table("airlines", "iata", t0).unwrap();
    store
        .insert("airlines", &Record::new().with("iata", "BA").with("name", "British Airways"), t0)
        .unwrap();
    let snap = store.current("airlines", "iata").unwrap();
    assert!(snap.contains(&RecordKey::from("BA")));
    let history = store.history("airlines", &RecordKey::from("BA")).unwrap();
    assert_eq!(history[0].key, RecordKey::from("BA"));
}
