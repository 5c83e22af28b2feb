//! Selective restore: classification, dependency validation, and atomic
//! apply against the in-memory store.
//!
//! - deleted rows come back, legitimate later edits survive
//! - ambiguous divergences are reported and never applied
//! - a second restore to the same target is a no-op
//! - a failed apply leaves the store untouched

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

use flightvault_core::config::RestoreConfig;
use flightvault_core::errors::{FlightVaultError, RecoveryAction, RecoveryError, StoreError};
use flightvault_core::models::{
    AmbiguityReason, CandidateWindow, ChangeKind, ClassificationRule, CorruptionWindow,
    DecisionSource, LocateOutcome, RecordKey, RestoreDecision, RestoreOptions, RuleAction,
    Snapshot, ViolationDirection,
};
use flightvault_core::traits::ITemporalStore;
use flightvault_recovery::{
    DependencyGraph, DiffAnalyzer, RecoveryEngine, RelatedTables, SelectiveRestoreExecutor,
};
use test_fixtures::{
    airline_config, airline_registry, at, hours_ago, seed, AirlineScenario, Fault,
    InMemoryTemporalStore,
};

fn engine(store: &Arc<InMemoryTemporalStore>) -> RecoveryEngine {
    RecoveryEngine::new(store.clone(), airline_config()).unwrap()
}

fn key(id: i64) -> RecordKey {
    RecordKey::Int(id)
}

fn airport_count(store: &InMemoryTemporalStore) -> usize {
    store.current("airports", "airport_id").unwrap().len()
}

fn delete_airports(store: &InMemoryTemporalStore, ids: &[i64], when: DateTime<Utc>) {
    for id in ids {
        store.delete("airports", &key(*id), when).unwrap();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Locate, then restore
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn located_restore_brings_deleted_rows_back_once() {
    let s = AirlineScenario::airports_only(hours_ago(30), 1000).unwrap();
    let corrupted_at = at(hours_ago(5), 2);
    delete_airports(&s.store, &[1, 9, 17, 25, 33, 41, 49, 57, 65], corrupted_at);
    assert_eq!(airport_count(&s.store), 991);

    let engine = engine(&s.store);
    let window = CandidateWindow::ending_at(Utc::now(), Duration::hours(24)).unwrap();
    let located = engine.locate_restore_point("airports", window, None).unwrap();
    assert!(located.is_success());

    let result = engine
        .restore_located(&located, false, &RestoreOptions::default())
        .unwrap();
    assert!(!result.dry_run);
    assert!(result.operation_id.is_some());
    assert_eq!(result.restored, 9);
    assert_eq!(result.removed, 0);
    assert_eq!(result.final_record_count, 1000);
    assert!(result.verification.as_ref().unwrap().passed());
    assert_eq!(airport_count(&s.store), 1000);

    let log = s.store.restore_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].inserted, 9);
    assert_eq!(Some(log[0].operation_id), result.operation_id);

    let target = located.suggested_timestamp.unwrap();
    let again = engine
        .plan_restore("airports", target, &RestoreOptions::default())
        .unwrap();
    assert_eq!(again.revert_count(), 0);

    let second = engine
        .selective_restore("airports", target, false, &RestoreOptions::default())
        .unwrap();
    assert_eq!(second.operation_id, None);
    assert_eq!(second.final_record_count, 1000);
    assert_eq!(s.store.restore_log().len(), 1);
}

#[test]
fn legitimate_edits_survive_the_restore() {
    let base = hours_ago(10);
    let s = AirlineScenario::airports_only(base, 100).unwrap();
    let t = at(base, 4 * 3600);

    delete_airports(&s.store, &[1, 9, 17], at(t, 2));
    s.store
        .update("airports", seed::airport(50).with("name", "Vandalized"), at(t, 30))
        .unwrap();
    s.store
        .insert("airports", seed::airport(102), at(t, 60))
        .unwrap();
    s.store
        .update("airports", seed::airport(60).with("altitude", 1234), at(t, 2 * 3600))
        .unwrap();
    s.store
        .insert("airports", seed::airport(101), at(t, 3 * 3600))
        .unwrap();

    let engine = engine(&s.store);
    let window = CandidateWindow::new(at(base, 2 * 3600), Utc::now()).unwrap();
    let located = engine.locate_restore_point("airports", window, None).unwrap();
    assert_eq!(located.outcome, LocateOutcome::Success);
    assert!(located.suggested_timestamp.unwrap() < at(t, 2));

    let result = engine
        .restore_located(&located, false, &RestoreOptions::default())
        .unwrap();
    let plan = &result.plan;

    for id in [1, 9, 17] {
        let entry = plan.entry(&key(id)).unwrap();
        assert_eq!(entry.kind, ChangeKind::Deleted);
        assert!(entry.is_revert());
    }
    let vandalized = plan.entry(&key(50)).unwrap();
    assert_eq!(vandalized.kind, ChangeKind::Modified);
    assert!(vandalized.is_revert());
    assert_eq!(vandalized.changed_fields, vec!["name".to_string()]);

    let edited = plan.entry(&key(60)).unwrap();
    assert_eq!(edited.decision, RestoreDecision::Preserve);
    assert!(!edited.is_ambiguous());

    let later = plan.entry(&key(101)).unwrap();
    assert_eq!(later.kind, ChangeKind::Added);
    assert_eq!(later.decision, RestoreDecision::Preserve);
    assert!(!later.is_ambiguous());

    let suspicious = plan.entry(&key(102)).unwrap();
    assert!(matches!(
        suspicious.ambiguity,
        Some(AmbiguityReason::CreatedInCorruptionWindow { .. })
    ));

    assert_eq!(result.restored, 4);
    assert_eq!(result.preserved, 2);
    assert_eq!(result.ambiguous, 1);

    let now = s.store.current("airports", "airport_id").unwrap();
    assert_eq!(now.len(), 102);
    assert_eq!(now.get(&key(50)).unwrap().value("name").as_str(), Some("Airport 50"));
    assert_eq!(now.get(&key(60)).unwrap().value("altitude").as_f64(), Some(1234.0));
    assert!(now.contains(&key(101)));
    assert!(now.contains(&key(102)));
}

#[test]
fn dry_run_does_not_touch_the_store() {
    let base = hours_ago(10);
    let s = AirlineScenario::airports_only(base, 100).unwrap();
    delete_airports(&s.store, &[2, 3, 4], at(base, 3600));

    let result = engine(&s.store)
        .selective_restore("airports", at(base, 60), true, &RestoreOptions::default())
        .unwrap();
    assert!(result.dry_run);
    assert_eq!(result.operation_id, None);
    assert_eq!(result.restored, 3);
    assert_eq!(result.final_record_count, 100);
    assert_eq!(airport_count(&s.store), 97);
    assert_eq!(s.store.apply_calls(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Dependencies
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn added_route_to_a_deleted_airport_is_ambiguous() {
    let base = hours_ago(10);
    let s = AirlineScenario::seed(base, 20, 3, 60).unwrap();
    let t = at(base, 4 * 3600);
    delete_airports(&s.store, &[7], t);
    s.store
        .insert("routes", seed::route(61, 1, 7, 8), at(t, 3600))
        .unwrap();

    let plan = engine(&s.store)
        .plan_restore("routes", at(base, 3 * 3600), &RestoreOptions::default())
        .unwrap();

    let entry = plan.entry(&key(61)).unwrap();
    assert_eq!(entry.kind, ChangeKind::Added);
    assert!(!entry.is_revert());
    assert_eq!(
        entry.ambiguity,
        Some(AmbiguityReason::ReferencesDeletedRow {
            field: "source_airport_id".to_string(),
            references_table: "airports".to_string(),
            missing_key: key(7),
        })
    );
    assert_eq!(plan.ambiguous_count(), 1);
    assert!(plan.warnings.is_empty());
}

#[test]
fn reverted_row_referencing_a_missing_parent_blocks_apply() {
    let base = hours_ago(10);
    let s = AirlineScenario::seed(base, 20, 3, 60).unwrap();
    let t = at(base, 4 * 3600);
    s.store.delete("routes", &key(5), t).unwrap();
    delete_airports(&s.store, &[5], at(t, 3600));

    let engine = engine(&s.store);
    let target = at(t, -60);

    let preview = engine
        .selective_restore("routes", target, true, &RestoreOptions::default())
        .unwrap();
    let warnings = &preview.plan.warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].direction, ViolationDirection::Outbound);
    assert_eq!(warnings[0].field, "source_airport_id");
    assert_eq!(warnings[0].related_table, "airports");

    let err = engine
        .selective_restore("routes", target, false, &RestoreOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.as_recovery(),
        Some(RecoveryError::DependencyViolation { count: 1, .. })
    ));
    assert_eq!(RecoveryAction::for_error(&err), RecoveryAction::Confirm);
    assert_eq!(s.store.apply_calls(), 0);

    let options = RestoreOptions {
        allow_dependency_violations: true,
        ..RestoreOptions::default()
    };
    let result = engine.selective_restore("routes", target, false, &options).unwrap();
    assert_eq!(result.restored, 1);
    assert!(s.store.current("routes", "route_id").unwrap().contains(&key(5)));
}

#[test]
fn removing_a_referenced_row_reports_the_dangling_children() {
    let base = hours_ago(10);
    let s = AirlineScenario::seed(base, 20, 3, 60).unwrap();
    s.store
        .insert("airports", seed::airport(21), at(base, 5 * 3600))
        .unwrap();
    s.store
        .insert("routes", seed::route(61, 1, 21, 1), at(base, 6 * 3600))
        .unwrap();

    let options = RestoreOptions::default().with_manual(21i64, RestoreDecision::Revert);
    let plan = engine(&s.store)
        .plan_restore("airports", at(base, 3 * 3600), &options)
        .unwrap();

    let entry = plan.entry(&key(21)).unwrap();
    assert_eq!(entry.source, DecisionSource::Manual);
    assert!(entry.is_revert());

    assert_eq!(plan.warnings.len(), 1);
    let violation = &plan.warnings[0];
    assert_eq!(violation.direction, ViolationDirection::Inbound);
    assert_eq!(violation.table, "routes");
    assert_eq!(violation.key, key(61));
    assert_eq!(violation.related_table, "airports");
}

// ═══════════════════════════════════════════════════════════════════════════
// Rules and manual decisions
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn rules_override_defaults_and_manual_overrides_rules() {
    let base = hours_ago(10);
    let s = AirlineScenario::airports_only(base, 100).unwrap();
    let w0 = at(base, 4 * 3600);
    let w1 = at(base, 5 * 3600);

    s.store
        .update("airports", seed::airport(10).with("name", "Renamed"), at(w0, 60))
        .unwrap();
    s.store
        .update("airports", seed::airport(20).with("altitude", 1), at(w0, 120))
        .unwrap();
    delete_airports(&s.store, &[30], at(w0, 180));
    s.store
        .insert("airports", seed::airport(101), at(w0, 240))
        .unwrap();

    let options = RestoreOptions::default()
        .with_corruption_window(CorruptionWindow::new(w0, w1))
        .with_rule(
            ClassificationRule::new("keep-renames", RuleAction::Keep)
                .for_kind(ChangeKind::Modified)
                .matching_fields("^name$"),
        )
        .with_rule(
            ClassificationRule::new("drop-new-rows", RuleAction::Restore)
                .for_kind(ChangeKind::Added)
                .changed_between(w0, w1),
        )
        .with_manual(30i64, RestoreDecision::Preserve);

    let plan = engine(&s.store)
        .plan_restore("airports", at(base, 3600), &options)
        .unwrap();

    let renamed = plan.entry(&key(10)).unwrap();
    assert_eq!(renamed.decision, RestoreDecision::Preserve);
    assert_eq!(renamed.source, DecisionSource::Rule("keep-renames".to_string()));

    let altered = plan.entry(&key(20)).unwrap();
    assert!(altered.is_revert());
    assert_eq!(altered.source, DecisionSource::Default);

    let deleted = plan.entry(&key(30)).unwrap();
    assert_eq!(deleted.decision, RestoreDecision::Preserve);
    assert_eq!(deleted.source, DecisionSource::Manual);

    let added = plan.entry(&key(101)).unwrap();
    assert!(added.is_revert());
    assert!(!added.is_ambiguous());
    assert_eq!(added.source, DecisionSource::Rule("drop-new-rows".to_string()));

    assert_eq!(plan.revert_count(), 2);
    assert_eq!(plan.projected_count(), 99);
}

#[test]
fn invalid_rule_pattern_is_a_config_error() {
    let base = hours_ago(10);
    let s = AirlineScenario::airports_only(base, 10).unwrap();
    let options = RestoreOptions::default()
        .with_rule(ClassificationRule::new("broken", RuleAction::Keep).matching_fields("(name"));

    let err = engine(&s.store)
        .plan_restore("airports", at(base, 60), &options)
        .unwrap_err();
    match err {
        FlightVaultError::ConfigError(msg) => assert!(msg.contains("broken")),
        other => panic!("expected config error, got {other}"),
    }
}

#[test]
fn modification_without_a_timestamp_needs_a_decision() {
    let executor = SelectiveRestoreExecutor::new(DiffAnalyzer::default(), RestoreConfig::default());
    let then = hours_ago(2);
    let now = hours_ago(1);
    let target = Snapshot::new("airports", "airport_id", then, seed::airports(3)).unwrap();
    let mut changed = seed::airports(3);
    changed[1].set("city", "Elsewhere");
    let current = Snapshot::new("airports", "airport_id", now, changed).unwrap();

    let plan = executor
        .plan(
            &current,
            &target,
            &DependencyGraph::from_registry(&airline_registry()),
            &RelatedTables::new(),
            &RestoreOptions::default(),
        )
        .unwrap();

    let entry = plan.entry(&key(2)).unwrap();
    assert_eq!(entry.ambiguity, Some(AmbiguityReason::UnknownModificationTime));
    assert_eq!(entry.decision, RestoreDecision::Preserve);
    assert_eq!(plan.revert_count(), 0);
    assert_eq!(plan.ambiguous_count(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Refusals and failures
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn failed_apply_leaves_the_store_unchanged() {
    let base = hours_ago(10);
    let s = AirlineScenario::airports_only(base, 100).unwrap();
    delete_airports(&s.store, &[5, 6, 7], at(base, 3600));
    s.store.fail_next_apply(Fault::Unavailable);

    let err = engine(&s.store)
        .selective_restore("airports", at(base, 60), false, &RestoreOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        FlightVaultError::Store(StoreError::AdapterUnavailable { .. })
    ));
    assert_eq!(airport_count(&s.store), 97);
    assert!(s.store.restore_log().is_empty());
}

#[test]
fn low_confidence_point_requires_confirmation() {
    let s = AirlineScenario::airports_only(hours_ago(30), 100).unwrap();
    delete_airports(&s.store, &[1, 2, 3], at(hours_ago(5), 0));
    let engine = engine(&s.store);

    let window = CandidateWindow::ending_at(Utc::now(), Duration::hours(24)).unwrap();
    let located = engine
        .locate_restore_point("airports", window, Some(Instant::now()))
        .unwrap();
    assert_eq!(located.outcome, LocateOutcome::LowConfidence);

    let err = engine
        .restore_located(&located, false, &RestoreOptions::default())
        .unwrap_err();
    assert!(matches!(err.as_recovery(), Some(RecoveryError::LowConfidence { .. })));
    assert_eq!(RecoveryAction::for_error(&err), RecoveryAction::Confirm);
    assert_eq!(airport_count(&s.store), 97);

    let preview = engine
        .restore_located(&located, true, &RestoreOptions::default())
        .unwrap();
    assert_eq!(preview.restored, 3);

    let confirmed = RestoreOptions {
        confirm_low_confidence: true,
        ..RestoreOptions::default()
    };
    let result = engine.restore_located(&located, false, &confirmed).unwrap();
    assert_eq!(result.restored, 3);
    assert_eq!(airport_count(&s.store), 100);
}

#[test]
fn failed_search_has_no_restore_point() {
    let s = AirlineScenario::airports_only(hours_ago(1), 10).unwrap();
    let engine = engine(&s.store);
    let window = CandidateWindow::ending_at(Utc::now(), Duration::hours(24)).unwrap();
    let located = engine.locate_restore_point("airports", window, None).unwrap();
    assert_eq!(located.outcome, LocateOutcome::Failed);

    let err = engine
        .restore_located(&located, true, &RestoreOptions::default())
        .unwrap_err();
    assert!(matches!(err.as_recovery(), Some(RecoveryError::NoRestorePoint { .. })));
    assert_eq!(RecoveryAction::for_error(&err), RecoveryAction::Abort);
}
