//! Diff analyzer properties: completeness, symmetry, identity.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use flightvault_core::models::{DiffClass, RecordKey, Snapshot};
use flightvault_recovery::DiffAnalyzer;
use test_fixtures::seed;

/// What happens to one seeded airport between the two snapshots.
#[derive(Debug, Clone, Copy)]
enum Fate {
    Keep,
    Delete,
    Rename,
}

fn fate() -> impl Strategy<Value = Fate> {
    prop_oneof![Just(Fate::Keep), Just(Fate::Delete), Just(Fate::Rename)]
}

fn pair(fates: &[Fate], added: usize) -> (Snapshot, Snapshot) {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
    let n = fates.len();

    let before = seed::airports(n);
    let mut after = Vec::new();
    for (record, fate) in before.iter().zip(fates) {
        match fate {
            Fate::Keep => after.push(record.clone()),
            Fate::Delete => {}
            Fate::Rename => after.push(record.clone().with("name", "Renamed")),
        }
    }
    after.extend((n as i64 + 1..=(n + added) as i64).map(seed::airport));

    (
        Snapshot::new("airports", "airport_id", t0, before).unwrap(),
        Snapshot::new("airports", "airport_id", t1, after).unwrap(),
    )
}

proptest! {
    #[test]
    fn prop_every_identity_lands_in_exactly_one_class(
        fates in prop::collection::vec(fate(), 0..40),
        added in 0usize..10,
    ) {
        let (a, b) = pair(&fates, added);
        let diff = DiffAnalyzer::default().diff(&a, &b).unwrap();

        let deleted = fates.iter().filter(|f| matches!(f, Fate::Delete)).count();
        let renamed = fates.iter().filter(|f| matches!(f, Fate::Rename)).count();
        prop_assert_eq!(diff.summary.added, added);
        prop_assert_eq!(diff.summary.deleted, deleted);
        prop_assert_eq!(diff.summary.modified, renamed);
        prop_assert_eq!(diff.summary.unchanged, fates.len() - deleted - renamed);
        prop_assert_eq!(diff.summary.total_changes, added + deleted + renamed);
        prop_assert_eq!(diff.summary.net_change, b.len() as i64 - a.len() as i64);

        for id in 1..=(fates.len() + added) as i64 {
            let key = RecordKey::Int(id);
            let class = diff.class_of(&key);
            prop_assert!(class.is_some(), "identity {} missing from diff", id);
        }
    }

    #[test]
    fn prop_reversed_diff_swaps_added_and_deleted(
        fates in prop::collection::vec(fate(), 0..40),
        added in 0usize..10,
    ) {
        let (a, b) = pair(&fates, added);
        let analyzer = DiffAnalyzer::default();
        let forward = analyzer.diff(&a, &b).unwrap();
        let backward = analyzer.diff(&b, &a).unwrap();

        prop_assert_eq!(forward.added_keys(), backward.deleted_keys());
        prop_assert_eq!(forward.deleted_keys(), backward.added_keys());
        prop_assert_eq!(forward.modified_keys(), backward.modified_keys());
        for (f, b) in forward.modified.iter().zip(&backward.modified) {
            prop_assert_eq!(&f.before, &b.after);
            prop_assert_eq!(&f.after, &b.before);
        }
    }

    #[test]
    fn prop_snapshot_diffed_with_itself_is_empty(n in 0usize..60) {
        let (a, _) = pair(&vec![Fate::Keep; n], 0);
        let diff = DiffAnalyzer::default().diff(&a, &a).unwrap();
        prop_assert!(diff.is_empty());
        prop_assert_eq!(diff.summary.unchanged, n);
        for id in 1..=n as i64 {
            prop_assert_eq!(diff.class_of(&RecordKey::Int(id)), Some(DiffClass::Unchanged));
        }
    }
}
