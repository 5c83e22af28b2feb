//! Health scorer properties: bounded scores, monotone in lost records.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use flightvault_core::config::HealthConfig;
use flightvault_core::models::{CheckResult, CheckStatus, Record, Snapshot};
use flightvault_recovery::health::weighted_average;
use flightvault_recovery::{DiffAnalyzer, HealthBaseline, HealthScorer, ReferenceIndex, ScoringContext};
use test_fixtures::{schemas, seed};

fn snapshot(records: Vec<Record>) -> Snapshot {
    let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Snapshot::new("airports", "airport_id", t, records).unwrap()
}

fn scorer() -> HealthScorer {
    HealthScorer::new(&HealthConfig::default(), 80.0, DiffAnalyzer::default())
}

proptest! {
    #[test]
    fn prop_scores_stay_within_bounds(
        n in 1usize..80,
        removed in prop::collection::btree_set(1i64..80, 0..40),
        blanked in prop::collection::btree_set(1i64..80, 0..40),
    ) {
        let schema = schemas::airports();
        let anchor = snapshot(seed::airports(n));
        let baseline = HealthBaseline::from_snapshot(&anchor, &schema);
        let references = ReferenceIndex::new();

        let records = seed::airports(n)
            .into_iter()
            .zip(1i64..)
            .filter(|(_, id)| !removed.contains(id))
            .map(|(r, id)| if blanked.contains(&id) { r.with("city", "") } else { r })
            .collect();
        let score = scorer().score(&snapshot(records), &ScoringContext::new(&schema, &baseline, &references));

        prop_assert!((0.0..=100.0).contains(&score.score));
        for check in &score.checks {
            prop_assert!((0.0..=100.0).contains(&check.score), "{} out of range", check.name);
        }
        if score.has_critical() {
            prop_assert!(!score.is_healthy());
        }
    }

    #[test]
    fn prop_losing_more_records_never_raises_the_score(n in 10usize..120, a in 0usize..10, b in 0usize..10) {
        let schema = schemas::airports();
        let all = seed::airports(n);
        let baseline = HealthBaseline {
            fields: Default::default(),
            ..HealthBaseline::from_snapshot(&snapshot(all.clone()), &schema)
        };
        let references = ReferenceIndex::new();
        let ctx = ScoringContext::new(&schema, &baseline, &references);
        let scorer = scorer();

        let (fewer, more) = (a.min(b), a.max(b));
        let lighter = scorer.score(&snapshot(all[fewer..].to_vec()), &ctx);
        let heavier = scorer.score(&snapshot(all[more..].to_vec()), &ctx);
        prop_assert!(heavier.score <= lighter.score);
    }

    #[test]
    fn prop_weighted_average_is_bounded(
        parts in prop::collection::vec((-50.0f64..150.0, -1.0f64..3.0), 0..8),
    ) {
        let results: Vec<CheckResult> = parts
            .iter()
            .enumerate()
            .map(|(i, (score, weight))| CheckResult {
                name: format!("check_{i}"),
                weight: *weight,
                score: *score,
                status: CheckStatus::Healthy,
                detail: String::new(),
            })
            .collect();
        let avg = weighted_average(&results);
        prop_assert!((0.0..=100.0).contains(&avg));
    }
}
