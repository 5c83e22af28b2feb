//! Recovery benchmarks over the in-memory store.
//!
//! diff of 10K records, composite scoring, a 24h boundary search, and a
//! dry-run restore plan after a mass deletion.

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

use flightvault_core::config::HealthConfig;
use flightvault_core::models::{CandidateWindow, RecordKey, RestoreOptions, Snapshot};
use flightvault_recovery::{DiffAnalyzer, HealthBaseline, HealthScorer, RecoveryEngine, ReferenceIndex, ScoringContext};
use test_fixtures::{airline_config, at, hours_ago, schemas, seed, AirlineScenario};

fn snapshots(n: usize) -> (Snapshot, Snapshot) {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let before = seed::airports(n);
    let after = before
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 50 != 0)
        .map(|(i, r)| if i % 20 == 0 { r.clone().with("city", "Moved") } else { r.clone() })
        .collect();
    (
        Snapshot::new("airports", "airport_id", t0, before).unwrap(),
        Snapshot::new("airports", "airport_id", t0 + Duration::hours(1), after).unwrap(),
    )
}

/// Scenario with 9 airports deleted five hours ago.
fn corrupted_engine(n: usize) -> RecoveryEngine {
    let s = AirlineScenario::airports_only(hours_ago(30), n).unwrap();
    let corrupted_at = at(hours_ago(5), 2);
    for i in 0..9 {
        s.store.delete("airports", &RecordKey::Int(1 + 8 * i), corrupted_at).unwrap();
    }
    RecoveryEngine::new(s.store.clone(), airline_config()).unwrap()
}

fn bench_diff_10k(c: &mut Criterion) {
    let (a, b) = snapshots(10_000);
    let analyzer = DiffAnalyzer::default();

    c.bench_function("diff_10k", |bench| {
        bench.iter(|| analyzer.diff(&a, &b).unwrap());
    });
}

fn bench_score_10k(c: &mut Criterion) {
    let (a, b) = snapshots(10_000);
    let schema = schemas::airports();
    let baseline = HealthBaseline::from_snapshot(&a, &schema);
    let references = ReferenceIndex::new();
    let scorer = HealthScorer::new(&HealthConfig::default(), 80.0, DiffAnalyzer::default());
    let ctx = ScoringContext::new(&schema, &baseline, &references);

    c.bench_function("health_score_10k", |bench| {
        bench.iter(|| scorer.score(&b, &ctx));
    });
}

fn bench_locate_24h(c: &mut Criterion) {
    let engine = corrupted_engine(2_000);
    let window = CandidateWindow::ending_at(Utc::now(), Duration::hours(24)).unwrap();

    c.bench_function("locate_24h_2k", |bench| {
        bench.iter(|| engine.locate_restore_point("airports", window, None).unwrap());
    });
}

fn bench_restore_plan(c: &mut Criterion) {
    let engine = corrupted_engine(2_000);
    let target = at(hours_ago(6), 0);

    c.bench_function("restore_dry_run_2k", |bench| {
        bench.iter(|| {
            engine
                .selective_restore("airports", target, true, &RestoreOptions::default())
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_diff_10k,
    bench_score_10k,
    bench_locate_24h,
    bench_restore_plan
);
criterion_main!(benches);
