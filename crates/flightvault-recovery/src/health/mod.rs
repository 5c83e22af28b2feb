//! Health Scorer: composite integrity score of a snapshot.
//!
//! Each check yields a sub-score in [0, 100] and a status. The composite is
//! the weighted average of the sub-scores. A snapshot is healthy when the
//! composite reaches the pass threshold and no check is critical.

mod baseline;
pub mod checks;
mod reference;

use tracing::debug;

use flightvault_core::config::HealthConfig;
use flightvault_core::models::{CheckResult, HealthScore, SchemaDescriptor, Snapshot};

pub use baseline::{FieldProfile, HealthBaseline};
pub use reference::{field_keys, ReferenceIndex};

use crate::diff::DiffAnalyzer;
use checks::{
    DistributionCheck, RecordCountCheck, RecordRetentionCheck, ReferentialIntegrityCheck,
    RequiredFieldsCheck,
};

/// Everything a check may consult besides the snapshot itself.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub schema: &'a SchemaDescriptor,
    pub baseline: &'a HealthBaseline,
    pub references: &'a ReferenceIndex,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        schema: &'a SchemaDescriptor,
        baseline: &'a HealthBaseline,
        references: &'a ReferenceIndex,
    ) -> Self {
        Self {
            schema,
            baseline,
            references,
        }
    }
}

/// One integrity check. Implementations must be pure functions of their
/// inputs.
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// Relative weight in the composite. Zero excludes the check from the
    /// average but its status still counts.
    fn weight(&self) -> f64;

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult;
}

/// Runs a set of checks and combines them.
pub struct HealthScorer {
    checks: Vec<Box<dyn HealthCheck>>,
    threshold: f64,
}

impl HealthScorer {
    /// Scorer with the default check set.
    pub fn new(config: &HealthConfig, threshold: f64, analyzer: DiffAnalyzer) -> Self {
        let w = &config.weights;
        let checks: Vec<Box<dyn HealthCheck>> = vec![
            Box::new(RecordCountCheck::new(
                w.record_count,
                config.min_count_fraction,
                config.max_count_growth,
            )),
            Box::new(RequiredFieldsCheck::new(
                w.required_fields,
                config.required_critical_fraction,
            )),
            Box::new(ReferentialIntegrityCheck::new(
                w.referential,
                config.referential_warning_fraction,
                config.referential_critical_fraction,
            )),
            Box::new(DistributionCheck::new(
                w.distribution,
                config.distribution_threshold,
                config.mean_shift_sigma,
            )),
            Box::new(RecordRetentionCheck::new(
                w.record_retention,
                config.max_lost_records,
                analyzer,
            )),
        ];
        Self { checks, threshold }
    }

    /// Scorer with no checks; add them with [`HealthScorer::add_check`].
    pub fn empty(threshold: f64) -> Self {
        Self {
            checks: Vec::new(),
            threshold,
        }
    }

    pub fn add_check(&mut self, check: Box<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn with_check(mut self, check: Box<dyn HealthCheck>) -> Self {
        self.add_check(check);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn score(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> HealthScore {
        let results: Vec<CheckResult> = self
            .checks
            .iter()
            .map(|check| {
                let mut result = check.evaluate(snapshot, ctx);
                result.score = if result.score.is_finite() {
                    result.score.clamp(0.0, 100.0)
                } else {
                    0.0
                };
                result
            })
            .collect();

        let score = weighted_average(&results);
        debug!(
            table = snapshot.table(),
            as_of = %snapshot.as_of(),
            score,
            "snapshot scored"
        );

        HealthScore {
            table: snapshot.table().to_string(),
            as_of: snapshot.as_of(),
            score,
            threshold: self.threshold,
            checks: results,
        }
    }
}

/// Weighted average of sub-scores, ignoring non-finite or non-positive
/// weights. No usable weight yields 100.
pub fn weighted_average(results: &[CheckResult]) -> f64 {
    let valid: Vec<&CheckResult> = results
        .iter()
        .filter(|r| r.score.is_finite() && r.weight.is_finite() && r.weight > 0.0)
        .collect();

    let total_weight: f64 = valid.iter().map(|r| r.weight).sum();
    if total_weight <= 0.0 {
        return 100.0;
    }

    let weighted_sum: f64 = valid.iter().map(|r| r.score * r.weight).sum();
    (weighted_sum / total_weight).clamp(0.0, 100.0)
}
