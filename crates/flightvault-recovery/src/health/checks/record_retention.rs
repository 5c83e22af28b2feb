use flightvault_core::models::{CheckResult, CheckStatus, Snapshot};

use super::result;
use crate::diff::{DiffAnalyzer, FieldReconciliation};
use crate::health::{HealthCheck, ScoringContext};

/// Records of the healthy anchor missing from the candidate.
#[derive(Debug, Clone)]
pub struct RecordRetentionCheck {
    weight: f64,
    max_lost: usize,
    analyzer: DiffAnalyzer,
}

impl RecordRetentionCheck {
    pub const NAME: &'static str = "record_retention";

    pub fn new(weight: f64, max_lost: usize, analyzer: DiffAnalyzer) -> Self {
        Self {
            weight,
            max_lost,
            analyzer,
        }
    }
}

impl HealthCheck for RecordRetentionCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult {
        let Some(anchor) = ctx.baseline.anchor.as_ref() else {
            return CheckResult::healthy(Self::NAME, self.weight, "no anchor");
        };
        if anchor.is_empty() {
            return CheckResult::healthy(Self::NAME, self.weight, "empty anchor");
        }

        let lost = match self
            .analyzer
            .diff_with(anchor, snapshot, &FieldReconciliation::MissingAsNull)
        {
            Ok(diff) => diff.summary.deleted,
            Err(e) => {
                return result(
                    Self::NAME,
                    self.weight,
                    0.0,
                    CheckStatus::Critical,
                    format!("anchor not comparable: {e}"),
                )
            }
        };

        let status = if lost > self.max_lost {
            CheckStatus::Critical
        } else if lost > 0 {
            CheckStatus::Warning
        } else {
            CheckStatus::Healthy
        };
        result(
            Self::NAME,
            self.weight,
            100.0 * (1.0 - lost as f64 / anchor.len() as f64),
            status,
            format!("{lost} of {} anchor records missing", anchor.len()),
        )
    }
}
