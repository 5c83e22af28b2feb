use flightvault_core::models::{CheckResult, CheckStatus, Snapshot};

use super::result;
use crate::health::{HealthCheck, ScoringContext};

/// Compares the record count to the baseline expectation.
///
/// Shortfall declines linearly; a count under `min_fraction` of expected is
/// critical. Growth beyond `max_growth` is penalized and turns critical past
/// twice that multiple.
#[derive(Debug, Clone)]
pub struct RecordCountCheck {
    weight: f64,
    min_fraction: f64,
    max_growth: f64,
}

impl RecordCountCheck {
    pub const NAME: &'static str = "record_count";

    pub fn new(weight: f64, min_fraction: f64, max_growth: f64) -> Self {
        Self {
            weight,
            min_fraction,
            max_growth,
        }
    }
}

impl HealthCheck for RecordCountCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult {
        let expected = ctx.baseline.expected_count;
        let actual = snapshot.len();
        if expected == 0 {
            return CheckResult::healthy(
                Self::NAME,
                self.weight,
                format!("{actual} records, no expectation"),
            );
        }

        let ratio = actual as f64 / expected as f64;
        let detail = format!("{actual} records, expected {expected} ({:.1}%)", ratio * 100.0);

        if ratio > self.max_growth {
            let score = 100.0 - (ratio - self.max_growth) * 100.0;
            let status = if ratio > 2.0 * self.max_growth {
                CheckStatus::Critical
            } else {
                CheckStatus::Warning
            };
            return result(Self::NAME, self.weight, score, status, detail);
        }
        if ratio >= 1.0 {
            return result(Self::NAME, self.weight, 100.0, CheckStatus::Healthy, detail);
        }

        let warn_below = 1.0 - (1.0 - self.min_fraction) / 2.0;
        let status = if ratio < self.min_fraction {
            CheckStatus::Critical
        } else if ratio < warn_below {
            CheckStatus::Warning
        } else {
            CheckStatus::Healthy
        };
        result(Self::NAME, self.weight, ratio * 100.0, status, detail)
    }
}
