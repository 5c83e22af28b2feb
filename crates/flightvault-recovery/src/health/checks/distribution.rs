use flightvault_core::models::{CheckResult, CheckStatus, Snapshot};

use super::result;
use crate::health::{FieldProfile, HealthCheck, ScoringContext};

/// Drift of per-field statistics from the baseline.
///
/// Drift of a field is the largest of its null-ratio and distinct-ratio
/// deviation over `threshold`, and its mean shift in baseline standard
/// deviations over `mean_shift_sigma`. A drift of 1 reaches the limit.
#[derive(Debug, Clone)]
pub struct DistributionCheck {
    weight: f64,
    threshold: f64,
    mean_shift_sigma: f64,
}

impl DistributionCheck {
    pub const NAME: &'static str = "distribution";

    pub fn new(weight: f64, threshold: f64, mean_shift_sigma: f64) -> Self {
        Self {
            weight,
            threshold,
            mean_shift_sigma,
        }
    }

    fn drift(&self, base: &FieldProfile, now: &FieldProfile) -> f64 {
        let null_drift = (now.null_ratio - base.null_ratio).abs() / self.threshold;
        let distinct_drift = (now.distinct_ratio - base.distinct_ratio).abs() / self.threshold;
        let mean_drift = match (base.mean, base.std_dev, now.mean) {
            (Some(m0), Some(sd), Some(m1)) if sd > f64::EPSILON => {
                (m1 - m0).abs() / sd / self.mean_shift_sigma
            }
            _ => 0.0,
        };
        null_drift.max(distinct_drift).max(mean_drift)
    }
}

impl HealthCheck for DistributionCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult {
        if ctx.baseline.fields.is_empty() || snapshot.is_empty() {
            return CheckResult::healthy(Self::NAME, self.weight, "no baseline profile");
        }

        let mut worst = 0.0f64;
        let mut worst_field = "";
        for (field, base) in &ctx.baseline.fields {
            let now = FieldProfile::measure(snapshot, field);
            let drift = self.drift(base, &now);
            if drift > worst {
                worst = drift;
                worst_field = field.as_str();
            }
        }

        let status = if worst <= 0.5 {
            CheckStatus::Healthy
        } else if worst <= 1.0 {
            CheckStatus::Warning
        } else {
            CheckStatus::Critical
        };
        let detail = if worst_field.is_empty() {
            "no drift".to_string()
        } else {
            format!("largest drift {worst:.2} on {worst_field}")
        };
        result(Self::NAME, self.weight, 100.0 * (1.0 - worst / 2.0), status, detail)
    }
}
