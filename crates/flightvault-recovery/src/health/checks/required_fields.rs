use flightvault_core::models::{CheckResult, CheckStatus, Snapshot};

use super::result;
use crate::health::{HealthCheck, ScoringContext};

/// Fraction of records with a null or empty value in a non-nullable field.
#[derive(Debug, Clone)]
pub struct RequiredFieldsCheck {
    weight: f64,
    critical_fraction: f64,
}

impl RequiredFieldsCheck {
    pub const NAME: &'static str = "required_fields";

    pub fn new(weight: f64, critical_fraction: f64) -> Self {
        Self {
            weight,
            critical_fraction,
        }
    }
}

impl HealthCheck for RequiredFieldsCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult {
        let required = &ctx.schema.required_fields;
        if required.is_empty() || snapshot.is_empty() {
            return CheckResult::healthy(Self::NAME, self.weight, "nothing to check");
        }

        let violating = snapshot
            .records()
            .filter(|r| required.iter().any(|f| r.value(f).is_null_or_empty()))
            .count();
        let fraction = violating as f64 / snapshot.len() as f64;

        let status = if violating == 0 {
            CheckStatus::Healthy
        } else if fraction < self.critical_fraction {
            CheckStatus::Warning
        } else {
            CheckStatus::Critical
        };
        result(
            Self::NAME,
            self.weight,
            100.0 * (1.0 - fraction),
            status,
            format!("{violating} of {} records missing a required value", snapshot.len()),
        )
    }
}
