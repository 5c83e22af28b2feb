use flightvault_core::models::{CheckResult, CheckStatus, Snapshot};

use super::result;
use crate::health::{field_keys, HealthCheck, ScoringContext};

/// Dangling references across every declared foreign key.
///
/// Self-references resolve against the snapshot. Targets missing from the
/// reference index are skipped.
#[derive(Debug, Clone)]
pub struct ReferentialIntegrityCheck {
    weight: f64,
    warning_fraction: f64,
    critical_fraction: f64,
}

impl ReferentialIntegrityCheck {
    pub const NAME: &'static str = "referential";

    pub fn new(weight: f64, warning_fraction: f64, critical_fraction: f64) -> Self {
        Self {
            weight,
            warning_fraction,
            critical_fraction,
        }
    }
}

impl HealthCheck for ReferentialIntegrityCheck {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &Snapshot, ctx: &ScoringContext<'_>) -> CheckResult {
        let mut references = 0usize;
        let mut dangling = 0usize;
        let mut skipped = Vec::new();

        for fk in &ctx.schema.foreign_keys {
            let own;
            let targets = if fk.references_table == snapshot.table() {
                own = field_keys(snapshot, &fk.references_field);
                &own
            } else {
                match ctx.references.keys(&fk.references_table, &fk.references_field) {
                    Some(keys) => keys,
                    None => {
                        skipped.push(fk.field.as_str());
                        continue;
                    }
                }
            };

            for record in snapshot.records() {
                if let Some(key) = record.value(&fk.field).to_key() {
                    references += 1;
                    if !targets.contains(&key) {
                        dangling += 1;
                    }
                }
            }
        }

        if references == 0 {
            let detail = if skipped.is_empty() {
                "no references".to_string()
            } else {
                format!("unindexed targets for {}", skipped.join(", "))
            };
            return CheckResult::healthy(Self::NAME, self.weight, detail);
        }

        let fraction = dangling as f64 / references as f64;
        let status = if fraction > self.critical_fraction {
            CheckStatus::Critical
        } else if fraction > self.warning_fraction {
            CheckStatus::Warning
        } else {
            CheckStatus::Healthy
        };
        result(
            Self::NAME,
            self.weight,
            100.0 * (1.0 - fraction),
            status,
            format!("{dangling} of {references} references dangling"),
        )
    }
}
