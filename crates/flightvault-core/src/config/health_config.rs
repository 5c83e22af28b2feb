//! Health scorer configuration.

use serde::{Deserialize, Serialize};

/// Relative weight of each default check in the composite score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckWeights {
    pub record_count: f64,
    pub required_fields: f64,
    pub referential: f64,
    pub distribution: f64,
    pub record_retention: f64,
}

impl Default for CheckWeights {
    fn default() -> Self {
        Self {
            record_count: 0.25,
            required_fields: 0.20,
            referential: 0.20,
            distribution: 0.15,
            record_retention: 0.20,
        }
    }
}

impl CheckWeights {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("record_count", self.record_count),
            ("required_fields", self.required_fields),
            ("referential", self.referential),
            ("distribution", self.distribution),
            ("record_retention", self.record_retention),
        ]
        .into_iter()
    }
}

/// Configuration for the integrity checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub weights: CheckWeights,
    /// Critical when the count falls below this fraction of expected.
    pub min_count_fraction: f64,
    /// Penalized when the count grows beyond this multiple of expected.
    pub max_count_growth: f64,
    /// Null-ratio and distinct-ratio drift tolerated per field.
    pub distribution_threshold: f64,
    /// Mean shift tolerated, in baseline standard deviations.
    pub mean_shift_sigma: f64,
    /// Anchor records that may go missing before retention turns critical.
    pub max_lost_records: usize,
    /// Required-field violation fraction at which the check turns critical.
    pub required_critical_fraction: f64,
    /// Dangling reference fraction above which the check warns.
    pub referential_warning_fraction: f64,
    /// Dangling reference fraction above which the check turns critical.
    pub referential_critical_fraction: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            weights: CheckWeights::default(),
            min_count_fraction: 0.8,
            max_count_growth: 1.2,
            distribution_threshold: 0.2,
            mean_shift_sigma: 3.0,
            max_lost_records: 0,
            required_critical_fraction: 0.10,
            referential_warning_fraction: 0.05,
            referential_critical_fraction: 0.20,
        }
    }
}
