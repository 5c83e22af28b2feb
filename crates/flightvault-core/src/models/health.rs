//! Health scoring results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict of a single integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Critical,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Outcome of one check against one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub weight: f64,
    /// Sub-score in [0, 100].
    pub score: f64,
    pub status: CheckStatus,
    /// What the check measured, for logs and reports.
    pub detail: String,
}

impl CheckResult {
    pub fn healthy(name: &str, weight: f64, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            weight,
            score: 100.0,
            status: CheckStatus::Healthy,
            detail: detail.into(),
        }
    }
}

/// Coarse rating of a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

/// Width of the warning band below the pass threshold.
const WARNING_BAND: f64 = 20.0;

/// Composite integrity score of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub table: String,
    pub as_of: DateTime<Utc>,
    /// Weighted average of check scores, in [0, 100].
    pub score: f64,
    pub threshold: f64,
    pub checks: Vec<CheckResult>,
}

impl HealthScore {
    /// Composite at or above threshold and no critical check.
    pub fn is_healthy(&self) -> bool {
        self.score >= self.threshold && !self.has_critical()
    }

    pub fn has_critical(&self) -> bool {
        self.checks.iter().any(|c| c.status == CheckStatus::Critical)
    }

    /// Checks that did not pass cleanly, worst first.
    pub fn failing_checks(&self) -> Vec<&CheckResult> {
        let mut failing: Vec<&CheckResult> = self
            .checks
            .iter()
            .filter(|c| c.status != CheckStatus::Healthy)
            .collect();
        failing.sort_by(|a, b| {
            b.status
                .cmp(&a.status)
                .then(a.score.total_cmp(&b.score))
        });
        failing
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Distance of the composite above the threshold (negative when below).
    pub fn margin(&self) -> f64 {
        self.score - self.threshold
    }

    pub fn level(&self) -> HealthLevel {
        if self.is_healthy() {
            HealthLevel::Healthy
        } else if self.has_critical() || self.score < self.threshold - WARNING_BAND {
            HealthLevel::Critical
        } else {
            HealthLevel::Warning
        }
    }
}
