//! Smart restore locator configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the restore point search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Default search window, ending now.
    pub lookback_hours: u64,
    /// Search stops once the bracket is this narrow.
    pub resolution_seconds: u64,
    /// Composite score a snapshot needs to count as healthy.
    pub pass_threshold: f64,
    /// Below this confidence a located point is not executed without
    /// confirmation.
    pub confidence_floor: f64,
    /// Added to `ceil(log2(window_minutes))` to form the iteration cap.
    pub iteration_slack: u32,
    /// Healthy probes stepping back from the boundary.
    pub stability_samples: u32,
    /// Alternative healthy timestamps reported.
    pub alternatives: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            resolution_seconds: 60,
            pass_threshold: 80.0,
            confidence_floor: 50.0,
            iteration_slack: 4,
            stability_samples: 3,
            alternatives: 3,
        }
    }
}

impl LocatorConfig {
    pub fn lookback(&self) -> Duration {
        Duration::hours(self.lookback_hours as i64)
    }

    pub fn resolution(&self) -> Duration {
        Duration::seconds(self.resolution_seconds as i64)
    }
}
