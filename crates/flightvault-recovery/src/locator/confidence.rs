//! Confidence of a located restore point.
//!
//! Three factors in [0, 1], weighted:
//! - margin: how far the suggestion scored above the pass threshold
//! - precision: halvings performed out of those needed to reach resolution
//! - stability: consecutive healthy probes stepping back from the boundary

use chrono::Duration;

use flightvault_core::models::CandidateWindow;

pub const MARGIN_WEIGHT: f64 = 0.4;
pub const PRECISION_WEIGHT: f64 = 0.3;
pub const STABILITY_WEIGHT: f64 = 0.3;

/// Measurements a confidence value is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub score: f64,
    pub threshold: f64,
    pub halvings_done: u32,
    pub halvings_needed: u32,
    pub stable_samples: u32,
    pub stability_target: u32,
}

impl ConfidenceInputs {
    pub fn margin_factor(&self) -> f64 {
        if self.score < self.threshold {
            return 0.0;
        }
        let headroom = 100.0 - self.threshold;
        if headroom <= f64::EPSILON {
            return 1.0;
        }
        ((self.score - self.threshold) / headroom).clamp(0.0, 1.0)
    }

    pub fn precision_factor(&self) -> f64 {
        if self.halvings_needed == 0 {
            return 1.0;
        }
        (self.halvings_done as f64 / self.halvings_needed as f64).min(1.0)
    }

    pub fn stability_factor(&self) -> f64 {
        if self.stability_target == 0 {
            return 1.0;
        }
        (self.stable_samples as f64 / self.stability_target as f64).min(1.0)
    }
}

/// Confidence as a percentage.
pub fn confidence(inputs: &ConfidenceInputs) -> f64 {
    let value = MARGIN_WEIGHT * inputs.margin_factor()
        + PRECISION_WEIGHT * inputs.precision_factor()
        + STABILITY_WEIGHT * inputs.stability_factor();
    (value * 100.0).clamp(0.0, 100.0)
}

/// Halvings needed to narrow `width` down to `resolution`.
pub fn halvings_needed(width: Duration, resolution: Duration) -> u32 {
    let width = width.num_milliseconds() as f64;
    let resolution = resolution.num_milliseconds().max(1) as f64;
    if width <= resolution {
        return 0;
    }
    (width / resolution).log2().ceil() as u32
}

/// `ceil(log2(window_minutes)) + slack`.
pub fn iteration_cap(window: &CandidateWindow, slack: u32) -> u32 {
    let minutes = window.minutes() as f64;
    minutes.log2().ceil().max(0.0) as u32 + slack
}
