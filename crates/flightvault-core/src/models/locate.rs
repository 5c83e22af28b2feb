//! Restore point search types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FlightVaultResult, RecoveryError};
use crate::time::format_timestamp;

/// Closed search interval `[start, end]`. The start is assumed healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CandidateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> FlightVaultResult<Self> {
        if start >= end {
            return Err(RecoveryError::InvalidWindow {
                reason: format!(
                    "window start {} is not before end {}",
                    format_timestamp(&start),
                    format_timestamp(&end)
                ),
            }
            .into());
        }
        Ok(Self { start, end })
    }

    /// `[end - lookback, end]`.
    pub fn ending_at(end: DateTime<Utc>, lookback: Duration) -> FlightVaultResult<Self> {
        Self::new(end - lookback, end)
    }

    pub fn width(&self) -> Duration {
        self.end - self.start
    }

    /// Width in whole minutes, at least one.
    pub fn minutes(&self) -> i64 {
        self.width().num_minutes().max(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Terminal verdict of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateOutcome {
    Success,
    LowConfidence,
    Failed,
}

/// Locator state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorState {
    Initialized,
    Searching,
    BoundaryFound,
    Validated,
    Terminal(LocateOutcome),
}

impl LocatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Why a snapshot was probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbePurpose {
    Anchor,
    WindowEnd,
    Bisect,
    Stability,
}

/// One scored probe in the search log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub at: DateTime<Utc>,
    pub score: f64,
    pub healthy: bool,
    pub purpose: ProbePurpose,
    /// Names of checks that failed at this probe.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_checks: Vec<String>,
}

/// Interval in which corrupting changes are assumed to have happened:
/// `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorruptionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CorruptionWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end: end.max(start) }
    }

    /// `(target, target + span]`.
    pub fn after(target: DateTime<Utc>, span: Duration) -> Self {
        Self::new(target, target + span)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start < at && at <= self.end
    }

    pub fn is_after(&self, at: DateTime<Utc>) -> bool {
        at > self.end
    }
}

impl fmt::Display for CorruptionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}]",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

/// Everything a search produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocateResult {
    pub table: String,
    pub window: CandidateWindow,
    pub outcome: LocateOutcome,
    /// Latest instant judged healthy. `None` only when the search failed.
    pub suggested_timestamp: Option<DateTime<Utc>>,
    /// Earliest instant judged unhealthy, when a boundary was bracketed.
    pub first_unhealthy: Option<DateTime<Utc>>,
    /// 0 to 100.
    pub confidence: f64,
    pub suggested_score: Option<f64>,
    pub threshold: f64,
    pub iterations: u32,
    pub iteration_cap: u32,
    pub states: Vec<LocatorState>,
    pub probes: Vec<ProbeRecord>,
    /// Other healthy instants, best first.
    pub alternatives: Vec<DateTime<Utc>>,
    pub warnings: Vec<String>,
    pub reason: String,
    /// Adapter error detail for failed searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl LocateResult {
    pub fn is_success(&self) -> bool {
        self.outcome == LocateOutcome::Success
    }

    /// Final state of the trace.
    pub fn final_state(&self) -> Option<LocatorState> {
        self.states.last().copied()
    }

    /// Interval the corrupting changes fall into. Ends at the first
    /// unhealthy probe, but never before `suggested + span`.
    pub fn corruption_window(&self, span: Duration) -> Option<CorruptionWindow> {
        let start = self.suggested_timestamp?;
        let end = match self.first_unhealthy {
            Some(hi) => hi.max(start + span),
            None => start + span,
        };
        Some(CorruptionWindow::new(start, end))
    }
}
