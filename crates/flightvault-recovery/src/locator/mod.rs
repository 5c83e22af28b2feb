//! Smart Restore Locator: bounded binary search for the latest healthy
//! point of a table.
//!
//! State machine:
//! `Initialized → Searching → BoundaryFound → Validated → Terminal(outcome)`.
//! Degenerate paths jump straight to `Terminal`. The search assumes a single
//! contiguous corruption event; when stability probes contradict that, the
//! outcome degrades to `LowConfidence` instead of guessing.

mod confidence;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use flightvault_core::config::LocatorConfig;
use flightvault_core::errors::{FlightVaultResult, StoreError};
use flightvault_core::models::{
    CandidateWindow, HealthScore, LocateOutcome, LocateResult, LocatorState, ProbePurpose,
    ProbeRecord, SchemaDescriptor, Snapshot,
};
use flightvault_core::time::format_timestamp;
use flightvault_core::traits::ITemporalStore;

pub use confidence::{confidence, halvings_needed, iteration_cap, ConfidenceInputs};

use crate::health::{HealthBaseline, HealthScorer, ReferenceIndex, ScoringContext};

/// What to search.
#[derive(Debug, Clone, Copy)]
pub struct LocateRequest<'a> {
    pub schema: &'a SchemaDescriptor,
    /// Key sets of referenced tables' current state.
    pub references: &'a ReferenceIndex,
    pub window: CandidateWindow,
    /// Abort the search once this instant passes.
    pub deadline: Option<Instant>,
}

/// Binary-searches a window for the latest healthy snapshot.
pub struct SmartRestoreLocator {
    config: LocatorConfig,
    scorer: Arc<HealthScorer>,
}

impl SmartRestoreLocator {
    pub fn new(config: LocatorConfig, scorer: Arc<HealthScorer>) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn threshold(&self) -> f64 {
        self.scorer.threshold()
    }

    /// Run one search.
    ///
    /// Missing or expired points in time end the search as `Failed`. Other
    /// adapter errors are returned as errors.
    pub fn locate(
        &self,
        store: &dyn ITemporalStore,
        request: &LocateRequest<'_>,
    ) -> FlightVaultResult<LocateResult> {
        let started = Instant::now();
        let mut run = SearchRun::new(self, store, request);

        let result = match run.run() {
            Ok(result) => result,
            Err(Halt::Deadline) => run.deadline_exceeded(),
            Err(Halt::Store(e)) => match e {
                StoreError::NoSuchTimestamp { .. } | StoreError::OutOfRetentionWindow { .. } => {
                    run.failed(&e)
                }
                other => return Err(other.into()),
            },
        };

        info!(
            table = %result.table,
            outcome = ?result.outcome,
            confidence = result.confidence,
            iterations = result.iterations,
            probes = result.probes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "restore point search finished"
        );
        Ok(result)
    }
}

/// Why a search stopped early.
enum Halt {
    Deadline,
    Store(StoreError),
}

impl From<StoreError> for Halt {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[derive(Debug, Clone, Copy)]
struct Verdict {
    at: DateTime<Utc>,
    score: f64,
    healthy: bool,
}

struct SearchRun<'a> {
    locator: &'a SmartRestoreLocator,
    store: &'a dyn ITemporalStore,
    request: &'a LocateRequest<'a>,
    baseline: HealthBaseline,
    anchor: Option<Verdict>,
    states: Vec<LocatorState>,
    probes: Vec<ProbeRecord>,
    warnings: Vec<String>,
    iterations: u32,
    iteration_cap: u32,
}

impl<'a> SearchRun<'a> {
    fn new(
        locator: &'a SmartRestoreLocator,
        store: &'a dyn ITemporalStore,
        request: &'a LocateRequest<'a>,
    ) -> Self {
        Self {
            locator,
            store,
            request,
            baseline: HealthBaseline::empty(),
            anchor: None,
            states: vec![LocatorState::Initialized],
            probes: Vec::new(),
            warnings: Vec::new(),
            iterations: 0,
            iteration_cap: iteration_cap(&request.window, locator.config.iteration_slack),
        }
    }

    fn table(&self) -> &str {
        &self.request.schema.name
    }

    fn transition(&mut self, state: LocatorState) {
        debug!(table = self.table(), ?state, "locator transition");
        self.states.push(state);
    }

    fn fetch(&self, at: DateTime<Utc>) -> Result<Snapshot, Halt> {
        if let Some(deadline) = self.request.deadline {
            if Instant::now() >= deadline {
                return Err(Halt::Deadline);
            }
        }
        let schema = self.request.schema;
        Ok(self.store.snapshot_at(&schema.name, &schema.key_field, at)?)
    }

    fn score(&mut self, snapshot: &Snapshot, purpose: ProbePurpose) -> Verdict {
        let ctx = ScoringContext::new(self.request.schema, &self.baseline, self.request.references);
        let score = self.locator.scorer.score(snapshot, &ctx);
        self.record(&score, purpose)
    }

    fn record(&mut self, score: &HealthScore, purpose: ProbePurpose) -> Verdict {
        let healthy = score.is_healthy();
        let failing_checks: Vec<String> = score
            .failing_checks()
            .into_iter()
            .map(|c| c.name.clone())
            .collect();
        debug!(
            table = self.table(),
            at = %format_timestamp(&score.as_of),
            score = score.score,
            healthy,
            ?purpose,
            failing = ?failing_checks,
            "probe scored"
        );
        self.probes.push(ProbeRecord {
            at: score.as_of,
            score: score.score,
            healthy,
            purpose,
            failing_checks,
        });
        Verdict {
            at: score.as_of,
            score: score.score,
            healthy,
        }
    }

    fn probe(&mut self, at: DateTime<Utc>, purpose: ProbePurpose) -> Result<Verdict, Halt> {
        let snapshot = self.fetch(at)?;
        Ok(self.score(&snapshot, purpose))
    }

    fn run(&mut self) -> Result<LocateResult, Halt> {
        let window = self.request.window;
        let locator = self.locator;
        let config = &locator.config;
        let resolution = config.resolution();
        let samples = config.stability_samples;

        let anchor = self.fetch(window.start)?;
        self.baseline = HealthBaseline::from_snapshot(&anchor, self.request.schema);
        let start = self.score(&anchor, ProbePurpose::Anchor);
        self.anchor = Some(start);

        if !start.healthy {
            let warning = format!(
                "window start {} is unhealthy (score {:.1}); no earlier point was searched",
                format_timestamp(&start.at),
                start.score
            );
            warn!(table = self.table(), score = start.score, "window start is unhealthy");
            self.warnings.push(warning);
            return Ok(self.finish(
                LocateOutcome::LowConfidence,
                Some(start),
                None,
                0.0,
                "the earliest point of the window failed health checks".to_string(),
            ));
        }

        self.transition(LocatorState::Searching);
        let end = self.probe(window.end, ProbePurpose::WindowEnd)?;
        if end.healthy {
            self.transition(LocatorState::Validated);
            let confidence = confidence(&ConfidenceInputs {
                score: start.score,
                threshold: self.locator.threshold(),
                halvings_done: 0,
                halvings_needed: 0,
                stable_samples: samples,
                stability_target: samples,
            });
            return Ok(self.finish(
                LocateOutcome::Success,
                Some(start),
                None,
                confidence,
                "no corruption boundary detected in the window".to_string(),
            ));
        }

        let mut lo = start;
        let mut hi = end;
        while hi.at - lo.at > resolution && self.iterations < self.iteration_cap {
            let mid = lo.at + (hi.at - lo.at) / 2;
            self.iterations += 1;
            let verdict = self.probe(mid, ProbePurpose::Bisect)?;
            if verdict.healthy {
                lo = verdict;
            } else {
                hi = verdict;
            }
        }
        if hi.at - lo.at > resolution {
            warn!(table = self.table(), cap = self.iteration_cap, "iteration cap reached");
            self.warnings.push(format!(
                "iteration cap {} reached with the boundary bracketed to {}s",
                self.iteration_cap,
                (hi.at - lo.at).num_seconds()
            ));
        }
        self.transition(LocatorState::BoundaryFound);

        let (stable, contradicted) = self.stability(lo.at, samples)?;
        if !contradicted {
            self.transition(LocatorState::Validated);
        }

        let confidence = confidence(&ConfidenceInputs {
            score: lo.score,
            threshold: self.locator.threshold(),
            halvings_done: self.iterations,
            halvings_needed: halvings_needed(window.width(), resolution),
            stable_samples: stable,
            stability_target: samples,
        });

        let outcome = if contradicted || confidence < config.confidence_floor {
            LocateOutcome::LowConfidence
        } else {
            LocateOutcome::Success
        };
        let failing = self
            .probes
            .iter()
            .rev()
            .find(|p| p.at == hi.at)
            .map(|p| p.failing_checks.join(", "))
            .unwrap_or_default();
        let reason = format!(
            "latest healthy point {} (score {:.1}); first unhealthy point {} (score {:.1}, failing: {})",
            format_timestamp(&lo.at),
            lo.score,
            format_timestamp(&hi.at),
            hi.score,
            if failing.is_empty() {
                "composite below threshold"
            } else {
                failing.as_str()
            }
        );
        Ok(self.finish(outcome, Some(lo), Some(hi.at), confidence, reason))
    }

    /// Step back from `boundary` one resolution at a time. Points at or
    /// before the window start take the anchor's verdict.
    ///
    /// Returns the consecutive healthy count and whether an unhealthy probe
    /// contradicted the single-event assumption.
    fn stability(&mut self, boundary: DateTime<Utc>, samples: u32) -> Result<(u32, bool), Halt> {
        let start = self.request.window.start;
        let resolution = self.locator.config.resolution();
        let mut stable = 0;
        for k in 1..=samples {
            let at = boundary - resolution * k as i32;
            if at <= start {
                stable += samples - k + 1;
                break;
            }
            let verdict = self.probe(at, ProbePurpose::Stability)?;
            if !verdict.healthy {
                warn!(
                    table = self.table(),
                    at = %format_timestamp(&at),
                    "unhealthy point before the boundary"
                );
                self.warnings.push(format!(
                    "unhealthy snapshot at {} precedes the healthy boundary; corruption may not be a single event",
                    format_timestamp(&at)
                ));
                return Ok((stable, true));
            }
            stable += 1;
        }
        Ok((stable, false))
    }

    fn alternatives(&self, suggested: Option<DateTime<Utc>>) -> Vec<DateTime<Utc>> {
        let mut healthy: Vec<&ProbeRecord> = self
            .probes
            .iter()
            .filter(|p| p.healthy && Some(p.at) != suggested)
            .collect();
        healthy.sort_by(|a, b| b.score.total_cmp(&a.score).then(b.at.cmp(&a.at)));
        let mut out: Vec<DateTime<Utc>> = Vec::new();
        for probe in healthy {
            if out.len() >= self.locator.config.alternatives {
                break;
            }
            if !out.contains(&probe.at) {
                out.push(probe.at);
            }
        }
        out
    }

    fn finish(
        &mut self,
        outcome: LocateOutcome,
        suggested: Option<Verdict>,
        first_unhealthy: Option<DateTime<Utc>>,
        confidence: f64,
        reason: String,
    ) -> LocateResult {
        self.transition(LocatorState::Terminal(outcome));
        let suggested_at = suggested.map(|v| v.at);
        let alternatives = self.alternatives(suggested_at);
        LocateResult {
            table: self.table().to_string(),
            window: self.request.window,
            outcome,
            suggested_timestamp: suggested_at,
            first_unhealthy,
            confidence,
            suggested_score: suggested.map(|v| v.score),
            threshold: self.locator.threshold(),
            iterations: self.iterations,
            iteration_cap: self.iteration_cap,
            states: std::mem::take(&mut self.states),
            probes: std::mem::take(&mut self.probes),
            alternatives,
            warnings: std::mem::take(&mut self.warnings),
            reason,
            failure: None,
        }
    }

    fn deadline_exceeded(&mut self) -> LocateResult {
        warn!(table = self.table(), "search deadline exceeded");
        self.warnings
            .push("deadline exceeded; only the window start is a safe suggestion".to_string());
        let start = self.anchor.unwrap_or(Verdict {
            at: self.request.window.start,
            score: 0.0,
            healthy: false,
        });
        let mut result = self.finish(
            LocateOutcome::LowConfidence,
            Some(start),
            None,
            0.0,
            "search aborted by the caller's deadline".to_string(),
        );
        if self.anchor.is_none() {
            result.suggested_score = None;
        }
        result
    }

    fn failed(&mut self, error: &StoreError) -> LocateResult {
        warn!(table = self.table(), error = %error, "store could not answer");
        let mut result = self.finish(
            LocateOutcome::Failed,
            None,
            None,
            0.0,
            format!("the store could not answer a probe: {error}"),
        );
        result.failure = Some(error.to_string());
        result
    }
}
