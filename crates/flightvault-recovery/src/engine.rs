//! RecoveryEngine: the operations callers use.
//!
//! Each operation resolves the table's descriptor, takes the table guard,
//! fetches what it needs from the store, and hands plain values back. No
//! rows are cached between calls.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use flightvault_core::config::FlightVaultConfig;
use flightvault_core::errors::{FlightVaultResult, RecoveryError, StoreError};
use flightvault_core::models::{
    CandidateWindow, DiffResult, HealthScore, LocateOutcome, LocateResult, RestoreOptions,
    RestorePlan, RestoreResult, SchemaDescriptor, SchemaRegistry, Snapshot,
};
use flightvault_core::time::format_timestamp;
use flightvault_core::traits::ITemporalStore;

use crate::diff::{DiffAnalyzer, FieldReconciliation};
use crate::health::{HealthBaseline, HealthScorer, ReferenceIndex, ScoringContext};
use crate::locator::{LocateRequest, SmartRestoreLocator};
use crate::lock::TableLocks;
use crate::restore::{DependencyGraph, RelatedTables, SelectiveRestoreExecutor};

/// Temporal recovery over one store.
pub struct RecoveryEngine {
    store: Arc<dyn ITemporalStore>,
    config: FlightVaultConfig,
    registry: SchemaRegistry,
    graph: DependencyGraph,
    analyzer: DiffAnalyzer,
    scorer: Arc<HealthScorer>,
    locator: SmartRestoreLocator,
    executor: SelectiveRestoreExecutor,
    locks: TableLocks,
}

impl RecoveryEngine {
    /// Validate `config` and build an engine with the default check set.
    pub fn new(store: Arc<dyn ITemporalStore>, config: FlightVaultConfig) -> FlightVaultResult<Self> {
        config.validate()?;
        let registry = config.schema_registry();
        let graph = DependencyGraph::from_registry(&registry);
        let analyzer = DiffAnalyzer::from_config(&config.diff);
        let scorer = Arc::new(HealthScorer::new(
            &config.health,
            config.locator.pass_threshold,
            analyzer,
        ));
        let locator = SmartRestoreLocator::new(config.locator.clone(), Arc::clone(&scorer));
        let executor = SelectiveRestoreExecutor::new(analyzer, config.restore.clone());

        info!(
            tables = registry.len(),
            threshold = config.locator.pass_threshold,
            "recovery engine ready"
        );
        Ok(Self {
            store,
            config,
            registry,
            graph,
            analyzer,
            scorer,
            locator,
            executor,
            locks: TableLocks::new(),
        })
    }

    /// Replace the health scorer, e.g. to add custom checks.
    pub fn with_scorer(mut self, scorer: HealthScorer) -> Self {
        self.scorer = Arc::new(scorer);
        self.locator = SmartRestoreLocator::new(self.config.locator.clone(), Arc::clone(&self.scorer));
        self
    }

    /// Share an existing guard registry, e.g. between engines over the same
    /// store.
    pub fn with_locks(mut self, locks: TableLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &FlightVaultConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn locks(&self) -> &TableLocks {
        &self.locks
    }

    pub fn scorer(&self) -> &HealthScorer {
        &self.scorer
    }

    // ─── Diff ───────────────────────────────────────────────────────────────

    /// Field-level changes of `table` between two instants.
    pub fn diff(
        &self,
        table: &str,
        earlier: DateTime<Utc>,
        later: DateTime<Utc>,
    ) -> FlightVaultResult<DiffResult> {
        self.diff_with(table, earlier, later, &FieldReconciliation::Strict)
    }

    pub fn diff_with(
        &self,
        table: &str,
        earlier: DateTime<Utc>,
        later: DateTime<Utc>,
        reconciliation: &FieldReconciliation,
    ) -> FlightVaultResult<DiffResult> {
        if earlier > later {
            return Err(RecoveryError::InvalidWindow {
                reason: format!(
                    "diff of {table}: {} is after {}",
                    format_timestamp(&earlier),
                    format_timestamp(&later)
                ),
            }
            .into());
        }
        let schema = self.registry.get(table)?;
        let _guard = self.locks.acquire_shared(table, "diff")?;
        let before = self.snapshot(schema, earlier)?;
        let after = self.snapshot(schema, later)?;
        self.analyzer.diff_with(&before, &after, reconciliation)
    }

    // ─── Score ──────────────────────────────────────────────────────────────

    /// Health of `table` at `at`, against a baseline taken one lookback
    /// earlier. Without a retained baseline only absolute checks apply.
    pub fn score(&self, table: &str, at: DateTime<Utc>) -> FlightVaultResult<HealthScore> {
        let anchor_at = at - self.config.locator.lookback();
        self.score_against(table, at, Some(anchor_at))
    }

    /// Health of `table` at `at`, against the state at `anchor_at`.
    pub fn score_against(
        &self,
        table: &str,
        at: DateTime<Utc>,
        anchor_at: Option<DateTime<Utc>>,
    ) -> FlightVaultResult<HealthScore> {
        let schema = self.registry.get(table)?;
        let _guard = self.locks.acquire_shared(table, "score")?;

        let baseline = match anchor_at {
            Some(anchor_at) => match self.snapshot(schema, anchor_at) {
                Ok(anchor) => HealthBaseline::from_snapshot(&anchor, schema),
                Err(e) if is_unanswerable(&e) => {
                    warn!(table, error = %e, "baseline unavailable; scoring without one");
                    HealthBaseline::empty()
                }
                Err(e) => return Err(e.into()),
            },
            None => HealthBaseline::empty(),
        };

        let snapshot = self.snapshot(schema, at)?;
        let references = self.references(schema)?;
        let ctx = ScoringContext::new(schema, &baseline, &references);
        Ok(self.scorer.score(&snapshot, &ctx))
    }

    // ─── Locate ─────────────────────────────────────────────────────────────

    /// Search `window` for the latest healthy point of `table`.
    pub fn locate_restore_point(
        &self,
        table: &str,
        window: CandidateWindow,
        deadline: Option<Instant>,
    ) -> FlightVaultResult<LocateResult> {
        let schema = self.registry.get(table)?;
        let _guard = self.locks.acquire_shared(table, "locate")?;
        let references = self.references(schema)?;
        let request = LocateRequest {
            schema,
            references: &references,
            window,
            deadline,
        };
        self.locator.locate(self.store.as_ref(), &request)
    }

    /// Search the configured lookback ending now.
    pub fn locate_recent(&self, table: &str) -> FlightVaultResult<LocateResult> {
        let window = CandidateWindow::ending_at(Utc::now(), self.config.locator.lookback())?;
        self.locate_restore_point(table, window, None)
    }

    /// Search several tables in parallel. Results keep the input order.
    pub fn locate_many(
        &self,
        tables: &[&str],
        window: CandidateWindow,
        deadline: Option<Instant>,
    ) -> Vec<(String, FlightVaultResult<LocateResult>)> {
        tables
            .par_iter()
            .map(|table| {
                (
                    table.to_string(),
                    self.locate_restore_point(table, window, deadline),
                )
            })
            .collect()
    }

    // ─── Restore ────────────────────────────────────────────────────────────

    /// Classify every divergence of `table` between now and `target`.
    pub fn plan_restore(
        &self,
        table: &str,
        target: DateTime<Utc>,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestorePlan> {
        let schema = self.registry.get(table)?;
        let _guard = self.locks.acquire_shared(table, "plan")?;
        self.build_plan(schema, target, options)
    }

    /// Restore `table` selectively to its state at `target`.
    ///
    /// A dry run only plans. A real run holds the table exclusively and
    /// applies every revert in one atomic batch.
    pub fn selective_restore(
        &self,
        table: &str,
        target: DateTime<Utc>,
        dry_run: bool,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestoreResult> {
        let schema = self.registry.get(table)?;
        let _guard = if dry_run {
            self.locks.acquire_shared(table, "restore preview")?
        } else {
            self.locks.acquire_exclusive(table, "restore")?
        };

        let plan = self.build_plan(schema, target, options)?;
        let result = self
            .executor
            .apply(self.store.as_ref(), plan, dry_run, options)?;
        info!(
            table,
            target = %format_timestamp(&target),
            dry_run,
            restored = result.restored,
            removed = result.removed,
            preserved = result.preserved,
            ambiguous = result.ambiguous,
            final_count = result.final_record_count,
            duration_ms = result.duration_ms,
            "selective restore finished"
        );
        Ok(result)
    }

    /// Restore to a located point.
    ///
    /// Refuses a destructive run below the confidence floor unless the
    /// caller confirms. The corruption window defaults to the one the search
    /// bracketed.
    pub fn restore_located(
        &self,
        located: &LocateResult,
        dry_run: bool,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestoreResult> {
        let target = match (located.outcome, located.suggested_timestamp) {
            (LocateOutcome::Failed, _) | (_, None) => {
                return Err(RecoveryError::NoRestorePoint {
                    table: located.table.clone(),
                    reason: located.reason.clone(),
                }
                .into())
            }
            (_, Some(target)) => target,
        };

        let floor = self.config.locator.confidence_floor;
        let below_floor =
            located.outcome == LocateOutcome::LowConfidence || located.confidence < floor;
        if !dry_run
            && below_floor
            && self.config.restore.require_confirmation_below_floor
            && !options.confirm_low_confidence
        {
            warn!(
                table = %located.table,
                confidence = located.confidence,
                floor,
                "refusing unconfirmed restore below the confidence floor"
            );
            return Err(RecoveryError::LowConfidence {
                table: located.table.clone(),
                confidence: located.confidence,
                floor,
            }
            .into());
        }

        let mut options = options.clone();
        if options.corruption_window.is_none() {
            options.corruption_window =
                located.corruption_window(self.config.restore.corruption_span());
        }
        self.selective_restore(&located.table, target, dry_run, &options)
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn snapshot(&self, schema: &SchemaDescriptor, at: DateTime<Utc>) -> Result<Snapshot, StoreError> {
        self.store.snapshot_at(&schema.name, &schema.key_field, at)
    }

    fn current(&self, schema: &SchemaDescriptor) -> Result<Snapshot, StoreError> {
        self.store.current(&schema.name, &schema.key_field)
    }

    /// Current key sets of every table `schema` references.
    fn references(&self, schema: &SchemaDescriptor) -> FlightVaultResult<ReferenceIndex> {
        let mut index = ReferenceIndex::new();
        for fk in &schema.foreign_keys {
            if fk.references_table == schema.name
                || index.is_indexed(&fk.references_table, &fk.references_field)
            {
                continue;
            }
            let referenced = self.registry.get(&fk.references_table)?;
            match self.current(referenced) {
                Ok(snapshot) => index.index_snapshot(&snapshot, &fk.references_field),
                Err(StoreError::UnknownTable { .. }) => {
                    warn!(table = %fk.references_table, "referenced table is not in the store");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(index)
    }

    fn build_plan(
        &self,
        schema: &SchemaDescriptor,
        target: DateTime<Utc>,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestorePlan> {
        let current = self.current(schema)?;
        let at_target = self.snapshot(schema, target)?;
        let related = self.related(schema, target)?;
        self.executor
            .plan(&current, &at_target, &self.graph, &related, options)
    }

    /// Current and target states of tables linked to `schema` by a foreign
    /// key. A target the store no longer retains is left out.
    fn related(&self, schema: &SchemaDescriptor, target: DateTime<Utc>) -> FlightVaultResult<RelatedTables> {
        let mut related = RelatedTables::new();
        for table in self.graph.related_tables(&schema.name) {
            let Ok(other) = self.registry.get(&table) else {
                continue;
            };
            match self.current(other) {
                Ok(snapshot) => related.insert_current(snapshot),
                Err(StoreError::UnknownTable { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
            match self.snapshot(other, target) {
                Ok(snapshot) => related.insert_at_target(snapshot),
                Err(e) if is_unanswerable(&e) => {
                    warn!(table = %table, error = %e, "related table has no state at the target");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(related)
    }
}

fn is_unanswerable(error: &StoreError) -> bool {
    matches!(
        error,
        StoreError::NoSuchTimestamp { .. } | StoreError::OutOfRetentionWindow { .. }
    )
}
