//! Selective Restore Executor.
//!
//! Classifies every identity that differs between now and the target:
//! - deleted since the target: revert (re-insert)
//! - added since the target: preserve, ambiguous when it references a row
//!   lost since the target or was created inside the corruption window
//! - modified: revert when modified inside the corruption window, preserve
//!   after it, ambiguous when the modification time is unknown
//!
//! Caller rules override the defaults and manual decisions override rules.
//! Ambiguous entries are never applied.

mod apply;
mod classify;
mod dependency;
mod plan;

use flightvault_core::config::RestoreConfig;
use flightvault_core::errors::FlightVaultResult;
use flightvault_core::models::{RestoreOptions, RestorePlan, RestoreResult, Snapshot};
use flightvault_core::traits::ITemporalStore;

pub use classify::{CompiledRule, RuleSet};
pub use dependency::{validate as validate_dependencies, DependencyGraph, RelatedTables};

use crate::diff::DiffAnalyzer;
use plan::{build_plan, default_window, Planning};

/// Plans and applies record-selective restores.
#[derive(Debug, Clone)]
pub struct SelectiveRestoreExecutor {
    analyzer: DiffAnalyzer,
    config: RestoreConfig,
}

impl SelectiveRestoreExecutor {
    pub fn new(analyzer: DiffAnalyzer, config: RestoreConfig) -> Self {
        Self { analyzer, config }
    }

    pub fn config(&self) -> &RestoreConfig {
        &self.config
    }

    /// Classify every divergence between `current` and `target`.
    ///
    /// Without an explicit corruption window in `options`, the window is
    /// `(target, target + corruption_span]`.
    pub fn plan(
        &self,
        current: &Snapshot,
        target: &Snapshot,
        graph: &DependencyGraph,
        related: &RelatedTables,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestorePlan> {
        let planning = Planning {
            analyzer: &self.analyzer,
            graph,
            related,
            options,
            window: default_window(options, target.as_of(), self.config.corruption_span()),
        };
        build_plan(&planning, current, target)
    }

    /// Preview (`dry_run`) or execute a plan as one atomic batch.
    ///
    /// Dependency warnings block execution unless `options` allows them.
    pub fn apply(
        &self,
        store: &dyn ITemporalStore,
        plan: RestorePlan,
        dry_run: bool,
        options: &RestoreOptions,
    ) -> FlightVaultResult<RestoreResult> {
        apply::execute(
            store,
            plan,
            dry_run,
            options.allow_dependency_violations,
            self.config.verify_after_apply,
            &self.analyzer,
        )
    }
}
