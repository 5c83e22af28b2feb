//! # flightvault-recovery
//!
//! Temporal recovery engine over an `ITemporalStore`:
//! - `diff`: field-level comparison of two snapshots
//! - `health`: composite integrity score with pluggable checks
//! - `locator`: bounded binary search for the latest healthy point
//! - `restore`: record-selective, atomic, previewable restores
//!
//! `RecoveryEngine` ties them together behind per-table guards.

pub mod diff;
pub mod engine;
pub mod health;
pub mod locator;
pub mod lock;
pub mod restore;

pub use diff::{DiffAnalyzer, FieldReconciliation};
pub use engine::RecoveryEngine;
pub use health::{HealthBaseline, HealthCheck, HealthScorer, ReferenceIndex, ScoringContext};
pub use locator::{LocateRequest, SmartRestoreLocator};
pub use lock::{LockMode, TableGuard, TableLocks};
pub use restore::{DependencyGraph, RelatedTables, SelectiveRestoreExecutor};
