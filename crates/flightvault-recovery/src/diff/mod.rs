//! Diff Analyzer: field-level comparison of two snapshots of one table.
//!
//! Invariants:
//! - added, deleted, modified, and unchanged partition the union of
//!   identities of both snapshots
//! - every modified entry carries at least one field change
//! - diff(a, b).added == diff(b, a).deleted, and modified identities match
//! - output is ordered by identity

mod compare;

use std::collections::BTreeSet;

use tracing::debug;

use flightvault_core::config::DiffConfig;
use flightvault_core::errors::{FlightVaultResult, RecoveryError};
use flightvault_core::models::{
    DiffResult, DiffSummary, KeyedRecord, ModifiedRecord, Normalization, Snapshot,
};

pub use compare::compare_records;

/// How to treat fields present in one snapshot and absent from the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldReconciliation {
    /// Differing field sets are a schema mismatch.
    #[default]
    Strict,
    /// Leave these fields out of the comparison entirely.
    Ignore(BTreeSet<String>),
    /// Compare a missing field as NULL.
    MissingAsNull,
}

impl FieldReconciliation {
    pub fn ignore<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Ignore(fields.into_iter().map(Into::into).collect())
    }

    pub(crate) fn ignored(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Ignore(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Stateless snapshot comparator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffAnalyzer {
    normalization: Normalization,
}

impl DiffAnalyzer {
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(config.normalization())
    }

    pub fn normalization(&self) -> &Normalization {
        &self.normalization
    }

    /// Compare with strict field-set checking.
    pub fn diff(&self, earlier: &Snapshot, later: &Snapshot) -> FlightVaultResult<DiffResult> {
        self.diff_with(earlier, later, &FieldReconciliation::Strict)
    }

    pub fn diff_with(
        &self,
        earlier: &Snapshot,
        later: &Snapshot,
        reconciliation: &FieldReconciliation,
    ) -> FlightVaultResult<DiffResult> {
        check_compatible(earlier, later, reconciliation)?;
        let ignored = reconciliation.ignored();

        let mut added = Vec::new();
        let mut deleted = Vec::new();
        let mut modified = Vec::new();
        let mut unchanged = Vec::new();

        for (key, before) in earlier.iter() {
            match later.get(key) {
                None => deleted.push(KeyedRecord {
                    key: key.clone(),
                    record: before.clone(),
                }),
                Some(after) => {
                    let changes = compare_records(before, after, &self.normalization, ignored);
                    if changes.is_empty() {
                        unchanged.push(key.clone());
                    } else {
                        modified.push(ModifiedRecord {
                            key: key.clone(),
                            before: before.clone(),
                            after: after.clone(),
                            changes,
                        });
                    }
                }
            }
        }
        for (key, after) in later.iter() {
            if !earlier.contains(key) {
                added.push(KeyedRecord {
                    key: key.clone(),
                    record: after.clone(),
                });
            }
        }

        let summary = DiffSummary {
            count_before: earlier.len(),
            count_after: later.len(),
            added: added.len(),
            deleted: deleted.len(),
            modified: modified.len(),
            unchanged: unchanged.len(),
            total_changes: added.len() + deleted.len() + modified.len(),
            net_change: later.len() as i64 - earlier.len() as i64,
        };
        debug!(
            table = earlier.table(),
            added = summary.added,
            deleted = summary.deleted,
            modified = summary.modified,
            unchanged = summary.unchanged,
            "snapshot diff computed"
        );

        Ok(DiffResult {
            table: earlier.table().to_string(),
            earlier_as_of: earlier.as_of(),
            later_as_of: later.as_of(),
            added,
            deleted,
            modified,
            unchanged,
            summary,
        })
    }
}

/// Compare two snapshots with default normalization and strict field sets.
pub fn diff(earlier: &Snapshot, later: &Snapshot) -> FlightVaultResult<DiffResult> {
    DiffAnalyzer::default().diff(earlier, later)
}

fn check_compatible(
    earlier: &Snapshot,
    later: &Snapshot,
    reconciliation: &FieldReconciliation,
) -> FlightVaultResult<()> {
    let mismatch = |detail: String| -> FlightVaultResult<()> {
        Err(RecoveryError::SchemaMismatch {
            table: earlier.table().to_string(),
            detail,
        }
        .into())
    };

    if earlier.table() != later.table() {
        return mismatch(format!(
            "comparing {} with {}",
            earlier.table(),
            later.table()
        ));
    }
    if earlier.key_field() != later.key_field() {
        return mismatch(format!(
            "key field {:?} vs {:?}",
            earlier.key_field(),
            later.key_field()
        ));
    }
    if earlier.is_empty() || later.is_empty() {
        return Ok(());
    }

    let before = earlier.field_names();
    let after = later.field_names();
    let mut only_before: Vec<&String> = before.difference(&after).collect();
    let mut only_after: Vec<&String> = after.difference(&before).collect();

    match reconciliation {
        FieldReconciliation::MissingAsNull => return Ok(()),
        FieldReconciliation::Ignore(fields) => {
            only_before.retain(|f| !fields.contains(*f));
            only_after.retain(|f| !fields.contains(*f));
        }
        FieldReconciliation::Strict => {}
    }

    if only_before.is_empty() && only_after.is_empty() {
        Ok(())
    } else {
        mismatch(format!(
            "fields only in earlier: {only_before:?}; only in later: {only_after:?}"
        ))
    }
}
