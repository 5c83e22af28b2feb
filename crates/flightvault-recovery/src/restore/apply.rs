//! Dry-run and atomic execution of a restore plan.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use flightvault_core::errors::{FlightVaultResult, RecoveryError};
use flightvault_core::models::{
    ChangeKind, PlanEntry, RestorePlan, RestoreResult, RestoreVerification, Snapshot,
};
use flightvault_core::traits::ITemporalStore;

use crate::diff::{compare_records, DiffAnalyzer};

pub(crate) fn execute(
    store: &dyn ITemporalStore,
    plan: RestorePlan,
    dry_run: bool,
    allow_dependency_violations: bool,
    verify: bool,
    analyzer: &DiffAnalyzer,
) -> FlightVaultResult<RestoreResult> {
    let started = Instant::now();
    let (restored, removed) = revert_counts(&plan);

    if dry_run {
        return Ok(RestoreResult {
            table: plan.table.clone(),
            dry_run: true,
            operation_id: None,
            restored,
            removed,
            preserved: plan.preserve_count(),
            ambiguous: plan.ambiguous_count(),
            duration_ms: started.elapsed().as_millis() as u64,
            final_record_count: plan.projected_count(),
            verification: None,
            plan,
        });
    }

    if plan.has_blocking_warnings() && !allow_dependency_violations {
        let first = plan
            .warnings
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(
            table = %plan.table,
            violations = plan.warnings.len(),
            "restore blocked by dependency violations"
        );
        return Err(RecoveryError::DependencyViolation {
            table: plan.table.clone(),
            count: plan.warnings.len(),
            first,
        }
        .into());
    }

    let operation_id = Uuid::new_v4();
    let batch = plan.to_batch(operation_id, Utc::now());
    let (operation_id, final_record_count) = if batch.is_empty() {
        info!(table = %plan.table, "nothing to restore");
        (None, plan.current_count)
    } else {
        let applied = store.apply_restore(&batch)?;
        info!(
            table = %plan.table,
            operation_id = %applied.operation_id,
            inserted = applied.inserted,
            updated = applied.updated,
            deleted = applied.deleted,
            "restore applied"
        );
        (Some(applied.operation_id), applied.record_count)
    };

    let verification = if verify && operation_id.is_some() {
        let after = store.current(&plan.table, &plan.key_field)?;
        let verification = verify_reverts(&plan, &after, analyzer);
        if !verification.passed() {
            warn!(
                table = %plan.table,
                mismatched = verification.mismatched.len(),
                "post-restore verification found mismatches"
            );
        }
        Some(verification)
    } else {
        None
    };

    Ok(RestoreResult {
        table: plan.table.clone(),
        dry_run: false,
        operation_id,
        restored,
        removed,
        preserved: plan.preserve_count(),
        ambiguous: plan.ambiguous_count(),
        duration_ms: started.elapsed().as_millis() as u64,
        final_record_count,
        verification,
        plan,
    })
}

/// (rows written back, rows removed) by the plan.
fn revert_counts(plan: &RestorePlan) -> (usize, usize) {
    plan.reverts().fold((0, 0), |(restored, removed), entry| match entry.kind {
        ChangeKind::Added => (restored, removed + 1),
        ChangeKind::Deleted | ChangeKind::Modified => (restored + 1, removed),
    })
}

/// Compare every reverted identity with its target state.
pub(crate) fn verify_reverts(
    plan: &RestorePlan,
    after: &Snapshot,
    analyzer: &DiffAnalyzer,
) -> RestoreVerification {
    let mut checked = 0;
    let mut mismatched = Vec::new();
    for entry in plan.reverts() {
        checked += 1;
        if !matches_target(entry, after, analyzer) {
            mismatched.push(entry.key.clone());
        }
    }
    RestoreVerification {
        checked,
        mismatched,
    }
}

fn matches_target(entry: &PlanEntry, after: &Snapshot, analyzer: &DiffAnalyzer) -> bool {
    match (entry.kind, entry.target.as_ref(), after.get(&entry.key)) {
        (ChangeKind::Added, _, found) => found.is_none(),
        (_, Some(target), Some(found)) => {
            compare_records(target, found, analyzer.normalization(), None).is_empty()
        }
        _ => false,
    }
}
