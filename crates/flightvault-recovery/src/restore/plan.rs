//! Restore planning: one classified entry per divergent identity.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use flightvault_core::errors::FlightVaultResult;
use flightvault_core::models::{
    AmbiguityReason, ChangeKind, CorruptionWindow, DecisionSource, ForeignKey, PlanEntry, Record,
    RecordKey, RestoreDecision, RestoreOptions, RestorePlan, Snapshot,
};

use super::classify::RuleSet;
use super::dependency::{validate, DependencyGraph, RelatedTables};
use crate::diff::DiffAnalyzer;
use crate::health::field_keys;

/// Inputs shared by every entry of one plan.
pub(crate) struct Planning<'a> {
    pub analyzer: &'a DiffAnalyzer,
    pub graph: &'a DependencyGraph,
    pub related: &'a RelatedTables,
    pub options: &'a RestoreOptions,
    pub window: CorruptionWindow,
}

pub(crate) fn build_plan(
    planning: &Planning<'_>,
    current: &Snapshot,
    target: &Snapshot,
) -> FlightVaultResult<RestorePlan> {
    let rules = RuleSet::compile(&planning.options.rules)?;
    let diff = planning.analyzer.diff(target, current)?;
    let table = current.table();
    let window = planning.window;
    let fks = planning.graph.outbound(table);
    let lost = LostReferences::collect(table, current, target, &fks, planning.related);

    let mut entries = Vec::with_capacity(diff.summary.total_changes);

    for deleted in &diff.deleted {
        entries.push(PlanEntry {
            key: deleted.key.clone(),
            kind: ChangeKind::Deleted,
            decision: RestoreDecision::Revert,
            source: DecisionSource::Default,
            ambiguity: None,
            changed_fields: field_list(&deleted.record),
            target: Some(deleted.record.clone()),
            current: None,
            changed_at: None,
        });
    }

    for added in &diff.added {
        let created = added.record.version_start;
        let ambiguity = lost.referenced_by(&added.record).or_else(|| {
            created
                .filter(|at| window.contains(*at))
                .map(|at| AmbiguityReason::CreatedInCorruptionWindow { at })
        });
        entries.push(PlanEntry {
            key: added.key.clone(),
            kind: ChangeKind::Added,
            decision: RestoreDecision::Preserve,
            source: DecisionSource::Default,
            ambiguity,
            changed_fields: field_list(&added.record),
            target: None,
            current: Some(added.record.clone()),
            changed_at: created,
        });
    }

    for modified in &diff.modified {
        let changed_at = modified.after.version_start;
        let (decision, ambiguity) = match changed_at {
            None => (
                RestoreDecision::Preserve,
                Some(AmbiguityReason::UnknownModificationTime),
            ),
            Some(at) if window.contains(at) => (RestoreDecision::Revert, None),
            Some(_) => (RestoreDecision::Preserve, None),
        };
        entries.push(PlanEntry {
            key: modified.key.clone(),
            kind: ChangeKind::Modified,
            decision,
            source: DecisionSource::Default,
            ambiguity,
            changed_fields: modified.changed_fields().map(str::to_string).collect(),
            target: Some(modified.before.clone()),
            current: Some(modified.after.clone()),
            changed_at,
        });
    }

    for entry in &mut entries {
        if let Some(rule) = rules.first_match(entry.kind, &entry.changed_fields, entry.changed_at) {
            entry.decision = rule.action.into();
            entry.source = DecisionSource::Rule(rule.name.clone());
            entry.ambiguity = None;
        }
        if let Some(decision) = planning.options.manual.get(&entry.key) {
            entry.decision = *decision;
            entry.source = DecisionSource::Manual;
            entry.ambiguity = None;
        }
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    let mut plan = RestorePlan {
        table: table.to_string(),
        key_field: current.key_field().to_string(),
        target_as_of: target.as_of(),
        current_as_of: current.as_of(),
        corruption_window: window,
        entries,
        warnings: Vec::new(),
        diff_summary: diff.summary,
        current_count: current.len(),
    };
    plan.warnings = validate(&plan, current, planning.graph, planning.related);

    debug!(
        table,
        reverts = plan.revert_count(),
        preserved = plan.preserve_count(),
        ambiguous = plan.ambiguous_count(),
        warnings = plan.warnings.len(),
        window = %window,
        "restore plan built"
    );
    Ok(plan)
}

fn field_list(record: &Record) -> Vec<String> {
    record.field_names().map(str::to_string).collect()
}

/// Referenced values that existed at the target and are gone now, per
/// foreign-key field.
struct LostReferences {
    by_field: Vec<(String, String, HashSet<RecordKey>)>,
}

impl LostReferences {
    fn collect(
        table: &str,
        current: &Snapshot,
        target: &Snapshot,
        fks: &[&ForeignKey],
        related: &RelatedTables,
    ) -> Self {
        let mut by_field = Vec::new();
        for fk in fks {
            let (before, now) = if fk.references_table == table {
                (target, current)
            } else {
                match (
                    related.at_target(&fk.references_table),
                    related.current(&fk.references_table),
                ) {
                    (Some(before), Some(now)) => (before, now),
                    _ => continue,
                }
            };
            let existing = field_keys(now, &fk.references_field);
            let lost: HashSet<RecordKey> = field_keys(before, &fk.references_field)
                .into_iter()
                .filter(|k| !existing.contains(k))
                .collect();
            if !lost.is_empty() {
                by_field.push((fk.field.clone(), fk.references_table.clone(), lost));
            }
        }
        Self { by_field }
    }

    fn referenced_by(&self, record: &Record) -> Option<AmbiguityReason> {
        self.by_field.iter().find_map(|(field, references_table, lost)| {
            let value = record.value(field).to_key()?;
            lost.contains(&value).then(|| AmbiguityReason::ReferencesDeletedRow {
                field: field.clone(),
                references_table: references_table.clone(),
                missing_key: value,
            })
        })
    }
}

/// Default corruption window when the caller gives none.
pub(crate) fn default_window(
    options: &RestoreOptions,
    target_as_of: DateTime<Utc>,
    span: chrono::Duration,
) -> CorruptionWindow {
    options
        .corruption_window
        .unwrap_or_else(|| CorruptionWindow::after(target_as_of, span))
}
