//! Selective restore plans, batches, and results.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::diff::DiffSummary;
use super::locate::CorruptionWindow;
use super::record::Record;
use super::value::RecordKey;
use crate::time::format_timestamp;

/// How a record diverged between the restore target and now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Present now, absent at the target.
    Added,
    /// Present at the target, missing now.
    Deleted,
    Modified,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
        }
    }
}

/// What the executor does with one divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreDecision {
    /// Bring the record back to its target state.
    Revert,
    /// Leave the current state alone.
    Preserve,
}

/// Where a decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "name")]
pub enum DecisionSource {
    Default,
    Rule(String),
    Manual,
}

/// Why a divergence needs a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AmbiguityReason {
    /// An added record points at a row that existed at the target and is
    /// gone now.
    ReferencesDeletedRow {
        field: String,
        references_table: String,
        missing_key: RecordKey,
    },
    /// An added record first appeared inside the corruption window.
    CreatedInCorruptionWindow { at: DateTime<Utc> },
    /// A modified record carries no version timestamp.
    UnknownModificationTime,
}

impl fmt::Display for AmbiguityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferencesDeletedRow {
                field,
                references_table,
                missing_key,
            } => write!(
                f,
                "{field} references {references_table} row {missing_key}, deleted since the target"
            ),
            Self::CreatedInCorruptionWindow { at } => {
                write!(f, "created at {} inside the corruption window", format_timestamp(at))
            }
            Self::UnknownModificationTime => write!(f, "modification time unknown"),
        }
    }
}

/// One classified divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub key: RecordKey,
    pub kind: ChangeKind,
    pub decision: RestoreDecision,
    pub source: DecisionSource,
    /// Set when the entry is held back for a manual decision. Ambiguous
    /// entries are never auto-applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguity: Option<AmbiguityReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    /// State at the restore target.
    pub target: Option<Record>,
    /// State now.
    pub current: Option<Record>,
    /// Instant the current version became current, if known.
    pub changed_at: Option<DateTime<Utc>>,
}

impl PlanEntry {
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }

    /// Reverted by apply.
    pub fn is_revert(&self) -> bool {
        self.decision == RestoreDecision::Revert && !self.is_ambiguous()
    }
}

/// Which side of a foreign key a violation is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationDirection {
    /// A reverted record references a row that will not exist.
    Outbound,
    /// Reverting a record leaves more rows elsewhere dangling.
    Inbound,
}

/// A plan warning raised by dependency validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyViolation {
    pub direction: ViolationDirection,
    pub table: String,
    pub key: RecordKey,
    pub field: String,
    pub related_table: String,
    pub detail: String,
}

impl fmt::Display for DependencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            ViolationDirection::Outbound => "outbound",
            ViolationDirection::Inbound => "inbound",
        };
        write!(
            f,
            "{dir} {}.{} (row {}) -> {}: {}",
            self.table, self.field, self.key, self.related_table, self.detail
        )
    }
}

/// What a caller rule does when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Preserve the current state.
    Keep,
    /// Revert to the target state.
    Restore,
}

impl From<RuleAction> for RestoreDecision {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Keep => Self::Preserve,
            RuleAction::Restore => Self::Revert,
        }
    }
}

/// Caller-supplied classification rule. Every present criterion must
/// match; rules are tried in order and the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    #[serde(default)]
    pub kind: Option<ChangeKind>,
    /// Regex matched against changed field names. Added and deleted records
    /// count every field as changed.
    #[serde(default)]
    pub field_pattern: Option<String>,
    /// Bounds on the change timestamp, as the interval `(changed_after, changed_before]`.
    #[serde(default)]
    pub changed_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changed_before: Option<DateTime<Utc>>,
    pub action: RuleAction,
}

impl ClassificationRule {
    pub fn new(name: impl Into<String>, action: RuleAction) -> Self {
        Self {
            name: name.into(),
            kind: None,
            field_pattern: None,
            changed_after: None,
            changed_before: None,
            action,
        }
    }

    pub fn for_kind(mut self, kind: ChangeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matching_fields(mut self, pattern: impl Into<String>) -> Self {
        self.field_pattern = Some(pattern.into());
        self
    }

    pub fn changed_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.changed_after = Some(after);
        self.changed_before = Some(before);
        self
    }
}

/// Knobs for planning and applying a selective restore.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Overrides the default `(target, target + span]`.
    pub corruption_window: Option<CorruptionWindow>,
    pub rules: Vec<ClassificationRule>,
    /// Per-identity decisions that override everything else.
    pub manual: BTreeMap<RecordKey, RestoreDecision>,
    /// Apply even when dependency validation raised warnings.
    pub allow_dependency_violations: bool,
    /// Execute a located restore point below the confidence floor.
    pub confirm_low_confidence: bool,
}

impl RestoreOptions {
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_manual(mut self, key: impl Into<RecordKey>, decision: RestoreDecision) -> Self {
        self.manual.insert(key.into(), decision);
        self
    }

    pub fn with_corruption_window(mut self, window: CorruptionWindow) -> Self {
        self.corruption_window = Some(window);
        self
    }
}

/// Classified divergences between a restore target and now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorePlan {
    pub table: String,
    pub key_field: String,
    pub target_as_of: DateTime<Utc>,
    pub current_as_of: DateTime<Utc>,
    pub corruption_window: CorruptionWindow,
    /// Ordered by identity.
    pub entries: Vec<PlanEntry>,
    pub warnings: Vec<DependencyViolation>,
    pub diff_summary: DiffSummary,
    /// Records in the current state.
    pub current_count: usize,
}

impl RestorePlan {
    pub fn reverts(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_revert())
    }

    pub fn preserved(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.decision == RestoreDecision::Preserve && !e.is_ambiguous())
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_ambiguous())
    }

    pub fn revert_count(&self) -> usize {
        self.reverts().count()
    }

    pub fn preserve_count(&self) -> usize {
        self.preserved().count()
    }

    pub fn ambiguous_count(&self) -> usize {
        self.ambiguous().count()
    }

    pub fn entry(&self, key: &RecordKey) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn has_blocking_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Record count once every revert has been applied.
    pub fn projected_count(&self) -> usize {
        let mut count = self.current_count as i64;
        for entry in self.reverts() {
            match entry.kind {
                ChangeKind::Deleted => count += 1,
                ChangeKind::Added => count -= 1,
                ChangeKind::Modified => {}
            }
        }
        count.max(0) as usize
    }

    /// The store mutations that carry out every revert.
    pub fn to_batch(&self, operation_id: Uuid, applied_at: DateTime<Utc>) -> RestoreBatch {
        let ops = self
            .reverts()
            .filter_map(|entry| match entry.kind {
                ChangeKind::Added => Some(RestoreOp::Delete(entry.key.clone())),
                ChangeKind::Deleted | ChangeKind::Modified => entry
                    .target
                    .as_ref()
                    .map(|r| RestoreOp::Upsert(r.without_metadata())),
            })
            .collect();
        RestoreBatch {
            operation_id,
            table: self.table.clone(),
            key_field: self.key_field.clone(),
            target_as_of: self.target_as_of,
            applied_at,
            ops,
        }
    }
}

/// One store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreOp {
    /// Insert the record, or replace the row with its identity.
    Upsert(Record),
    Delete(RecordKey),
}

/// Mutations applied by the store in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreBatch {
    pub operation_id: Uuid,
    pub table: String,
    pub key_field: String,
    pub target_as_of: DateTime<Utc>,
    pub applied_at: DateTime<Utc>,
    pub ops: Vec<RestoreOp>,
}

impl RestoreBatch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Store acknowledgement of an applied batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRestore {
    pub operation_id: Uuid,
    pub table: String,
    pub applied_at: DateTime<Utc>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub record_count: usize,
}

/// Post-restore comparison of reverted identities against the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreVerification {
    pub checked: usize,
    pub mismatched: Vec<RecordKey>,
}

impl RestoreVerification {
    pub fn passed(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Outcome of `apply`, dry run or real.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreResult {
    pub table: String,
    pub dry_run: bool,
    pub operation_id: Option<Uuid>,
    /// Records re-inserted or reverted to their target state.
    pub restored: usize,
    /// Added records removed.
    pub removed: usize,
    pub preserved: usize,
    pub ambiguous: usize,
    pub duration_ms: u64,
    /// Record count after apply (projected for a dry run).
    pub final_record_count: usize,
    pub verification: Option<RestoreVerification>,
    pub plan: RestorePlan,
}
