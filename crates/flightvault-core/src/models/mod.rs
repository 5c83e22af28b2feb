pub mod audit;
pub mod diff;
pub mod health;
pub mod locate;
pub mod record;
pub mod restore;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use audit::{RestoreLogEntry, RowVersion};
pub use diff::{DiffClass, DiffResult, DiffSummary, FieldChange, KeyedRecord, ModifiedRecord};
pub use health::{CheckResult, CheckStatus, HealthLevel, HealthScore};
pub use locate::{
    CandidateWindow, CorruptionWindow, LocateOutcome, LocateResult, LocatorState, ProbePurpose,
    ProbeRecord,
};
pub use record::Record;
pub use restore::{
    AmbiguityReason, AppliedRestore, ChangeKind, ClassificationRule, DecisionSource,
    DependencyViolation, PlanEntry, RestoreBatch, RestoreDecision, RestoreOp, RestoreOptions,
    RestorePlan, RestoreResult, RestoreVerification, RuleAction, ViolationDirection,
};
pub use schema::{ForeignKey, SchemaDescriptor, SchemaRegistry};
pub use snapshot::Snapshot;
pub use value::{FieldValue, Normalization, RecordKey};
