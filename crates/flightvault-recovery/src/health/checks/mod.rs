//! Default integrity checks.

mod distribution;
mod record_count;
mod record_retention;
mod referential;
mod required_fields;

pub use distribution::DistributionCheck;
pub use record_count::RecordCountCheck;
pub use record_retention::RecordRetentionCheck;
pub use referential::ReferentialIntegrityCheck;
pub use required_fields::RequiredFieldsCheck;

use flightvault_core::models::{CheckResult, CheckStatus};

/// Assemble a result from a raw sub-score, clamped to [0, 100].
pub(crate) fn result(
    name: &str,
    weight: f64,
    score: f64,
    status: CheckStatus,
    detail: String,
) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        weight,
        score: score.clamp(0.0, 100.0),
        status,
        detail,
    }
}
