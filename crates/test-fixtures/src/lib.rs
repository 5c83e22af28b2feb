//! # test-fixtures
//!
//! Shared test support: an in-memory temporal store with fault injection,
//! the airline schema, and deterministic seed data.

pub mod memory_store;
pub mod schemas;
pub mod seed;

pub use memory_store::{Fault, InMemoryTemporalStore};
pub use schemas::{airline_config, airline_registry};
pub use seed::AirlineScenario;

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// A fixed base instant `hours_ago` hours before now, truncated to whole
/// seconds so it survives storage round-trips unchanged.
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0) - Duration::hours(hours)
}

/// `base + seconds`.
pub fn at(base: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    base + Duration::seconds(seconds)
}
