pub mod diff_config;
pub mod health_config;
pub mod locator_config;
pub mod observability_config;
pub mod restore_config;
pub mod storage_config;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use diff_config::DiffConfig;
pub use health_config::{CheckWeights, HealthConfig};
pub use locator_config::LocatorConfig;
pub use observability_config::ObservabilityConfig;
pub use restore_config::RestoreConfig;
pub use storage_config::StorageConfig;

use crate::errors::{FlightVaultError, FlightVaultResult};
use crate::models::{SchemaDescriptor, SchemaRegistry};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FlightVaultConfig {
    pub locator: LocatorConfig,
    pub health: HealthConfig,
    pub restore: RestoreConfig,
    pub diff: DiffConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
    pub tables: Vec<SchemaDescriptor>,
}

impl FlightVaultConfig {
    /// Load config from a TOML string, falling back to defaults for missing
    /// fields, then validate it.
    pub fn from_toml(toml_str: &str) -> FlightVaultResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_tables(mut self, tables: impl IntoIterator<Item = SchemaDescriptor>) -> Self {
        self.tables.extend(tables);
        self
    }

    pub fn schema_registry(&self) -> SchemaRegistry {
        SchemaRegistry::new(self.tables.iter().cloned())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> FlightVaultResult<()> {
        let l = &self.locator;
        ensure(l.lookback_hours > 0, "locator.lookback_hours must be positive")?;
        ensure(l.resolution_seconds > 0, "locator.resolution_seconds must be positive")?;
        ensure(
            l.resolution_seconds < l.lookback_hours.saturating_mul(3600),
            "locator.resolution_seconds must be smaller than the lookback window",
        )?;
        ensure(
            (0.0..=100.0).contains(&l.pass_threshold),
            "locator.pass_threshold must be within 0..=100",
        )?;
        ensure(
            (0.0..=100.0).contains(&l.confidence_floor),
            "locator.confidence_floor must be within 0..=100",
        )?;

        let h = &self.health;
        let mut total = 0.0;
        for (name, weight) in h.weights.iter() {
            ensure(
                weight.is_finite() && weight >= 0.0,
                &format!("health.weights.{name} must be a non-negative number"),
            )?;
            total += weight;
        }
        ensure(total > 0.0, "health.weights must not all be zero")?;
        ensure(
            h.min_count_fraction > 0.0 && h.min_count_fraction <= 1.0,
            "health.min_count_fraction must be within (0, 1]",
        )?;
        ensure(h.max_count_growth >= 1.0, "health.max_count_growth must be at least 1")?;
        ensure(
            h.distribution_threshold > 0.0,
            "health.distribution_threshold must be positive",
        )?;
        ensure(h.mean_shift_sigma > 0.0, "health.mean_shift_sigma must be positive")?;
        ensure(
            h.referential_warning_fraction <= h.referential_critical_fraction,
            "health.referential_warning_fraction must not exceed the critical fraction",
        )?;

        ensure(self.diff.float_precision <= 15, "diff.float_precision must be at most 15")?;

        let s = &self.storage;
        ensure(s.read_pool_size > 0, "storage.read_pool_size must be positive")?;
        ensure(
            s.backoff_base_ms <= s.backoff_max_ms,
            "storage.backoff_base_ms must not exceed storage.backoff_max_ms",
        )?;

        let mut names = BTreeSet::new();
        for table in &self.tables {
            ensure(!table.name.is_empty(), "table name must not be empty")?;
            ensure(
                !table.key_field.is_empty(),
                &format!("table {} has an empty key_field", table.name),
            )?;
            ensure(
                names.insert(table.name.as_str()),
                &format!("table {} is declared twice", table.name),
            )?;
        }
        for table in &self.tables {
            for fk in &table.foreign_keys {
                ensure(
                    names.contains(fk.references_table.as_str()),
                    &format!(
                        "{}.{} references undeclared table {}",
                        table.name, fk.field, fk.references_table
                    ),
                )?;
            }
        }
        Ok(())
    }
}

fn ensure(condition: bool, message: &str) -> FlightVaultResult<()> {
    if condition {
        Ok(())
    } else {
        Err(FlightVaultError::ConfigError(message.to_string()))
    }
}
