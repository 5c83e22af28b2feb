//! Per-table schema descriptors supplied by configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use crate::errors::{FlightVaultResult, RecoveryError};

/// A declared foreign-key relationship from `field` to
/// `references_table.references_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub field: String,
    pub references_table: String,
    pub references_field: String,
}

/// Integrity declarations for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub key_field: String,
    /// Fields that must never be null or empty.
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Fields whose value distribution is tracked by the health scorer.
    /// Empty means every non-key field.
    #[serde(default)]
    pub distribution_fields: Vec<String>,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_field: key_field.into(),
            required_fields: Vec::new(),
            foreign_keys: Vec::new(),
            distribution_fields: Vec::new(),
        }
    }

    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_foreign_key(
        mut self,
        field: &str,
        references_table: &str,
        references_field: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.to_string(),
            references_table: references_table.to_string(),
            references_field: references_field.to_string(),
        });
        self
    }

    pub fn with_distribution_fields(mut self, fields: &[&str]) -> Self {
        self.distribution_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.iter().any(|f| f == field)
    }

    /// Fields tracked for distribution drift, given the fields observed in a
    /// snapshot.
    pub fn tracked_fields<'a>(&'a self, observed: impl Iterator<Item = &'a String>) -> Vec<String> {
        if !self.distribution_fields.is_empty() {
            return self.distribution_fields.clone();
        }
        observed
            .filter(|f| **f != self.key_field)
            .cloned()
            .collect()
    }

    /// Check that a snapshot was read with this descriptor's identity field.
    pub fn validate_snapshot(&self, snapshot: &Snapshot) -> FlightVaultResult<()> {
        if snapshot.table() != self.name {
            return Err(RecoveryError::SchemaMismatch {
                table: self.name.clone(),
                detail: format!("snapshot belongs to table {}", snapshot.table()),
            }
            .into());
        }
        if snapshot.key_field() != self.key_field {
            return Err(RecoveryError::SchemaMismatch {
                table: self.name.clone(),
                detail: format!(
                    "snapshot keyed by {:?}, descriptor declares {:?}",
                    snapshot.key_field(),
                    self.key_field
                ),
            }
            .into());
        }
        Ok(())
    }
}

/// All configured table descriptors, by table name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, SchemaDescriptor>,
}

impl SchemaRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = SchemaDescriptor>) -> Self {
        Self {
            tables: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn insert(&mut self, descriptor: SchemaDescriptor) {
        self.tables.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, table: &str) -> FlightVaultResult<&SchemaDescriptor> {
        self.tables.get(table).ok_or_else(|| {
            RecoveryError::UnknownTable {
                table: table.to_string(),
            }
            .into()
        })
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaDescriptor> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
