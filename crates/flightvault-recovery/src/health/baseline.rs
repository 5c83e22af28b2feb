//! Expected shape of a healthy table.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use flightvault_core::models::{FieldValue, SchemaDescriptor, Snapshot};

/// Observed distribution of one field in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldProfile {
    /// Fraction of records where the field is null or empty.
    pub null_ratio: f64,
    /// Distinct non-null values divided by record count.
    pub distinct_ratio: f64,
    /// Mean of numeric values, when the field is numeric.
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl FieldProfile {
    pub fn measure(snapshot: &Snapshot, field: &str) -> Self {
        let total = snapshot.len();
        if total == 0 {
            return Self::default();
        }

        let mut nulls = 0usize;
        let mut distinct: HashSet<String> = HashSet::new();
        let mut numbers: Vec<f64> = Vec::new();
        for record in snapshot.records() {
            let value = record.value(field);
            if value.is_null_or_empty() {
                nulls += 1;
                continue;
            }
            distinct.insert(distinct_token(value));
            if let Some(x) = value.as_f64().filter(|x| x.is_finite()) {
                numbers.push(x);
            }
        }

        let (mean, std_dev) = if numbers.is_empty() {
            (None, None)
        } else {
            let n = numbers.len() as f64;
            let mean = numbers.iter().sum::<f64>() / n;
            let var = numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            (Some(mean), Some(var.sqrt()))
        };

        Self {
            null_ratio: nulls as f64 / total as f64,
            distinct_ratio: distinct.len() as f64 / total as f64,
            mean,
            std_dev,
        }
    }

    /// Element-wise mean of several profiles.
    fn average(profiles: &[FieldProfile]) -> Self {
        if profiles.is_empty() {
            return Self::default();
        }
        let n = profiles.len() as f64;
        let avg_opt = |get: fn(&FieldProfile) -> Option<f64>| -> Option<f64> {
            let values: Vec<f64> = profiles.iter().filter_map(get).collect();
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
        };
        Self {
            null_ratio: profiles.iter().map(|p| p.null_ratio).sum::<f64>() / n,
            distinct_ratio: profiles.iter().map(|p| p.distinct_ratio).sum::<f64>() / n,
            mean: avg_opt(|p| p.mean),
            std_dev: avg_opt(|p| p.std_dev),
        }
    }
}

fn distinct_token(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Rolling expectation derived from recent healthy snapshots.
///
/// The anchor is the most recent of them; record retention is measured
/// against it.
#[derive(Debug, Clone, Default)]
pub struct HealthBaseline {
    pub expected_count: usize,
    pub fields: BTreeMap<String, FieldProfile>,
    pub anchor: Option<Snapshot>,
}

impl HealthBaseline {
    /// Baseline with no expectations; every comparative check passes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_snapshot(anchor: &Snapshot, schema: &SchemaDescriptor) -> Self {
        Self::from_history(std::slice::from_ref(anchor), schema)
    }

    /// Average over `snapshots`, ordered oldest first; the last one becomes
    /// the anchor.
    pub fn from_history(snapshots: &[Snapshot], schema: &SchemaDescriptor) -> Self {
        let Some(anchor) = snapshots.last() else {
            return Self::empty();
        };

        let expected_count = (snapshots.iter().map(Snapshot::len).sum::<usize>() as f64
            / snapshots.len() as f64)
            .round() as usize;

        let observed = anchor.field_names();
        let tracked = schema.tracked_fields(observed.iter());
        let fields = tracked
            .into_iter()
            .map(|field| {
                let profiles: Vec<FieldProfile> = snapshots
                    .iter()
                    .map(|s| FieldProfile::measure(s, &field))
                    .collect();
                (field, FieldProfile::average(&profiles))
            })
            .collect();

        Self {
            expected_count,
            fields,
            anchor: Some(anchor.clone()),
        }
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor.is_some()
    }
}
