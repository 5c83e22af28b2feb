//! Diff analyzer configuration.

use serde::{Deserialize, Serialize};

use crate::models::Normalization;

/// Value normalization applied before field comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub float_precision: u32,
    pub trim_strings: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        let n = Normalization::default();
        Self {
            float_precision: n.float_precision,
            trim_strings: n.trim_strings,
        }
    }
}

impl DiffConfig {
    pub fn normalization(&self) -> Normalization {
        Normalization {
            float_precision: self.float_precision,
            trim_strings: self.trim_strings,
        }
    }
}
