//! Record-level field comparison.

use std::collections::BTreeSet;

use flightvault_core::models::{FieldChange, Normalization, Record};

/// Fields whose normalized values differ, in field-name order. A field
/// missing from one record compares as NULL. Fields in `ignored` are
/// skipped.
pub fn compare_records(
    before: &Record,
    after: &Record,
    rules: &Normalization,
    ignored: Option<&BTreeSet<String>>,
) -> Vec<FieldChange> {
    let names: BTreeSet<&str> = before.field_names().chain(after.field_names()).collect();
    names
        .into_iter()
        .filter(|name| ignored.map_or(true, |set| !set.contains(*name)))
        .filter_map(|name| {
            let b = before.value(name);
            let a = after.value(name);
            if b.equivalent(a, rules) {
                None
            } else {
                Some(FieldChange {
                    field: name.to_string(),
                    before: b.clone(),
                    after: a.clone(),
                })
            }
        })
        .collect()
}
