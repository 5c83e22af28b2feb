//! Foreign-key graph between tables and restore dependency validation.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use flightvault_core::models::{
    ChangeKind, DependencyViolation, ForeignKey, Record, RecordKey, RestorePlan, SchemaRegistry,
    Snapshot, ViolationDirection,
};

use crate::health::field_keys;

/// Tables as nodes, declared foreign keys as edges from the referencing
/// table to the referenced one.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ForeignKey>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        let mut graph = Self::default();
        for schema in registry.iter() {
            graph.ensure_node(&schema.name);
        }
        for schema in registry.iter() {
            for fk in &schema.foreign_keys {
                let src = graph.ensure_node(&schema.name);
                let dst = graph.ensure_node(&fk.references_table);
                graph.graph.add_edge(src, dst, fk.clone());
            }
        }
        graph
    }

    fn ensure_node(&mut self, table: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(table) {
            return idx;
        }
        let idx = self.graph.add_node(table.to_string());
        self.nodes.insert(table.to_string(), idx);
        idx
    }

    pub fn contains(&self, table: &str) -> bool {
        self.nodes.contains_key(table)
    }

    /// Foreign keys declared on `table`.
    pub fn outbound(&self, table: &str) -> Vec<&ForeignKey> {
        let Some(&idx) = self.nodes.get(table) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight())
            .collect()
    }

    /// Foreign keys pointing at `table`, with the table declaring each.
    pub fn inbound(&self, table: &str) -> Vec<(&str, &ForeignKey)> {
        let Some(&idx) = self.nodes.get(table) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (self.graph[e.source()].as_str(), e.weight()))
            .collect()
    }

    /// Other tables `table` references or is referenced by.
    pub fn related_tables(&self, table: &str) -> Vec<String> {
        let mut related: Vec<String> = self
            .outbound(table)
            .into_iter()
            .map(|fk| fk.references_table.clone())
            .chain(self.inbound(table).into_iter().map(|(t, _)| t.to_string()))
            .filter(|t| t != table)
            .collect();
        related.sort();
        related.dedup();
        related
    }

    /// Tables ordered so referenced tables come before the tables that
    /// reference them. Members of a cycle are grouped together.
    pub fn restore_order(&self) -> Vec<String> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .flat_map(|scc| {
                let mut members: Vec<String> =
                    scc.iter().map(|idx| self.graph[*idx].clone()).collect();
                members.sort();
                members
            })
            .collect()
    }

    /// Groups of tables referencing each other in a loop, self-references
    /// included.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.iter().map(|idx| self.graph[*idx].clone()).collect();
                members.sort();
                members
            })
            .collect()
    }
}

/// State of tables related to the one being restored.
#[derive(Debug, Clone, Default)]
pub struct RelatedTables {
    current: HashMap<String, Snapshot>,
    at_target: HashMap<String, Snapshot>,
}

impl RelatedTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_current(&mut self, snapshot: Snapshot) {
        self.current.insert(snapshot.table().to_string(), snapshot);
    }

    pub fn insert_at_target(&mut self, snapshot: Snapshot) {
        self.at_target.insert(snapshot.table().to_string(), snapshot);
    }

    pub fn current(&self, table: &str) -> Option<&Snapshot> {
        self.current.get(table)
    }

    pub fn at_target(&self, table: &str) -> Option<&Snapshot> {
        self.at_target.get(table)
    }
}

/// Rows of the restored table after the plan's reverts.
pub(crate) fn project<'a>(current: &'a Snapshot, plan: &'a RestorePlan) -> BTreeMap<&'a RecordKey, &'a Record> {
    let mut rows: BTreeMap<&RecordKey, &Record> = current.iter().collect();
    for entry in plan.reverts() {
        match (entry.kind, entry.target.as_ref()) {
            (ChangeKind::Added, _) => {
                rows.remove(&entry.key);
            }
            (_, Some(target)) => {
                rows.insert(&entry.key, target);
            }
            (_, None) => {}
        }
    }
    rows
}

fn values_of<'a>(
    rows: impl Iterator<Item = (&'a RecordKey, &'a Record)>,
    field: &str,
    key_field: &str,
) -> HashSet<RecordKey> {
    rows.filter_map(|(key, record)| {
        if field == key_field {
            Some(key.clone())
        } else {
            record.value(field).to_key()
        }
    })
    .collect()
}

/// Check a plan against declared foreign keys.
///
/// Outbound: every reverted row's references must resolve in the referenced
/// table's current state, or in the plan's own rows for self-references.
/// Inbound: values the plan removes from a referenced field must not leave
/// referencing rows dangling that resolve today. Related tables without a
/// known state are not checked.
pub fn validate(
    plan: &RestorePlan,
    current: &Snapshot,
    graph: &DependencyGraph,
    related: &RelatedTables,
) -> Vec<DependencyViolation> {
    let table = plan.table.as_str();
    let key_field = plan.key_field.as_str();
    let projected = project(current, plan);
    let mut violations = Vec::new();

    for fk in graph.outbound(table) {
        let targets = if fk.references_table == table {
            values_of(projected.iter().map(|(k, r)| (*k, *r)), &fk.references_field, key_field)
        } else {
            match related.current(&fk.references_table) {
                Some(snapshot) => field_keys(snapshot, &fk.references_field),
                None => continue,
            }
        };

        for entry in plan.reverts() {
            let Some(record) = entry.target.as_ref() else {
                continue;
            };
            let Some(value) = record.value(&fk.field).to_key() else {
                continue;
            };
            if !targets.contains(&value) {
                violations.push(DependencyViolation {
                    direction: ViolationDirection::Outbound,
                    table: table.to_string(),
                    key: entry.key.clone(),
                    field: fk.field.clone(),
                    related_table: fk.references_table.clone(),
                    detail: format!(
                        "restored row references {}.{} = {value}, which does not exist",
                        fk.references_table, fk.references_field
                    ),
                });
            }
        }
    }

    for (referencing_table, fk) in graph.inbound(table) {
        let before = values_of(current.iter(), &fk.references_field, key_field);
        let after = values_of(projected.iter().map(|(k, r)| (*k, *r)), &fk.references_field, key_field);
        let removed: HashSet<&RecordKey> = before.difference(&after).collect();
        if removed.is_empty() {
            continue;
        }

        let referencing: Vec<(&RecordKey, &Record)> = if referencing_table == table {
            projected.iter().map(|(k, r)| (*k, *r)).collect()
        } else {
            match related.current(referencing_table) {
                Some(snapshot) => snapshot.iter().collect(),
                None => continue,
            }
        };

        for (key, record) in referencing {
            let Some(value) = record.value(&fk.field).to_key() else {
                continue;
            };
            if removed.contains(&value) {
                violations.push(DependencyViolation {
                    direction: ViolationDirection::Inbound,
                    table: referencing_table.to_string(),
                    key: key.clone(),
                    field: fk.field.clone(),
                    related_table: table.to_string(),
                    detail: format!(
                        "restore removes {table}.{} = {value}, which this row references",
                        fk.references_field
                    ),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightvault_core::models::SchemaDescriptor;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new([
            SchemaDescriptor::new("airports", "airport_id"),
            SchemaDescriptor::new("airlines", "airline_id"),
            SchemaDescriptor::new("routes", "route_id")
                .with_foreign_key("airline_id", "airlines", "airline_id")
                .with_foreign_key("source_airport_id", "airports", "airport_id"),
            SchemaDescriptor::new("employees", "id").with_foreign_key("manager_id", "employees", "id"),
        ])
    }

    #[test]
    fn edges_follow_declared_keys() {
        let graph = DependencyGraph::from_registry(&registry());
        assert_eq!(graph.outbound("routes").len(), 2);
        let inbound = graph.inbound("airports");
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].0, "routes");
        assert_eq!(graph.related_tables("routes"), vec!["airlines", "airports"]);
        assert!(graph.related_tables("employees").is_empty());
    }

    #[test]
    fn referenced_tables_restore_first() {
        let graph = DependencyGraph::from_registry(&registry());
        let order = graph.restore_order();
        let pos = |t: &str| order.iter().position(|x| x == t).unwrap();
        assert!(pos("airports") < pos("routes"));
        assert!(pos("airlines") < pos("routes"));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let graph = DependencyGraph::from_registry(&registry());
        assert_eq!(graph.cycles(), vec![vec!["employees".to_string()]]);
    }
}
