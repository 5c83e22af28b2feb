//! Per-table request guards.
//!
//! Restores take an exclusive guard. Diff, score and search take a shared
//! guard. A conflicting request is rejected with `Busy` rather than queued.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use flightvault_core::errors::{FlightVaultResult, RecoveryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
enum Holder {
    Shared { count: usize, operation: String },
    Exclusive { operation: String },
}

/// Registry of held table guards. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    held: Arc<DashMap<String, Holder>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_shared(&self, table: &str, operation: &str) -> FlightVaultResult<TableGuard> {
        match self.held.entry(table.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Holder::Shared {
                    count: 1,
                    operation: operation.to_string(),
                });
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Holder::Shared { count, .. } => *count += 1,
                Holder::Exclusive { operation: held } => {
                    return Err(busy(table, held));
                }
            },
        }
        Ok(self.guard(table, LockMode::Shared, operation))
    }

    pub fn acquire_exclusive(&self, table: &str, operation: &str) -> FlightVaultResult<TableGuard> {
        match self.held.entry(table.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Holder::Exclusive {
                    operation: operation.to_string(),
                });
            }
            Entry::Occupied(slot) => {
                let held = match slot.get() {
                    Holder::Shared { operation, .. } | Holder::Exclusive { operation } => operation,
                };
                return Err(busy(table, held));
            }
        }
        Ok(self.guard(table, LockMode::Exclusive, operation))
    }

    pub fn mode(&self, table: &str) -> Option<LockMode> {
        self.held.get(table).map(|holder| match holder.value() {
            Holder::Shared { .. } => LockMode::Shared,
            Holder::Exclusive { .. } => LockMode::Exclusive,
        })
    }

    pub fn is_locked(&self, table: &str) -> bool {
        self.held.contains_key(table)
    }

    fn guard(&self, table: &str, mode: LockMode, operation: &str) -> TableGuard {
        debug!(table, ?mode, operation, "table guard acquired");
        TableGuard {
            held: Arc::clone(&self.held),
            table: table.to_string(),
            mode,
        }
    }
}

fn busy(table: &str, operation: &str) -> flightvault_core::FlightVaultError {
    RecoveryError::Busy {
        table: table.to_string(),
        operation: operation.to_string(),
    }
    .into()
}

/// Releases its hold on drop.
#[derive(Debug)]
pub struct TableGuard {
    held: Arc<DashMap<String, Holder>>,
    table: String,
    mode: LockMode,
}

impl TableGuard {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for TableGuard {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.held.entry(self.table.clone()) {
            match slot.get_mut() {
                Holder::Shared { count, .. } if *count > 1 => *count -= 1,
                _ => {
                    slot.remove();
                }
            }
        }
    }
}
