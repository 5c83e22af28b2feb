//! ConnectionPool: one writer plus a round-robin read pool.
//!
//! The only place in the storage crate that holds `Mutex<Connection>`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use flightvault_core::errors::{StoreError, StoreResult};

use crate::{migrations, pragmas, to_sqlite_err};

/// Connection pool for one database file: 1 writer + N readers.
pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
}

impl ConnectionPool {
    /// Open a file-backed pool, running pending migrations on the writer
    /// before any reader is opened.
    pub fn open(path: &Path, read_pool_size: usize) -> StoreResult<Self> {
        let writer = Connection::open(path)
            .map_err(|e| to_sqlite_err(format!("open writer {}: {e}", path.display())))?;
        pragmas::configure_connection(&writer)?;
        migrations::run_migrations(&writer)?;

        let mut readers = Vec::with_capacity(read_pool_size);
        for i in 0..read_pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| to_sqlite_err(format!("open reader {i}: {e}")))?;
            pragmas::configure_readonly_connection(&reader)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_index: AtomicUsize::new(0),
        })
    }

    /// Open a private in-memory database. Reads share the writer.
    pub fn open_in_memory() -> StoreResult<Self> {
        let writer = Connection::open_in_memory()
            .map_err(|e| to_sqlite_err(format!("open in-memory writer: {e}")))?;
        pragmas::configure_connection(&writer)?;
        migrations::run_migrations(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
        })
    }

    /// Execute a closure with the writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.writer.lock().map_err(|e| StoreError::AdapterUnavailable {
            operation: "write".to_string(),
            reason: format!("writer lock poisoned: {e}"),
        })?;
        f(&conn)
    }

    /// Execute a closure with a reader connection (round-robin).
    ///
    /// Falls back to the writer when there are no readers (in-memory mode).
    pub fn with_reader<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }

        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| StoreError::AdapterUnavailable {
                operation: "read".to_string(),
                reason: format!("reader lock poisoned: {e}"),
            })?;
        f(&conn)
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Check WAL mode on the writer connection.
    pub fn is_wal_mode(&self) -> bool {
        self.with_writer(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_default();
            Ok(mode.eq_ignore_ascii_case("wal"))
        })
        .unwrap_or(false)
    }
}
