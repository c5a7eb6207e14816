//! DuckDB connection pooling.
//!
//! Lookups run on read-only connections; ingestion and audit appends take
//! read-write ones. A pooled connection returns to the pool when dropped,
//! which guarantees release on every exit path of a request.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use duckdb::Connection;

/// Access mode for pooled connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Default)]
struct Idle {
    readers: Vec<Connection>,
    writers: Vec<Connection>,
}

impl Idle {
    fn stack(&mut self, mode: AccessMode) -> &mut Vec<Connection> {
        match mode {
            AccessMode::ReadOnly => &mut self.readers,
            AccessMode::ReadWrite => &mut self.writers,
        }
    }
}

#[derive(Debug)]
struct PoolShared {
    db_path: PathBuf,
    capacity: usize,
    idle: Mutex<Idle>,
}

/// Hands out pooled DuckDB connections for one database file.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

impl ConnectionPool {
    pub fn new(db_path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                db_path: db_path.into(),
                capacity: capacity.max(1),
                idle: Mutex::new(Idle::default()),
            }),
        }
    }

    /// Take an idle connection for `mode`, opening a fresh one when the pool
    /// is empty.
    ///
    /// # Panics
    /// Panics if the pool mutex is poisoned by a previous panic.
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, duckdb::Error> {
        let reused = self
            .shared
            .idle
            .lock()
            .expect("connection pool mutex poisoned")
            .stack(mode)
            .pop();

        let connection = match reused {
            Some(connection) => connection,
            None => open_connection(self.shared.db_path.as_path(), mode)?,
        };

        Ok(PooledConnection {
            mode,
            shared: Arc::clone(&self.shared),
            connection: Some(connection),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.shared.db_path.as_path()
    }
}

/// A connection checked out of the pool; dereferences to [`Connection`].
pub struct PooledConnection {
    mode: AccessMode,
    shared: Arc<PoolShared>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection already returned")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection already returned")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut idle = self
            .shared
            .idle
            .lock()
            .expect("connection pool mutex poisoned");
        let stack = idle.stack(self.mode);
        if stack.len() < self.shared.capacity {
            stack.push(connection);
        }
    }
}

fn open_connection(path: &Path, mode: AccessMode) -> Result<Connection, duckdb::Error> {
    let connection = Connection::open(path)?;
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    if mode == AccessMode::ReadOnly {
        // Not supported by every embedded build; query shapes stay read-only
        // regardless.
        let _ = connection.execute_batch("SET access_mode = 'READ_ONLY';");
    }
    Ok(connection)
}
