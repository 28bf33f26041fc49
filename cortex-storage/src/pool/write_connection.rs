//! The single writer connection. SQLite allows only one writer at a time, so
//! every mutation is serialized through a mutex rather than relying on
//! `busy_timeout` retries under contention.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use cortex_core::errors::CortexResult;

use super::pragmas::apply_writer_pragmas;
use crate::to_storage_err;

pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path) -> CortexResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_writer_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> CortexResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_writer_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with exclusive access to the writer connection.
    pub fn with_conn<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&Connection) -> CortexResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("writer lock poisoned: {e}")))?;
        f(&guard)
    }
}
