//! Connection pool: one writer, a handful of readers.

pub mod pragmas;
mod read_pool;
mod write_connection;

use std::path::{Path, PathBuf};

use cortex_core::errors::CortexResult;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// Owns the single write connection and the read connection pool for one
/// tenant database. Shared (via `Arc`) with the link graph and session
/// store, which issue their own SQL against the same file.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open a pool backed by a database file, with `read_pool_size` read
    /// connections.
    pub fn open(path: &Path, read_pool_size: usize) -> CortexResult<Self> {
        let writer = WriteConnection::open(path)?;
        let readers = ReadPool::open(path, read_pool_size)?;
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory pool (tests). Reads are routed through the writer:
    /// separate in-memory connections would each see an empty database.
    pub fn open_in_memory() -> CortexResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }

    /// Run a read-only closure on the best available connection: the read
    /// pool when one exists, the writer otherwise.
    pub fn with_reader<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> CortexResult<T>,
    {
        match &self.readers {
            Some(readers) => readers.with_conn(f),
            None => self.writer.with_conn(f),
        }
    }

    /// Run a mutating closure on the writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> CortexResult<T>,
    {
        self.writer.with_conn(f)
    }
}
