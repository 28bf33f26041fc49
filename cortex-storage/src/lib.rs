//! # cortex-storage
//!
//! SQLite persistence for the Cortex memory system: a single self-migrating
//! database file holding memories, their full-text and vector search
//! surfaces, the link graph, and session/checkpoint state.
//!
//! [`Store`] is the only public entry point; callers that need raw access to
//! the underlying connection pool (the link graph and session store both do)
//! go through [`Store::pool`].

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::{LinkOutcome, MemoryPatch, Store, StoreOutcome, StoreStats};
pub use pool::ConnectionPool;

use cortex_core::errors::StorageError;

/// Wrap a rusqlite error as a [`StorageError::Sqlite`]. Public so crates
/// that query the shared pool directly (`cortex-session`) can report
/// errors the same way `Store` does.
pub fn to_storage_err(message: impl Into<String>) -> cortex_core::CortexError {
    cortex_core::CortexError::StorageFault(StorageError::Sqlite {
        message: message.into(),
    })
}
