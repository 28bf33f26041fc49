//! Versioned schema migrations.
//!
//! Each migration is applied at most once, tracked in a `schema_migrations`
//! table, inside its own transaction. This replaces the reference
//! implementation's `try: ALTER TABLE ... except OperationalError: pass`
//! self-migration, which silently swallowed any ALTER failure unrelated to
//! "column already exists". [`column_exists`] and [`table_exists`] let a
//! later migration check the schema before attempting an additive change,
//! the same idempotence the old pattern was reaching for, without hiding
//! real errors.

mod v001_initial;

use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

use crate::to_storage_err;

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&Connection) -> CortexResult<()>,
}

pub fn all() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "initial schema: memories, memories_fts, memory_links, sessions, checkpoints",
        apply: v001_initial::apply,
    }]
}

/// Run every migration with `version` greater than the database's current
/// `user_version` pragma, in ascending order.
pub fn run_migrations(conn: &Connection) -> CortexResult<()> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    for migration in all() {
        if migration.version <= current {
            continue;
        }
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_storage_err(e.to_string()))?;
        let result = (migration.apply)(conn);
        match result {
            Ok(()) => {
                conn.pragma_update(None, "user_version", migration.version)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(e.to_string()))?;
                tracing::info!(version = migration.version, desc = migration.description, "applied migration");
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(cortex_core::CortexError::StorageFault(StorageError::MigrationFailed {
                    version: migration.version,
                    reason: e.to_string(),
                }));
            }
        }
    }
    Ok(())
}

/// Whether `table` exists in the database.
pub fn table_exists(conn: &Connection, table: &str) -> CortexResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count > 0)
}

/// Whether `table` has a column named `column`.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> CortexResult<bool> {
    if !table_exists(conn, table)? {
        return Ok(false);
    }
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| to_storage_err(e.to_string()))?
        .filter_map(Result::ok)
        .any(|name| name == column);
    Ok(exists)
}
