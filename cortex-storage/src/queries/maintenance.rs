//! Expiry sweeps, low-value pruning, and VACUUM.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};

use cortex_core::constants::PRUNE_ACCESS_COUNT_CEILING;
use cortex_core::errors::CortexResult;

use crate::to_storage_err;

/// Hard-delete memories whose `expires_at` has passed. Returns the count
/// removed.
pub fn cleanup_expired(conn: &Connection) -> CortexResult<usize> {
    let now = Utc::now().to_rfc3339();
    let deleted = conn
        .execute("DELETE FROM memories WHERE expires_at IS NOT NULL AND expires_at <= ?1", params![now])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(deleted)
}

/// Delete memories in `namespace` that are simultaneously stale
/// (`accessed_at` older than `older_than_days`), unimportant
/// (`importance < min_importance`), and rarely touched
/// (`access_count < PRUNE_ACCESS_COUNT_CEILING`). All three conditions must
/// hold — pruning never removes a memory that's either important or
/// frequently accessed, regardless of age.
pub fn prune(conn: &Connection, namespace: &str, min_importance: i32, older_than_days: i64) -> CortexResult<usize> {
    let cutoff = (Utc::now() - Duration::days(older_than_days)).to_rfc3339();
    let deleted = conn
        .execute(
            "DELETE FROM memories WHERE namespace = ?1 AND accessed_at < ?2 \
             AND importance < ?3 AND access_count < ?4",
            params![namespace, cutoff, min_importance, PRUNE_ACCESS_COUNT_CEILING],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(deleted)
}

pub fn vacuum(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch("VACUUM").map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
