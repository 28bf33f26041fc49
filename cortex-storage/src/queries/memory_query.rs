//! Listing, priority retrieval, and aggregate stats.

use rusqlite::{params, Connection};

use cortex_core::errors::CortexResult;
use cortex_core::memory::{Memory, MemoryType};

use crate::to_storage_err;

const LIST_COLUMNS: &str = "id, content, content_hash, memory_type, importance, namespace, \
     tags, metadata, embedding, decay_score, created_at, accessed_at, access_count, expires_at";

/// List memories in `namespace`, optionally narrowed by `memory_type` and
/// `min_importance`, paginated via `limit`/`offset`. Ordered
/// `importance DESC, accessed_at DESC`, excluding expired rows.
#[allow(clippy::too_many_arguments)]
pub fn list_memories(
    conn: &Connection,
    namespace: &str,
    memory_type: Option<MemoryType>,
    min_importance: Option<i32>,
    limit: usize,
    offset: usize,
) -> CortexResult<Vec<Memory>> {
    let now = chrono::Utc::now().to_rfc3339();
    let (sql, type_str);
    let rows: Vec<Memory> = if let Some(mt) = memory_type {
        type_str = mt.as_str().to_string();
        sql = format!(
            "SELECT {LIST_COLUMNS} FROM memories WHERE namespace = ?1 AND memory_type = ?2 \
             AND importance >= ?3 AND (expires_at IS NULL OR expires_at > ?4) \
             ORDER BY importance DESC, accessed_at DESC LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
        collect(
            &mut stmt,
            params![namespace, type_str, min_importance.unwrap_or(1), now, limit as i64, offset as i64],
        )?
    } else {
        sql = format!(
            "SELECT {LIST_COLUMNS} FROM memories WHERE namespace = ?1 AND importance >= ?2 \
             AND (expires_at IS NULL OR expires_at > ?3) \
             ORDER BY importance DESC, accessed_at DESC LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
        collect(&mut stmt, params![namespace, min_importance.unwrap_or(1), now, limit as i64, offset as i64])?
    };
    Ok(rows)
}

fn collect(stmt: &mut rusqlite::Statement<'_>, p: impl rusqlite::Params) -> CortexResult<Vec<Memory>> {
    let rows = stmt
        .query_map(p, super::memory_crud::row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(results)
}

/// Highest-importance memories for `namespace`, at or above
/// `min_importance`. Also pulls in memories filed under the store's
/// default namespace, so a caller working in a project-scoped namespace
/// still sees globally pinned facts — matching the reference
/// implementation's `namespace OR 'default'` widening. Ordered
/// `importance DESC, access_count DESC, accessed_at DESC` (priority
/// recall), excluding expired rows.
pub fn priority_memories(
    conn: &Connection,
    namespace: &str,
    default_namespace: &str,
    min_importance: i32,
    limit: usize,
) -> CortexResult<Vec<Memory>> {
    let now = chrono::Utc::now().to_rfc3339();
    let sql = format!(
        "SELECT {LIST_COLUMNS} FROM memories \
         WHERE (namespace = ?1 OR namespace = ?2) AND importance >= ?3 \
         AND (expires_at IS NULL OR expires_at > ?4) \
         ORDER BY importance DESC, access_count DESC, accessed_at DESC LIMIT ?5"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    collect(&mut stmt, params![namespace, default_namespace, min_importance, now, limit as i64])
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Stats {
    pub total_memories: i64,
    pub by_type: Vec<(String, i64)>,
    pub average_importance: f64,
    pub with_embeddings: i64,
    pub namespaces: i64,
}

pub fn stats(conn: &Connection, namespace: &str) -> CortexResult<Stats> {
    let total_memories: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut stmt = conn
        .prepare("SELECT memory_type, COUNT(*) FROM memories WHERE namespace = ?1 GROUP BY memory_type")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let by_type = stmt
        .query_map(params![namespace], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let average_importance: f64 = conn
        .query_row(
            "SELECT COALESCE(AVG(importance), 0.0) FROM memories WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let with_embeddings: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE namespace = ?1 AND embedding IS NOT NULL",
            params![namespace],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let namespaces: i64 = conn
        .query_row("SELECT COUNT(DISTINCT namespace) FROM memories", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Stats {
        total_memories,
        by_type,
        average_importance,
        with_embeddings,
        namespaces,
    })
}

/// Total memory count across every namespace in this tenant's store —
/// unlike [`stats`], not scoped to one namespace. Backs the registry's
/// tenant-wide `max_memories` quota check.
pub fn total_memory_count(conn: &Connection) -> CortexResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}
