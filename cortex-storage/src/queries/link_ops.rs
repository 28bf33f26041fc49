//! CRUD over `memory_links`. The link graph itself (BFS traversal, cycle
//! avoidance) lives in the `cortex-links` crate, which calls through these
//! primitives against the same connection pool.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use cortex_core::errors::CortexResult;
use cortex_core::memory::{Direction, Link, LinkedMemory, LinkRelation};

use crate::to_storage_err;

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<Link> {
    let relation_str: String = row.get(3)?;
    let metadata_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Link {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relation: LinkRelation::parse(&relation_str).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// The outcome of [`create_link`]: the edge (possibly the one already
/// there) plus whether this call found an existing edge rather than
/// inserting a new one. `duplicate` is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub link: Link,
    pub duplicate: bool,
}

impl std::ops::Deref for LinkOutcome {
    type Target = Link;
    fn deref(&self) -> &Link {
        &self.link
    }
}

/// Create a directed edge, or return the existing one if `(source, target,
/// relation)` is already present — links are idempotent under that triple.
/// Callers are expected to have already verified both endpoints exist;
/// this only guards against the unique-triple collision.
pub fn create_link(
    conn: &Connection,
    source_id: i64,
    target_id: i64,
    relation: LinkRelation,
    metadata: &serde_json::Value,
) -> CortexResult<LinkOutcome> {
    let metadata_json = serde_json::to_string(metadata).map_err(|e| to_storage_err(e.to_string()))?;
    let rows_inserted = conn
        .execute(
            "INSERT OR IGNORE INTO memory_links (source_id, target_id, relation, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![source_id, target_id, relation.as_str(), metadata_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let link = conn
        .query_row(
            "SELECT id, source_id, target_id, relation, metadata, created_at FROM memory_links \
             WHERE source_id = ?1 AND target_id = ?2 AND relation = ?3",
            params![source_id, target_id, relation.as_str()],
            row_to_link,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?
        .ok_or_else(|| cortex_core::CortexError::Internal("link vanished after insert".into()))?;

    Ok(LinkOutcome { link, duplicate: rows_inserted == 0 })
}

pub fn remove_link(conn: &Connection, source_id: i64, target_id: i64, relation: LinkRelation) -> CortexResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM memory_links WHERE source_id = ?1 AND target_id = ?2 AND relation = ?3",
            params![source_id, target_id, relation.as_str()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Remove one edge by its id. Idempotent: the second call on the same id
/// returns `false`.
pub fn remove_link_by_id(conn: &Connection, link_id: i64) -> CortexResult<bool> {
    let rows = conn
        .execute("DELETE FROM memory_links WHERE id = ?1", params![link_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Every outgoing edge from `memory_id`.
pub fn outgoing(conn: &Connection, memory_id: i64) -> CortexResult<Vec<Link>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, target_id, relation, metadata, created_at FROM memory_links \
             WHERE source_id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_id], row_to_link)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|e| to_storage_err(e.to_string()))
}

/// Every incoming edge into `memory_id`.
pub fn incoming(conn: &Connection, memory_id: i64) -> CortexResult<Vec<Link>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, target_id, relation, metadata, created_at FROM memory_links \
             WHERE target_id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_id], row_to_link)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|e| to_storage_err(e.to_string()))
}

/// Both directions, used by BFS traversal which doesn't care about edge
/// direction when walking the graph.
pub fn neighbors(conn: &Connection, memory_id: i64) -> CortexResult<Vec<Link>> {
    let mut links = outgoing(conn, memory_id)?;
    links.extend(incoming(conn, memory_id)?);
    Ok(links)
}

/// Edges adjacent to `memory_id` in `direction`, optionally narrowed to one
/// `relation`, each carrying the content of the memory at the other end.
/// Ordered `created_at DESC`.
pub fn links_for(
    conn: &Connection,
    memory_id: i64,
    direction: Direction,
    relation: Option<LinkRelation>,
) -> CortexResult<Vec<LinkedMemory>> {
    let mut results = Vec::new();
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        results.extend(query_linked(conn, memory_id, "source_id", "target_id", relation)?);
    }
    if matches!(direction, Direction::Incoming | Direction::Both) {
        results.extend(query_linked(conn, memory_id, "target_id", "source_id", relation)?);
    }
    if matches!(direction, Direction::Both) {
        results.sort_by(|a, b| b.link.created_at.cmp(&a.link.created_at));
    }
    Ok(results)
}

fn query_linked(
    conn: &Connection,
    memory_id: i64,
    edge_col: &str,
    linked_col: &str,
    relation: Option<LinkRelation>,
) -> CortexResult<Vec<LinkedMemory>> {
    let sql = format!(
        "SELECT l.id, l.source_id, l.target_id, l.relation, l.metadata, l.created_at, m.content \
         FROM memory_links l JOIN memories m ON m.id = l.{linked_col} \
         WHERE l.{edge_col} = ?1{} ORDER BY l.created_at DESC",
        if relation.is_some() { " AND l.relation = ?2" } else { "" }
    );
    let mapper = |row: &rusqlite::Row<'_>| -> rusqlite::Result<LinkedMemory> {
        let link = row_to_link(row)?;
        let content: String = row.get(6)?;
        Ok(LinkedMemory { link, content })
    };

    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = if let Some(rel) = relation {
        stmt.query_map(params![memory_id, rel.as_str()], mapper)
    } else {
        stmt.query_map(params![memory_id], mapper)
    }
    .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_by_id(conn: &Connection, link_id: i64) -> CortexResult<Option<Link>> {
    conn.query_row(
        "SELECT id, source_id, target_id, relation, metadata, created_at FROM memory_links WHERE id = ?1",
        params![link_id],
        row_to_link,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}
