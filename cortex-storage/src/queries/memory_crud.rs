//! Create, read, update, delete for the `memories` table.
//!
//! `store` deduplicates by `content_hash` across the whole tenant store
//! (not scoped to a namespace): storing content that already exists bumps
//! the existing row's `access_count` and raises its `importance` to the
//! max of old and new, rather than creating a second row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use cortex_core::errors::CortexResult;
use cortex_core::memory::{Memory, MemoryType};

use crate::to_storage_err;

const SELECT_COLUMNS: &str = "id, content, content_hash, memory_type, importance, namespace, \
     tags, metadata, embedding, decay_score, created_at, accessed_at, access_count, expires_at";

pub(crate) fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let memory_type_str: String = row.get(3)?;
    let tags_json: String = row.get(6)?;
    let metadata_json: String = row.get(7)?;
    let embedding_blob: Option<Vec<u8>> = row.get(8)?;
    let created_at: String = row.get(10)?;
    let accessed_at: String = row.get(11)?;
    let expires_at: Option<String> = row.get(13)?;

    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        content_hash: row.get(2)?,
        memory_type: MemoryType::parse(&memory_type_str).unwrap_or(MemoryType::Fact),
        importance: row.get(4)?,
        namespace: row.get(5)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
        embedding: embedding_blob.map(|b| crate::queries::vector_search::bytes_to_f32_vec(&b)),
        decay_score: row.get(9)?,
        created_at: parse_dt(&created_at),
        accessed_at: parse_dt(&accessed_at),
        access_count: row.get(12)?,
        expires_at: expires_at.as_deref().map(parse_dt),
    })
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// The outcome of [`store`]: the stored row (possibly merged into an
/// existing one) plus whether this call found an existing row rather than
/// inserting a new one. `duplicate` is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub memory: Memory,
    pub duplicate: bool,
}

impl std::ops::Deref for StoreOutcome {
    type Target = Memory;
    fn deref(&self) -> &Memory {
        &self.memory
    }
}

/// Insert `memory`, or if a row with the same `content_hash` already exists
/// anywhere in the tenant store, merge into it instead. Returns the stored
/// row, which may differ from `memory` (new id, merged importance/access
/// count), tagged with whether this was a merge into an existing row.
pub fn store(conn: &Connection, memory: &Memory) -> CortexResult<StoreOutcome> {
    let existing = get_by_hash(conn, &memory.content_hash)?;
    if let Some(existing) = existing {
        let merged_importance = memory.importance.max(existing.importance);
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, importance = ?1, accessed_at = ?2 \
             WHERE id = ?3",
            params![merged_importance, Utc::now().to_rfc3339(), existing.id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        let memory = get(conn, existing.id)?.ok_or_else(|| {
            cortex_core::CortexError::Internal("memory vanished after dedup update".into())
        })?;
        return Ok(StoreOutcome { memory, duplicate: true });
    }

    let tags_json = serde_json::to_string(&memory.tags).map_err(|e| to_storage_err(e.to_string()))?;
    let metadata_json =
        serde_json::to_string(&memory.metadata).map_err(|e| to_storage_err(e.to_string()))?;
    let embedding_blob = memory
        .embedding
        .as_deref()
        .map(crate::queries::vector_search::f32_vec_to_bytes);

    conn.execute(
        "INSERT INTO memories (
            content, content_hash, memory_type, importance, namespace, tags, metadata,
            embedding, decay_score, created_at, accessed_at, access_count, expires_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            memory.content,
            memory.content_hash,
            memory.memory_type.as_str(),
            memory.importance,
            memory.namespace,
            tags_json,
            metadata_json,
            embedding_blob,
            memory.decay_score,
            memory.created_at.to_rfc3339(),
            memory.accessed_at.to_rfc3339(),
            memory.access_count,
            memory.expires_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let id = conn.last_insert_rowid();
    let memory = get(conn, id)?
        .ok_or_else(|| cortex_core::CortexError::Internal("memory vanished after insert".into()))?;
    Ok(StoreOutcome { memory, duplicate: false })
}

/// Look up a memory by its content hash alone — `content_hash` is unique
/// across the whole tenant store, not scoped to a namespace.
pub fn get_by_hash(conn: &Connection, content_hash: &str) -> CortexResult<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE content_hash = ?1"),
        params![content_hash],
        row_to_memory,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Fetch by id and record an access (bumps `access_count`, refreshes
/// `accessed_at`), unless `track_access` is false (used for peeks that
/// shouldn't count, e.g. internal lookups during dedup).
pub fn get(conn: &Connection, id: i64) -> CortexResult<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        row_to_memory,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Like [`get`] but records the access, as a normal read-path retrieval does.
pub fn get_and_touch(conn: &Connection, id: i64) -> CortexResult<Option<Memory>> {
    let found = get(conn, id)?;
    if found.is_some() {
        conn.execute(
            "UPDATE memories SET access_count = access_count + 1, accessed_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        return get(conn, id);
    }
    Ok(None)
}

/// Patch arbitrary fields on an existing memory. `None` leaves a field
/// unchanged. Returns `Ok(None)` if the id doesn't exist.
pub struct MemoryPatch {
    pub content: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub importance: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
    pub namespace: Option<String>,
    pub decay_score: Option<f64>,
}

/// When `patch.content` changes, `content_hash` is recomputed and
/// re-checked for uniqueness against every other row in the tenant store;
/// a collision is reported as [`cortex_core::CortexError::Duplicate`]
/// rather than surfacing the raw UNIQUE-constraint failure.
pub fn update(conn: &Connection, id: i64, patch: &MemoryPatch) -> CortexResult<Option<Memory>> {
    let Some(existing) = get(conn, id)? else {
        return Ok(None);
    };

    let content = patch.content.clone().unwrap_or(existing.content);
    let content_hash = if patch.content.is_some() {
        let recomputed = Memory::compute_content_hash(&content);
        if let Some(collision) = get_by_hash(conn, &recomputed)? {
            if collision.id != id {
                return Err(cortex_core::CortexError::Duplicate(format!(
                    "content hash {recomputed} already used by memory {}",
                    collision.id
                )));
            }
        }
        recomputed
    } else {
        existing.content_hash
    };
    let memory_type = patch.memory_type.unwrap_or(existing.memory_type);
    let importance = patch.importance.unwrap_or(existing.importance).clamp(1, 10);
    let tags = patch.tags.clone().unwrap_or(existing.tags);
    let metadata = patch.metadata.clone().unwrap_or(existing.metadata);
    let namespace = patch.namespace.clone().unwrap_or(existing.namespace);
    let decay_score = patch.decay_score.unwrap_or(existing.decay_score);

    let tags_json = serde_json::to_string(&tags).map_err(|e| to_storage_err(e.to_string()))?;
    let metadata_json = serde_json::to_string(&metadata).map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "UPDATE memories SET content = ?2, content_hash = ?3, memory_type = ?4, importance = ?5, \
         tags = ?6, metadata = ?7, namespace = ?8, decay_score = ?9 WHERE id = ?1",
        params![
            id,
            content,
            content_hash,
            memory_type.as_str(),
            importance,
            tags_json,
            metadata_json,
            namespace,
            decay_score,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> CortexResult<bool> {
    let rows = conn
        .execute("DELETE FROM memories WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

pub fn bulk_get(conn: &Connection, ids: &[i64]) -> CortexResult<Vec<Memory>> {
    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(memory) = get(conn, *id)? {
            results.push(memory);
        }
    }
    Ok(results)
}
