//! FTS5 full-text search, with a `LIKE` fallback for queries FTS5 can't
//! parse (pure punctuation, stopword-only input, etc).

use rusqlite::{params, Connection};

use cortex_core::constants::MAX_FTS_QUERY_WORDS;
use cortex_core::errors::CortexResult;
use cortex_core::memory::Memory;

use crate::to_storage_err;

/// Strip everything but alphanumerics and whitespace, cap at
/// `MAX_FTS_QUERY_WORDS` words, and join with `OR` so any word matching is
/// enough. Returns `None` if nothing usable survives (e.g. an all-punctuation
/// query), signalling the caller should skip FTS and fall back to `LIKE`.
pub fn sanitize_fts_query(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().take(MAX_FTS_QUERY_WORDS).collect();
    if words.is_empty() {
        return None;
    }
    Some(words.iter().map(|w| format!("\"{w}\"")).collect::<Vec<_>>().join(" OR "))
}

/// Search `namespace` with FTS5, ranked by BM25 (`rank`, ascending is more
/// relevant). Falls back to a `LIKE %query%` scan when the query sanitizes to
/// nothing.
pub fn search_fts(conn: &Connection, namespace: &str, query: &str, limit: usize) -> CortexResult<Vec<(Memory, f64)>> {
    let Some(fts_query) = sanitize_fts_query(query) else {
        return search_like(conn, namespace, query, limit);
    };

    let mut stmt = conn
        .prepare(
            "SELECT m.id, m.content, m.content_hash, m.memory_type, m.importance, m.namespace, \
                    m.tags, m.metadata, m.embedding, m.decay_score, m.created_at, m.accessed_at, \
                    m.access_count, m.expires_at, fts.rank \
             FROM memories_fts fts \
             JOIN memories m ON m.id = fts.rowid \
             WHERE memories_fts MATCH ?1 AND m.namespace = ?2 \
               AND (m.expires_at IS NULL OR m.expires_at > ?3) \
             ORDER BY fts.rank \
             LIMIT ?4",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let now = chrono::Utc::now().to_rfc3339();
    let rows = stmt
        .query_map(params![fts_query, namespace, now, limit as i64], |row| {
            let memory = super::memory_crud::row_to_memory(row)?;
            let rank: f64 = row.get(14)?;
            Ok((memory, rank))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut results = Vec::new();
    for row in rows {
        let (memory, rank) = row.map_err(|e| to_storage_err(e.to_string()))?;
        // bm25 rank is negative-is-better in sqlite's fts5; convert to a
        // positive relevance score so callers can treat higher as better.
        let relevance = 1.0 / (1.0 + rank.abs());
        results.push((memory, relevance));
    }
    Ok(results)
}

fn search_like(conn: &Connection, namespace: &str, query: &str, limit: usize) -> CortexResult<Vec<(Memory, f64)>> {
    let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
    let mut stmt = conn
        .prepare(
            "SELECT id, content, content_hash, memory_type, importance, namespace, tags, metadata, \
                    embedding, decay_score, created_at, accessed_at, access_count, expires_at \
             FROM memories \
             WHERE namespace = ?1 AND content LIKE ?2 \
               AND (expires_at IS NULL OR expires_at > ?3) \
             ORDER BY importance DESC, accessed_at DESC \
             LIMIT ?4",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let now = chrono::Utc::now().to_rfc3339();
    let rows = stmt
        .query_map(params![namespace, pattern, now, limit as i64], super::memory_crud::row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut results = Vec::new();
    for row in rows {
        let memory = row.map_err(|e| to_storage_err(e.to_string()))?;
        results.push((memory, 0.5));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_and_caps_word_count() {
        let q = sanitize_fts_query("rust: async/await patterns!! 1 2 3 4 5 6 7 8 9 10 11 12");
        let q = q.unwrap();
        assert_eq!(q.matches(" OR ").count() + 1, MAX_FTS_QUERY_WORDS);
    }

    #[test]
    fn empty_after_sanitizing_returns_none() {
        assert_eq!(sanitize_fts_query("### *** ???"), None);
    }
}
