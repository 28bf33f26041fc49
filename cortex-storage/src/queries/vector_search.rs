//! Brute-force cosine similarity search over packed float32 embeddings.
//!
//! No ANN index: every embedded memory in the namespace is scanned and
//! scored. Fine at the scale this store targets, and it sidesteps pulling
//! in a vector extension just for approximate results.

use rusqlite::{params, Connection};

use cortex_core::errors::CortexResult;
use cortex_core::memory::Memory;

use crate::to_storage_err;

pub fn f32_vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every embedded, non-expired memory in `namespace` against
/// `query_embedding` and return the top `limit` by similarity descending.
/// Vectors whose length doesn't match the query are skipped rather than
/// erroring, so a namespace can mix embeddings from different model
/// generations without breaking search.
pub fn search_vector(
    conn: &Connection,
    namespace: &str,
    query_embedding: &[f32],
    limit: usize,
) -> CortexResult<Vec<(Memory, f64)>> {
    let query_norm_sq: f64 = query_embedding.iter().map(|x| (*x as f64).powi(2)).sum();
    if query_norm_sq == 0.0 {
        return Ok(vec![]);
    }
    let query_len = query_embedding.len();

    let mut stmt = conn
        .prepare(
            "SELECT id, embedding FROM memories \
             WHERE namespace = ?1 AND embedding IS NOT NULL \
               AND (expires_at IS NULL OR expires_at > ?2)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let now = chrono::Utc::now().to_rfc3339();
    let rows = stmt
        .query_map(params![namespace, now], |row| {
            let id: i64 = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(i64, f64)> = Vec::new();
    for row in rows {
        let (id, blob) = row.map_err(|e| to_storage_err(e.to_string()))?;
        let stored = bytes_to_f32_vec(&blob);
        if stored.len() != query_len {
            continue;
        }
        let sim = cosine_similarity(query_embedding, &stored);
        if sim > 0.0 {
            scored.push((id, sim));
        }
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    let mut results = Vec::with_capacity(scored.len());
    for (id, sim) in scored {
        if let Some(memory) = super::memory_crud::get(conn, id)? {
            results.push((memory, sim));
        }
    }
    Ok(results)
}

pub fn update_embedding(conn: &Connection, id: i64, embedding: &[f32]) -> CortexResult<bool> {
    let blob = f32_vec_to_bytes(embedding);
    let rows = conn
        .execute("UPDATE memories SET embedding = ?2 WHERE id = ?1", params![id, blob])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

pub fn list_without_embeddings(conn: &Connection, namespace: &str, limit: usize) -> CortexResult<Vec<Memory>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, content, content_hash, memory_type, importance, namespace, tags, metadata, \
                    embedding, decay_score, created_at, accessed_at, access_count, expires_at \
             FROM memories WHERE namespace = ?1 AND embedding IS NULL ORDER BY id LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![namespace, limit as i64], super::memory_crud::row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(results)
}
