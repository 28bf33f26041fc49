//! # cortex-context
//!
//! Assembles a single text block for priming an agent's context window: the
//! most relevant memories for a query, plus a namespace's pinned priority
//! memories, packed to fit a token budget. Grounded on the reference
//! implementation's context builder — same three candidate sources (full
//! text, vector, priority), the same relevance/importance fusion, but
//! rewritten against `cortex-storage`'s `Store` instead of loose SQL.

use std::collections::HashMap;

use serde::Serialize;

use cortex_core::constants::{CHARS_PER_TOKEN, CONTEXT_FTS_LIMIT, CONTEXT_PRIORITY_LIMIT, CONTEXT_VECTOR_LIMIT};
use cortex_core::errors::CortexResult;
use cortex_core::memory::Memory;
use cortex_core::traits::Embedder;
use cortex_storage::Store;

/// Rough token estimate: about 4 characters per token for English prose.
/// Good enough for budgeting; not meant to match any specific tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / CHARS_PER_TOKEN).max(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    pub context: String,
    pub memories_used: usize,
    pub token_count: usize,
    pub truncated: bool,
    pub memory_ids: Vec<i64>,
}

struct Candidate {
    memory: Memory,
    score: f64,
}

/// Builds context blocks for a single namespace against a shared `Store`.
pub struct ContextBuilder<'a> {
    store: &'a Store,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Gather candidates for `query` in `namespace` from full text search,
    /// vector search (when `embedder` is set and has nonzero dimensions),
    /// and the namespace's priority memories at or above `min_importance`,
    /// then pack the highest-scoring ones into `max_tokens`.
    pub fn build_context(
        &self,
        namespace: &str,
        query: &str,
        max_tokens: usize,
        min_importance: i32,
        embedder: Option<&dyn Embedder>,
    ) -> CortexResult<ContextResult> {
        let mut candidates: HashMap<i64, Candidate> = HashMap::new();

        if !query.trim().is_empty() {
            for (memory, relevance) in self.store.search_fts(namespace, query, CONTEXT_FTS_LIMIT)? {
                merge_candidate(&mut candidates, memory, relevance);
            }

            if let Some(embedder) = embedder {
                if embedder.dimensions() > 0 {
                    let query_vec = embedder.embed(query);
                    for (memory, similarity) in self.store.search_vector(namespace, &query_vec, CONTEXT_VECTOR_LIMIT)? {
                        merge_candidate(&mut candidates, memory, similarity.clamp(0.0, 1.0));
                    }
                }
            }
        }

        for memory in self.store.priority_memories(namespace, min_importance, CONTEXT_PRIORITY_LIMIT)? {
            let score = memory.importance as f64 / 10.0;
            merge_candidate(&mut candidates, memory, score);
        }

        let mut ranked: Vec<Candidate> = candidates.into_values().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(pack(ranked, max_tokens))
    }
}

/// Merge a scored candidate into the map, keeping the higher of two scores
/// when a memory surfaces from more than one source. Combined score is
/// `0.6 * relevance + 0.4 * importance / 10`.
fn merge_candidate(candidates: &mut HashMap<i64, Candidate>, memory: Memory, relevance_score: f64) {
    let combined = 0.6 * relevance_score + 0.4 * (memory.importance as f64 / 10.0);
    let id = memory.id;
    match candidates.get(&id) {
        Some(existing) if existing.score >= combined => {}
        _ => {
            candidates.insert(id, Candidate { memory, score: combined });
        }
    }
}

fn format_entry(memory: &Memory) -> String {
    let mut entry = format!("[{}|imp:{}] {}", memory.memory_type, memory.importance, memory.content);
    if !memory.tags.is_empty() {
        entry.push_str(&format!("\n  tags: {}", memory.tags.join(", ")));
    }
    entry
}

/// A conservative fixed reserve for the header line
/// (`## Relevant Context (N memories, ~M tokens)\n\n`). The header's exact
/// size barely varies with N/M, so a fixed reserve avoids a circular
/// "header size depends on what fit, what fit depends on header size"
/// computation.
const HEADER_TOKEN_RESERVE: usize = 16;

fn pack(ranked: Vec<Candidate>, max_tokens: usize) -> ContextResult {
    let budget = max_tokens.saturating_sub(HEADER_TOKEN_RESERVE);
    let total_candidates = ranked.len();

    let mut selected: Vec<(Memory, String, usize)> = Vec::new();
    let mut running = 0usize;
    for (i, candidate) in ranked.into_iter().enumerate() {
        let entry = format_entry(&candidate.memory);
        let entry_tokens = estimate_tokens(&entry);
        if i > 0 && running + entry_tokens > budget {
            break;
        }
        running += entry_tokens;
        selected.push((candidate.memory, entry, entry_tokens));
    }

    let truncated = selected.len() < total_candidates;
    let header = format!("## Relevant Context ({} memories, ~{} tokens)\n\n", selected.len(), running);
    let body = selected.iter().map(|(_, entry, _)| entry.clone()).collect::<Vec<_>>().join("\n\n");
    let context = format!("{header}{body}");
    let token_count = estimate_tokens(&context);
    let memory_ids = selected.iter().map(|(m, _, _)| m.id).collect();

    ContextResult {
        context,
        memories_used: selected.len(),
        token_count,
        truncated,
        memory_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::memory::MemoryType;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .store("always use snake_case for python", MemoryType::Preference, 8, None, vec![], serde_json::json!({}), None)
            .unwrap();
        store
            .store("the build is broken on main", MemoryType::Fact, 4, None, vec![], serde_json::json!({}), None)
            .unwrap();
        store
            .store("critical: never commit secrets", MemoryType::Decision, 10, None, vec![], serde_json::json!({}), None)
            .unwrap();
        store
    }

    #[test]
    fn empty_store_returns_empty_context() {
        let store = Store::open_in_memory().unwrap();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "anything", 500, 1, None).unwrap();
        assert_eq!(result.memories_used, 0);
        assert!(!result.truncated);
    }

    #[test]
    fn finds_matching_memories_via_fts() {
        let store = seeded_store();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "python", 500, 1, None).unwrap();
        assert!(result.memories_used >= 1);
        assert!(result.context.contains("snake_case"));
    }

    #[test]
    fn priority_memories_always_included_even_with_empty_query() {
        let store = seeded_store();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "", 500, 1, None).unwrap();
        assert_eq!(result.memories_used, 3);
    }

    #[test]
    fn priority_memories_respect_min_importance_floor() {
        let store = seeded_store();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "", 500, 9, None).unwrap();
        assert_eq!(result.memories_used, 1);
        assert!(result.context.contains("never commit secrets"));
    }

    #[test]
    fn tight_budget_truncates_but_still_includes_one_entry() {
        let store = seeded_store();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "", 10, 1, None).unwrap();
        assert!(result.truncated);
        assert!(result.memories_used >= 1, "the highest-scoring candidate is force-included even under a tight budget");
        assert!(result.memories_used < 3);
    }

    #[test]
    fn higher_importance_memory_ranks_first_without_a_query() {
        let store = seeded_store();
        let builder = ContextBuilder::new(&store);
        let result = builder.build_context("default", "", 500, 1, None).unwrap();
        assert!(result.memory_ids[0] != 0);
        // The importance-10 memory should appear before the importance-4 one.
        let critical_pos = result.context.find("never commit secrets").unwrap();
        let broken_pos = result.context.find("build is broken").unwrap();
        assert!(critical_pos < broken_pos);
    }
}
