//! `Store` — the single entry point onto a tenant's SQLite database.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use cortex_core::constants::{BACKFILL_BATCH_SIZE, DEFAULT_NAMESPACE, MAX_IMPORTANCE, MIN_IMPORTANCE};
use cortex_core::errors::CortexResult;
use cortex_core::memory::{Direction, Link, LinkedMemory, LinkRelation, Memory, MemoryType};
use cortex_core::traits::Embedder;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries;

pub use queries::link_ops::LinkOutcome;
pub use queries::memory_crud::{MemoryPatch, StoreOutcome};
pub use queries::memory_query::Stats as StoreStats;

/// Persistence for one tenant's memories, link graph, and session state.
/// Wraps a [`ConnectionPool`] shared (via `Arc`) with `cortex-links` and
/// `cortex-session`, which issue their own queries against the same tables.
pub struct Store {
    pool: Arc<ConnectionPool>,
    default_namespace: String,
}

impl Store {
    pub fn open(path: &Path) -> CortexResult<Self> {
        Self::open_with_namespace(path, DEFAULT_NAMESPACE)
    }

    pub fn open_with_namespace(path: &Path, default_namespace: &str) -> CortexResult<Self> {
        let pool = ConnectionPool::open(path, crate::pool::ReadPool::default_size())?;
        let store = Self {
            pool: Arc::new(pool),
            default_namespace: default_namespace.to_string(),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> CortexResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        let store = Self {
            pool: Arc::new(pool),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> CortexResult<()> {
        self.pool.with_writer(|conn| migrations::run_migrations(conn))
    }

    /// Shared handle onto the connection pool, for `cortex-links` and
    /// `cortex-session` to issue their own queries against the same
    /// database.
    pub fn pool(&self) -> Arc<ConnectionPool> {
        Arc::clone(&self.pool)
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Build and persist a new memory. Computes `content_hash`, clamps
    /// `importance` to `[1, 10]`, and falls back to the store's default
    /// namespace when none is given. Storing content that already exists in
    /// the namespace (same hash) merges into the existing row instead of
    /// duplicating it.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: i32,
        namespace: Option<&str>,
        tags: Vec<String>,
        metadata: serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> CortexResult<StoreOutcome> {
        if content.trim().is_empty() {
            return Err(cortex_core::CortexError::InvalidInput("content must not be empty".into()));
        }
        let now = Utc::now();
        let memory = Memory {
            id: 0,
            content_hash: Memory::compute_content_hash(content),
            content: content.to_string(),
            memory_type,
            importance: importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE),
            namespace: namespace.unwrap_or(&self.default_namespace).to_string(),
            tags,
            metadata,
            embedding: None,
            decay_score: 1.0,
            created_at: now,
            accessed_at: now,
            access_count: 0,
            expires_at,
        };
        self.pool.with_writer(|conn| queries::memory_crud::store(conn, &memory))
    }

    /// Persist a fully-formed `Memory` as-is (import/restore paths), still
    /// subject to the same dedup-by-hash merge as `store`.
    pub fn store_raw(&self, memory: &Memory) -> CortexResult<StoreOutcome> {
        self.pool.with_writer(|conn| queries::memory_crud::store(conn, memory))
    }

    /// Fetch by id, recording an access.
    pub fn get(&self, id: i64) -> CortexResult<Option<Memory>> {
        self.pool.with_writer(|conn| queries::memory_crud::get_and_touch(conn, id))
    }

    /// Fetch by id without recording an access.
    pub fn peek(&self, id: i64) -> CortexResult<Option<Memory>> {
        self.pool.with_reader(|conn| queries::memory_crud::get(conn, id))
    }

    pub fn update(&self, id: i64, patch: &MemoryPatch) -> CortexResult<Option<Memory>> {
        self.pool.with_writer(|conn| queries::memory_crud::update(conn, id, patch))
    }

    pub fn delete(&self, id: i64) -> CortexResult<bool> {
        self.pool.with_writer(|conn| queries::memory_crud::delete(conn, id))
    }

    pub fn bulk_get(&self, ids: &[i64]) -> CortexResult<Vec<Memory>> {
        self.pool.with_reader(|conn| queries::memory_crud::bulk_get(conn, ids))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn list(
        &self,
        namespace: &str,
        memory_type: Option<MemoryType>,
        min_importance: Option<i32>,
        limit: usize,
        offset: usize,
    ) -> CortexResult<Vec<Memory>> {
        self.pool.with_reader(|conn| {
            queries::memory_query::list_memories(conn, namespace, memory_type, min_importance, limit, offset)
        })
    }

    /// Highest-importance memories, widened to also include the store's
    /// default namespace.
    pub fn priority_memories(&self, namespace: &str, min_importance: i32, limit: usize) -> CortexResult<Vec<Memory>> {
        self.pool.with_reader(|conn| {
            queries::memory_query::priority_memories(conn, namespace, &self.default_namespace, min_importance, limit)
        })
    }

    /// Total memory count across every namespace this tenant owns.
    pub fn total_memory_count(&self) -> CortexResult<i64> {
        self.pool.with_reader(queries::memory_query::total_memory_count)
    }

    pub fn search_fts(&self, namespace: &str, query: &str, limit: usize) -> CortexResult<Vec<(Memory, f64)>> {
        self.pool.with_reader(|conn| queries::memory_search::search_fts(conn, namespace, query, limit))
    }

    pub fn search_vector(&self, namespace: &str, embedding: &[f32], limit: usize) -> CortexResult<Vec<(Memory, f64)>> {
        self.pool.with_reader(|conn| queries::vector_search::search_vector(conn, namespace, embedding, limit))
    }

    pub fn update_embedding(&self, id: i64, embedding: &[f32]) -> CortexResult<bool> {
        self.pool.with_writer(|conn| queries::vector_search::update_embedding(conn, id, embedding))
    }

    pub fn list_without_embeddings(&self, namespace: &str, limit: usize) -> CortexResult<Vec<Memory>> {
        self.pool.with_reader(|conn| queries::vector_search::list_without_embeddings(conn, namespace, limit))
    }

    /// Embed and store every memory in `namespace` missing an embedding,
    /// in batches of [`BACKFILL_BATCH_SIZE`], until none remain. Returns the
    /// total count updated. Idempotent: a second call returns 0. With a
    /// null embedder (`dimensions() == 0`) this is a no-op, per the
    /// degrade-gracefully contract on [`Embedder`].
    pub fn backfill_embeddings(&self, namespace: &str, embedder: &dyn Embedder) -> CortexResult<usize> {
        if embedder.dimensions() == 0 {
            return Ok(0);
        }

        let mut updated = 0usize;
        loop {
            let batch = self.list_without_embeddings(namespace, BACKFILL_BATCH_SIZE)?;
            if batch.is_empty() {
                break;
            }
            for memory in &batch {
                let embedding = embedder.embed(&memory.content);
                if self.update_embedding(memory.id, &embedding)? {
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    pub fn stats(&self, namespace: &str) -> CortexResult<StoreStats> {
        self.pool.with_reader(|conn| queries::memory_query::stats(conn, namespace))
    }

    pub fn cleanup_expired(&self) -> CortexResult<usize> {
        self.pool.with_writer(|conn| queries::maintenance::cleanup_expired(conn))
    }

    pub fn prune(&self, namespace: &str, min_importance: i32, older_than_days: i64) -> CortexResult<usize> {
        self.pool.with_writer(|conn| queries::maintenance::prune(conn, namespace, min_importance, older_than_days))
    }

    pub fn vacuum(&self) -> CortexResult<()> {
        self.pool.with_writer(|conn| queries::maintenance::vacuum(conn))
    }

    pub fn create_link(
        &self,
        source_id: i64,
        target_id: i64,
        relation: LinkRelation,
        metadata: &serde_json::Value,
    ) -> CortexResult<LinkOutcome> {
        self.pool.with_writer(|conn| {
            if queries::memory_crud::get(conn, source_id)?.is_none() {
                return Err(cortex_core::CortexError::NotFound(format!("memory {source_id}")));
            }
            if queries::memory_crud::get(conn, target_id)?.is_none() {
                return Err(cortex_core::CortexError::NotFound(format!("memory {target_id}")));
            }
            queries::link_ops::create_link(conn, source_id, target_id, relation, metadata)
        })
    }

    pub fn remove_link(&self, source_id: i64, target_id: i64, relation: LinkRelation) -> CortexResult<bool> {
        self.pool.with_writer(|conn| queries::link_ops::remove_link(conn, source_id, target_id, relation))
    }

    pub fn remove_link_by_id(&self, link_id: i64) -> CortexResult<bool> {
        self.pool.with_writer(|conn| queries::link_ops::remove_link_by_id(conn, link_id))
    }

    pub fn neighbors(&self, memory_id: i64) -> CortexResult<Vec<Link>> {
        self.pool.with_reader(|conn| queries::link_ops::neighbors(conn, memory_id))
    }

    /// Edges adjacent to `memory_id`, each carrying the linked memory's
    /// content. See [`queries::link_ops::links_for`].
    pub fn links_for(
        &self,
        memory_id: i64,
        direction: Direction,
        relation: Option<LinkRelation>,
    ) -> CortexResult<Vec<LinkedMemory>> {
        self.pool.with_reader(|conn| queries::link_ops::links_for(conn, memory_id, direction, relation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Store {
        Store::open_in_memory().expect("open in-memory store")
    }

    struct ConstantEmbedder {
        dims: usize,
    }

    impl Embedder for ConstantEmbedder {
        fn embed(&self, _text: &str) -> Vec<f32> {
            vec![1.0; self.dims]
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    #[test]
    fn store_and_get_round_trips() {
        let store = open();
        let saved = store
            .store("remember this", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None)
            .unwrap();
        assert!(saved.id > 0);
        let fetched = store.get(saved.id).unwrap().unwrap();
        assert_eq!(fetched.content, "remember this");
        assert_eq!(fetched.access_count, 1, "get() must record an access");
    }

    #[test]
    fn storing_duplicate_content_merges_instead_of_inserting() {
        let store = open();
        let first = store
            .store("same content", MemoryType::Fact, 3, None, vec![], serde_json::json!({}), None)
            .unwrap();
        let second = store
            .store("same content", MemoryType::Fact, 8, None, vec![], serde_json::json!({}), None)
            .unwrap();
        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(first.id, second.id);
        assert_eq!(second.importance, 8, "importance should merge to the max");
        assert_eq!(second.access_count, 1);
    }

    #[test]
    fn importance_is_clamped() {
        let store = open();
        let saved = store
            .store("x", MemoryType::Fact, 99, None, vec![], serde_json::json!({}), None)
            .unwrap();
        assert_eq!(saved.importance, MAX_IMPORTANCE);
    }

    #[test]
    fn delete_removes_the_row() {
        let store = open();
        let saved = store
            .store("to delete", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None)
            .unwrap();
        assert!(store.delete(saved.id).unwrap());
        assert!(store.peek(saved.id).unwrap().is_none());
    }

    #[test]
    fn fts_search_finds_matching_content() {
        let store = open();
        store
            .store("the quick brown fox", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None)
            .unwrap();
        let results = store.search_fts(DEFAULT_NAMESPACE, "fox", 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn priority_memories_widens_to_default_namespace() {
        let store = open();
        store
            .store("global fact", MemoryType::Fact, 9, Some(DEFAULT_NAMESPACE), vec![], serde_json::json!({}), None)
            .unwrap();
        store
            .store("project fact", MemoryType::Fact, 7, Some("proj-a"), vec![], serde_json::json!({}), None)
            .unwrap();
        let results = store.priority_memories("proj-a", 1, 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn create_link_is_idempotent() {
        let store = open();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let link1 = store.create_link(a.id, b.id, LinkRelation::Related, &serde_json::json!({})).unwrap();
        let link2 = store.create_link(a.id, b.id, LinkRelation::Related, &serde_json::json!({})).unwrap();
        assert_eq!(link1.id, link2.id);
        assert!(!link1.duplicate);
        assert!(link2.duplicate);
    }

    #[test]
    fn links_for_respects_direction_relation_and_ordering() {
        let store = open();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let b = store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let c = store.store("c", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        store.create_link(a.id, b.id, LinkRelation::Related, &serde_json::json!({})).unwrap();
        store.create_link(a.id, c.id, LinkRelation::CausedBy, &serde_json::json!({})).unwrap();
        store.create_link(c.id, a.id, LinkRelation::Related, &serde_json::json!({})).unwrap();

        let outgoing = store.links_for(a.id, Direction::Outgoing, None).unwrap();
        assert_eq!(outgoing.len(), 2);
        assert_eq!(outgoing[0].link.created_at, outgoing[0].link.created_at.max(outgoing[1].link.created_at));

        let related_only = store.links_for(a.id, Direction::Both, Some(LinkRelation::Related)).unwrap();
        assert_eq!(related_only.len(), 2);
        assert!(related_only.iter().all(|lm| lm.link.relation == LinkRelation::Related));

        let incoming = store.links_for(a.id, Direction::Incoming, None).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].content, "c");
    }

    #[test]
    fn create_link_rejects_a_missing_endpoint() {
        let store = open();
        let a = store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let err = store.create_link(a.id, 999_999, LinkRelation::Related, &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, cortex_core::CortexError::NotFound(_)));
    }

    #[test]
    fn content_hash_dedup_is_cross_namespace() {
        let store = open();
        let first = store
            .store("shared content", MemoryType::Fact, 5, Some("ns-a"), vec![], serde_json::json!({}), None)
            .unwrap();
        let second = store
            .store("shared content", MemoryType::Fact, 5, Some("ns-b"), vec![], serde_json::json!({}), None)
            .unwrap();
        assert!(second.duplicate);
        assert_eq!(first.id, second.id);
        assert_eq!(second.namespace, "ns-a", "merge keeps the original row's namespace");
    }

    #[test]
    fn update_into_an_existing_hash_is_reported_as_duplicate() {
        let store = open();
        store.store("alpha", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let beta = store.store("beta", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();

        let patch = MemoryPatch {
            content: Some("alpha".to_string()),
            memory_type: None,
            importance: None,
            tags: None,
            metadata: None,
            namespace: None,
            decay_score: None,
        };
        let err = store.update(beta.id, &patch).unwrap_err();
        assert!(matches!(err, cortex_core::CortexError::Duplicate(_)));
    }

    #[test]
    fn backfill_embeddings_is_idempotent() {
        let store = open();
        store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        store.store("b", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let embedder = ConstantEmbedder { dims: 4 };

        let updated = store.backfill_embeddings(DEFAULT_NAMESPACE, &embedder).unwrap();
        assert_eq!(updated, 2);
        assert!(store.list_without_embeddings(DEFAULT_NAMESPACE, 10).unwrap().is_empty());

        let second_pass = store.backfill_embeddings(DEFAULT_NAMESPACE, &embedder).unwrap();
        assert_eq!(second_pass, 0);
    }

    #[test]
    fn backfill_embeddings_is_a_no_op_for_the_null_embedder() {
        let store = open();
        store.store("a", MemoryType::Fact, 5, None, vec![], serde_json::json!({}), None).unwrap();
        let embedder = ConstantEmbedder { dims: 0 };
        assert_eq!(store.backfill_embeddings(DEFAULT_NAMESPACE, &embedder).unwrap(), 0);
        assert_eq!(store.list_without_embeddings(DEFAULT_NAMESPACE, 10).unwrap().len(), 1);
    }
}
