//! Tunables shared across the workspace. Centralized so storage, retrieval,
//! and the registry agree on the same numbers without re-deriving them.

/// Content hash is the first 8 bytes (16 hex chars) of SHA-256 over content.
pub const CONTENT_HASH_HEX_LEN: usize = 16;

/// Importance is clamped to this inclusive range everywhere in the system.
pub const MIN_IMPORTANCE: i32 = 1;
pub const MAX_IMPORTANCE: i32 = 10;

/// `sanitize_fts_query` keeps at most this many words from the raw input.
pub const MAX_FTS_QUERY_WORDS: usize = 10;

/// `LinkGraph::graph` clamps caller-supplied depth to this ceiling.
pub const MAX_GRAPH_DEPTH: usize = 5;

/// Node content is truncated to this many characters in graph traversal results.
pub const GRAPH_NODE_CONTENT_TRUNCATE: usize = 200;

/// Default namespace, always implicitly visible alongside the requested one
/// in priority recall (see cortex-storage::queries::memory_query).
pub const DEFAULT_NAMESPACE: &str = "default";

/// ContextBuilder candidate pool sizes per source.
pub const CONTEXT_FTS_LIMIT: usize = 50;
pub const CONTEXT_VECTOR_LIMIT: usize = 50;
pub const CONTEXT_PRIORITY_LIMIT: usize = 30;

/// Rough token estimate: ~4 characters per token for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Minimum access_count below which `prune` considers a memory eligible for removal.
pub const PRUNE_ACCESS_COUNT_CEILING: i64 = 3;

/// `backfill_embeddings` processes memories missing an embedding in batches
/// of this size, one `embed` call per row, until a batch comes back empty.
pub const BACKFILL_BATCH_SIZE: usize = 100;
