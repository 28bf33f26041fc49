use std::path::PathBuf;

/// Global configuration for a Cortex deployment, built once at startup and
/// threaded through the registry and every component it constructs. Replaces
/// the environment-driven globals of the reference implementation.
#[derive(Debug, Clone)]
pub struct CortexConfig {
    /// Root directory under which each tenant gets its own subdirectory
    /// holding a single SQLite database file.
    pub data_dir: PathBuf,
    /// Namespace used when none is supplied by the caller.
    pub default_namespace: String,
    /// Whether an embedder should be wired up at all. When false, the
    /// registry hands out a no-op embedder regardless of tier.
    pub enable_embeddings: bool,
    /// Expected embedding dimension. Vectors of any other length are
    /// treated as a mismatch (similarity 0) rather than an error.
    pub embedding_dimensions: usize,
    pub autosave: AutoSaveDefaults,
}

/// Defaults an `AutoSave` instance is constructed with before a caller
/// calls `configure`.
#[derive(Debug, Clone, Copy)]
pub struct AutoSaveDefaults {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub message_threshold: u64,
    pub ram_threshold_pct: f64,
    pub on_session_end: bool,
}

impl Default for AutoSaveDefaults {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 1800,
            message_threshold: 500,
            ram_threshold_pct: 85.0,
            on_session_end: true,
        }
    }
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cortex"),
            default_namespace: crate::constants::DEFAULT_NAMESPACE.to_string(),
            enable_embeddings: true,
            embedding_dimensions: 256,
            autosave: AutoSaveDefaults::default(),
        }
    }
}
