use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::MemoryType;
use crate::constants::CONTENT_HASH_HEX_LEN;

/// The universal memory struct. Every memory in the system is a `Memory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Monotonic integer, tenant-unique, assigned on first persist.
    pub id: i64,
    /// Non-empty text content.
    pub content: String,
    /// First 16 hex chars of SHA-256 over `content`. Unique per tenant store.
    pub content_hash: String,
    pub memory_type: MemoryType,
    /// Clamped to [1, 10] at every write path.
    pub importance: i32,
    /// Partitions visibility within a tenant.
    pub namespace: String,
    /// Indexed into FTS alongside content and namespace.
    pub tags: Vec<String>,
    /// Opaque key/value bag, not indexed.
    pub metadata: serde_json::Value,
    /// Dense float32 vector of the configured dimension, or absent.
    pub embedding: Option<Vec<f32>>,
    /// Forgetting-curve score in [0, 1]. 1.0 by default.
    pub decay_score: f64,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub access_count: i64,
    /// When set and in the past, the memory is logically deleted for reads.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Memory {
    /// Compute the content hash: first 16 hex chars of SHA-256(content).
    /// Must not include tags or metadata — stable across processes.
    pub fn compute_content_hash(content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        let hex = hex_encode(&digest);
        hex[..CONTENT_HASH_HEX_LEN].to_string()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").expect("writing to a String never fails");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_16_hex_chars() {
        let hash = Memory::compute_content_hash("Python is great");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_hash_is_stable() {
        let a = Memory::compute_content_hash("same content");
        let b = Memory::compute_content_hash("same content");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_ignores_nothing_but_content() {
        // Same content, different case, must differ — hash is over raw bytes.
        let a = Memory::compute_content_hash("Same");
        let b = Memory::compute_content_hash("same");
        assert_ne!(a, b);
    }
}
