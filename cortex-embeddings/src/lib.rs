//! # cortex-embeddings
//!
//! Implementations of [`cortex_core::traits::Embedder`]. There's no inference
//! runtime in this workspace, so `HashingEmbedder` stands in for "a local
//! model": deterministic, dependency-free, and good enough to exercise
//! vector search without calling out to anything.

mod hashing;
mod noop;

pub use hashing::HashingEmbedder;
pub use noop::NoopEmbedder;
