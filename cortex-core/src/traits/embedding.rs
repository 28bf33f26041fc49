/// Narrow capability for text → fixed-dimension vector embedding. A single
/// implementation is shared across concurrent callers, so implementors must
/// be `Send + Sync`.
///
/// A null implementation (`dimensions() == 0`, `embed()` returns an empty
/// vector) lets the rest of the system degrade gracefully: vector search is
/// skipped, `ContextBuilder` omits its semantic lane, and
/// `backfill_embeddings` reports zero work done.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a vector of `dimensions()` floats (or empty, for
    /// the null implementation).
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Dimensionality of vectors returned by `embed`. Zero signals "no
    /// embedder configured".
    fn dimensions(&self) -> usize;
}
