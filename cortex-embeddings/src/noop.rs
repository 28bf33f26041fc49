use cortex_core::traits::Embedder;

/// The null embedder. Used when a tenant or tier has embeddings disabled;
/// every caller downstream already treats `dimensions() == 0` as "skip the
/// semantic lane".
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmbedder;

impl Embedder for NoopEmbedder {
    fn embed(&self, _text: &str) -> Vec<f32> {
        Vec::new()
    }

    fn dimensions(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_empty_vector_and_zero_dims() {
        let e = NoopEmbedder;
        assert_eq!(e.dimensions(), 0);
        assert!(e.embed("anything").is_empty());
    }
}
