use std::collections::HashMap;

use cortex_core::traits::Embedder;

/// Deterministic dense embedding built from hashed term frequencies
/// (a fixed-dimension bag-of-words, not a learned representation). Stands in
/// for a local sentence-embedding model: same interface, no weights to load.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_term(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h as usize) % dims
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| s.len() >= 2)
            .map(|s| s.to_lowercase())
            .collect()
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let tokens = Self::tokenize(text);
        let mut vec = vec![0.0f32; self.dimensions];
        if tokens.is_empty() {
            return vec;
        }

        let mut tf: HashMap<String, f32> = HashMap::new();
        for tok in &tokens {
            *tf.entry(tok.clone()).or_default() += 1.0;
        }
        let total = tokens.len() as f32;

        for (term, count) in &tf {
            let freq = count / total;
            let weight = 1.0 + (term.len() as f32).ln();
            let bucket = Self::hash_term(term, self.dimensions);
            vec[bucket] += freq * weight;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_dimensions() {
        let e = HashingEmbedder::new(128);
        assert_eq!(e.embed("hello world").len(), 128);
    }

    #[test]
    fn is_deterministic() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed("same text"), e.embed("same text"));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashingEmbedder::new(64);
        assert!(e.embed("").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn output_is_unit_norm_for_nonempty_text() {
        let e = HashingEmbedder::new(256);
        let v = e.embed("rust systems programming");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similar_texts_are_closer_than_dissimilar_ones() {
        let e = HashingEmbedder::new(256);
        let a = e.embed("rust programming language");
        let b = e.embed("rust programming systems");
        let c = e.embed("baking bread recipes");

        let cos = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(p, q)| p * q).sum() };
        assert!(cos(&a, &b) > cos(&a, &c));
    }
}
