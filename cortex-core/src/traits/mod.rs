mod embedding;

pub use embedding::Embedder;
