// Embeddings module
// Turns chunk text into vectors through a pluggable backend


pub mod hashing;
pub mod ollama;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::{ChatError, Result};

pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

const DEFAULT_BATCH_SIZE: usize = 32;

/// A backend that maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic: the same text under the same model
/// yields the same vector (up to normalization).
pub trait Embedder {
    /// Identifier of the embedding model in use
    fn model(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Preferred number of texts per `embed` call
    #[inline]
    fn batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Embed a single text
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Embedding("Backend returned no embedding".to_string()))
    }
}

/// Build the embedder selected by the configuration
#[inline]
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Ollama => Ok(Box::new(OllamaEmbedder::new(config)?)),
        EmbeddingBackend::Hashing => Ok(Box::new(HashingEmbedder::new(config.dimension))),
    }
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
#[inline]
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Dot product of two vectors of equal length
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
