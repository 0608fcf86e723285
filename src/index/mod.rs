// Vector index module
// Exact in-memory nearest neighbour search over normalized embeddings


use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::embeddings::{Embedder, dot, normalize};
use crate::ingestion::Chunk;
use crate::{ChatError, Result};

/// A chunk paired with its unit-length embedding
#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A retrieved chunk with its cosine similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Immutable vector index over the chunks of one indexing run.
/// Rebuilding means constructing a new index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    model: String,
    built_at: DateTime<Utc>,
}

impl VectorIndex {
    /// Embed every chunk and build the index.
    ///
    /// Fails with [`ChatError::NoDocuments`] when there is nothing to index and
    /// with [`ChatError::Embedding`] when the backend fails or returns
    /// inconsistent vectors; a partial index is never returned.
    #[inline]
    pub fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self> {
        if chunks.is_empty() {
            return Err(ChatError::NoDocuments);
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(embedder.batch_size().max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder.embed(&texts)?;
            if embedded.len() != batch.len() {
                bar.abandon();
                return Err(ChatError::Embedding(format!(
                    "Backend returned {} embeddings for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
            bar.set_position(vectors.len() as u64);
        }
        bar.finish_and_clear();

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(ChatError::Embedding(
                "Backend returned empty embeddings".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, mut vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(ChatError::Embedding(format!(
                    "Inconsistent embedding dimension for chunk {}: expected {}, got {}",
                    chunk.id,
                    dimension,
                    vector.len()
                )));
            }
            normalize(&mut vector);
            entries.push(IndexEntry { chunk, vector });
        }

        info!(
            "Built vector index with {} chunks ({} dimensions, model {})",
            entries.len(),
            dimension,
            embedder.model()
        );

        Ok(Self {
            entries,
            dimension,
            model: embedder.model().to_string(),
            built_at: Utc::now(),
        })
    }

    /// Embed `text` and return the `k` most similar chunks
    #[inline]
    pub fn query(
        &self,
        text: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<ScoredChunk<'_>>> {
        if embedder.model() != self.model {
            return Err(ChatError::Embedding(format!(
                "Index was built with model '{}' but the query uses '{}'",
                self.model,
                embedder.model()
            )));
        }

        let vector = embedder.embed_one(text)?;
        self.query_vector(&vector, k)
    }

    /// Return the `k` chunks most similar to `vector`, best first. Equal
    /// scores are ordered by ascending chunk id.
    #[inline]
    pub fn query_vector(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk<'_>>> {
        if vector.len() != self.dimension {
            return Err(ChatError::Embedding(format!(
                "Query has {} dimensions but the index has {}",
                vector.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut query = vector.to_vec();
        normalize(&mut query);

        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: &entry.chunk,
                score: dot(&query, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(k);

        debug!(
            "Query returned {} chunk(s), best score {:?}",
            scored.len(),
            scored.first().map(|s| s.score)
        );

        Ok(scored)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Chunks in id order
    #[inline]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Distinct source files, sorted
    #[inline]
    pub fn sources(&self) -> Vec<&str> {
        self.chunks()
            .map(|chunk| chunk.source.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
