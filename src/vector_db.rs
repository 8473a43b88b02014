use crate::error::{Error, Result};
use crate::ingestion::DocumentChunk;
use ndarray::Array1;

#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Array1<f32>,
}

/// In-memory vector store over one document's chunks.
pub struct VectorDB {
    entries: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorDB {
    pub fn new(dimension: usize) -> Self {
        VectorDB {
            entries: Vec::new(),
            dimension,
        }
    }

    pub fn add_chunk(&mut self, chunk: DocumentChunk, embedding: Array1<f32>) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(Error::IndexBuild(format!(
                "chunk {} has embedding of length {}, index expects {}",
                chunk.chunk_index,
                embedding.len(),
                self.dimension
            )));
        }

        self.entries.push(IndexedChunk { chunk, embedding });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `top_k` chunks closest to `query` by cosine similarity, best first.
    /// Ties keep insertion order.
    pub fn search_similar(&self, query: &Array1<f32>, top_k: usize) -> Vec<(f32, &DocumentChunk)> {
        if query.len() != self.dimension {
            return Vec::new();
        }

        let mut similarities: Vec<(f32, &DocumentChunk)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&entry.embedding, query), &entry.chunk))
            .collect();

        similarities.sort_by(|a, b| b.0.total_cmp(&a.0));
        similarities.truncate(top_k);
        similarities
    }
}

fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let dot_product = a.dot(b);
    let norm_a = (a.dot(a)).sqrt();
    let norm_b = (b.dot(b)).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
