use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::ingestion::DocumentChunk;
use crate::vector_db::VectorDB;
use std::sync::Arc;
use tracing::debug;

pub struct Retriever {
    vector_db: VectorDB,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Embeds every chunk and indexes it. Any failure aborts the whole build.
    pub async fn from_chunks(
        chunks: Vec<DocumentChunk>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::IndexBuild("no chunks to index".to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder
            .embed(&texts)
            .await
            .map_err(|e| Error::IndexBuild(e.to_string()))?;

        if embeddings.len() != chunks.len() {
            return Err(Error::IndexBuild(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimension = embeddings[0].len();
        let mut vector_db = VectorDB::new(dimension);
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            vector_db.add_chunk(chunk, embedding)?;
        }
        debug!(chunks = vector_db.len(), dimension, "vector index built");

        Ok(Retriever {
            vector_db,
            embedder,
            top_k,
        })
    }

    pub fn len(&self) -> usize {
        self.vector_db.len()
    }

    /// Text of the chunks most similar to `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        let mut embedded = self.embedder.embed(&[query.to_string()]).await?;
        let query_embedding = embedded
            .pop()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".to_string()))?;

        Ok(self
            .vector_db
            .search_similar(&query_embedding, self.top_k)
            .into_iter()
            .map(|(_, chunk)| chunk.text.clone())
            .collect())
    }
}
