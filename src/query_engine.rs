use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::ingestion::DocumentChunk;
use crate::llm::{LanguageModel, TokenStream};
use crate::prompt::PromptTemplate;
use crate::retriever::Retriever;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A document's vector index bound to a language model and a prompt
/// template. Immutable once built.
pub struct QueryEngine {
    source: String,
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl QueryEngine {
    /// Embeds and indexes `chunks`. This is the expensive step; the session
    /// cache makes sure it runs once per file.
    pub async fn build(
        source: &str,
        chunks: Vec<DocumentChunk>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
        template: PromptTemplate,
        similarity_top_k: usize,
    ) -> Result<Self> {
        info!(
            source,
            chunks = chunks.len(),
            embed_model = embedder.model_name(),
            llm = llm.model_name(),
            "building query engine"
        );
        let retriever = Retriever::from_chunks(chunks, embedder, similarity_top_k).await?;

        Ok(QueryEngine {
            source: source.to_string(),
            retriever,
            llm,
            template,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn chunk_count(&self) -> usize {
        self.retriever.len()
    }

    /// Text of the chunks most relevant to `query_str`, separated by blank
    /// lines.
    pub async fn retrieve_context(&self, query_str: &str) -> Result<String> {
        let context = self
            .retriever
            .retrieve(query_str)
            .await
            .map_err(|e| Error::Generation(format!("retrieval failed: {e}")))?;
        debug!(source = %self.source, retrieved = context.len(), "retrieved context");
        Ok(context.join("\n\n"))
    }

    /// Streams the model's answer to `query_str` given already retrieved
    /// `context`.
    pub async fn answer(&self, query_str: &str, context: &str) -> Result<TokenStream> {
        self.llm
            .stream_completion(self.template.format(context, query_str))
            .await
    }
}

impl fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("source", &self.source)
            .field("chunks", &self.retriever.len())
            .field("llm", &self.llm.model_name())
            .finish()
    }
}
