use crate::chat;
use crate::config::AppConfig;
use crate::embedding::{self, Embedder};
use crate::error::{Error, Result};
use crate::ingestion::{self, DocumentChunk};
use crate::llm::{LLM, LanguageModel};
use crate::prompt::PromptTemplate;
use crate::query_engine::QueryEngine;
use crate::session::Session;
use std::sync::Arc;
use tracing::info;

/// Handlers for the three interactions a user has: upload, ask, reset.
/// Holds the shared collaborators; all per-user state lives in the
/// `Session` passed to each handler.
pub struct ChatApp {
    config: AppConfig,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl ChatApp {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let embedder = embedding::from_config(&config.embedding)?;
        let llm: Arc<dyn LanguageModel> = Arc::new(LLM::new(&config.llm)?);
        Ok(Self::new(config, embedder, llm))
    }

    pub fn new(config: AppConfig, embedder: Arc<dyn Embedder>, llm: Arc<dyn LanguageModel>) -> Self {
        ChatApp {
            config,
            embedder,
            llm,
            template: PromptTemplate::qa(),
        }
    }

    /// Prepares a query engine for an uploaded PDF and makes it the active
    /// document. Ingestion and indexing only run the first time a file name
    /// is seen in this session. On error the session is left untouched.
    pub async fn upload(&self, session: &mut Session, file_name: &str, file_bytes: &[u8]) -> Result<Arc<QueryEngine>> {
        ingestion::ensure_pdf(file_name, file_bytes)?;

        let key = session.cache_key(file_name);
        let engine = session
            .get_or_build(key.clone(), || async move {
                let chunks = self.ingest_blocking(file_name, file_bytes).await?;
                QueryEngine::build(
                    file_name,
                    chunks,
                    Arc::clone(&self.embedder),
                    Arc::clone(&self.llm),
                    self.template.clone(),
                    self.config.similarity_top_k,
                )
                .await
            })
            .await?;

        session.activate(&key);
        info!(%key, chunks = engine.chunk_count(), "ready to chat");
        Ok(engine)
    }

    /// Asks the active document a question, streaming fragments to
    /// `on_fragment`.
    pub async fn ask<F>(&self, session: &mut Session, prompt: &str, on_fragment: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let engine = session.active_engine().ok_or(Error::NoDocument)?;
        chat::ask(session, &engine, prompt, on_fragment).await
    }

    pub fn reset(&self, session: &mut Session) {
        session.reset();
    }

    // PDF parsing is CPU-bound; keep it off the async workers.
    async fn ingest_blocking(&self, file_name: &str, file_bytes: &[u8]) -> Result<Vec<DocumentChunk>> {
        let name = file_name.to_string();
        let bytes = file_bytes.to_vec();
        let config = self.config.ingestion.clone();

        tokio::task::spawn_blocking(move || ingestion::ingest(&bytes, &name, &config))
            .await
            .map_err(|e| Error::Unhandled(format!("ingestion task failed: {e}")))?
    }
}
