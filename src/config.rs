use crate::error::{Error, Result};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: "llama3.2:1b".to_string(),
            request_timeout: Duration::from_secs_f64(360.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Feature-hashed bag of words, computed in process.
    Hashed,
    /// Embeddings served by the Ollama `/api/embed` endpoint.
    Ollama,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashed" => Ok(EmbeddingBackend::Hashed),
            "ollama" => Ok(EmbeddingBackend::Ollama),
            other => Err(Error::Config(format!("unknown embedding backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model_name: String,
    /// Model the Ollama backend asks for. Ollama serves its own model names,
    /// so `model_name` does not apply there.
    pub ollama_model: String,
    pub trust_remote_code: bool,
    /// Vector length of the hashed backend.
    pub dimension: usize,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashed,
            model_name: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            ollama_model: "nomic-embed-text".to_string(),
            trust_remote_code: true,
            dimension: 384,
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Extensions (without the dot) the document loader accepts.
    pub required_exts: Vec<String>,
    pub chunk_size: usize,
    /// Parent directory for the scoped upload directory. `None` means the
    /// system temp dir.
    pub temp_root: Option<PathBuf>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            required_exts: vec!["pdf".to_string()],
            chunk_size: 1024,
            temp_root: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LLMConfig,
    pub embedding: EmbeddingConfig,
    pub ingestion: IngestionConfig,
    pub similarity_top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            embedding: EmbeddingConfig::default(),
            ingestion: IngestionConfig::default(),
            similarity_top_k: 2,
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by `OLLAMA_HOST`, `PDF_CHAT_EMBEDDER` and
    /// `PDF_CHAT_EMBED_MODEL` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            let base_url = normalize_base_url(&host);
            config.llm.base_url = base_url.clone();
            config.embedding.base_url = base_url;
        }

        if let Some(backend) = lookup("PDF_CHAT_EMBEDDER") {
            config.embedding.backend = backend.parse()?;
        }

        if let Some(model) = lookup("PDF_CHAT_EMBED_MODEL").filter(|m| !m.trim().is_empty()) {
            config.embedding.ollama_model = model.trim().to_string();
        }

        Ok(config)
    }
}

/// `OLLAMA_HOST` is often given as a bare `host:port`.
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
