use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use ndarray::Array1;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Array1<f32>>>;
}

pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let model = match config.backend {
        EmbeddingBackend::Hashed => &config.model_name,
        EmbeddingBackend::Ollama => &config.ollama_model,
    };
    info!(
        model = %model,
        backend = ?config.backend,
        trust_remote_code = config.trust_remote_code,
        "configuring embedding model"
    );

    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Hashed => Arc::new(HashedEmbedder::new(&config.model_name, config.dimension)?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(config)?),
    };
    Ok(embedder)
}

lazy_static! {
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec![
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
            "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
            "to", "was", "were", "will", "with"
        ];
        words.into_iter().collect()
    };
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("valid punctuation pattern");
}

pub fn tokenize(text: &str) -> Vec<String> {
    // Normalize text
    let text = text.nfc().collect::<String>().to_lowercase();

    // Remove special characters and split into tokens
    let text = NON_WORD.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|&token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

/// Bag-of-words vectors with the hashing trick: every token lands in one of
/// `dimension` buckets with a hash-derived sign, then the vector is
/// L2-normalized. Needs no model download.
pub struct HashedEmbedder {
    model_name: String,
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(model_name: &str, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("embedding dimension must be positive".to_string()));
        }
        Ok(Self {
            model_name: model_name.to_string(),
            dimension,
        })
    }

    fn embed_one(&self, text: &str) -> Array1<f32> {
        let mut term_freq: FxHashMap<String, f32> = FxHashMap::default();
        for token in tokenize(text) {
            *term_freq.entry(token).or_insert(0.0) += 1.0;
        }

        let mut vector = Array1::<f32>::zeros(self.dimension);
        for (term, freq) in term_freq {
            let mut hasher = FxHasher::default();
            term.hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * (1.0 + freq.ln());
        }

        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector /= norm;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Array1<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model_name: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/api/embed", config.base_url),
            model_name: config.ollama_model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Array1<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), model = %self.model_name, "requesting embeddings");
        let response = self
            .client
            .post(&self.url)
            .json(&EmbedRequest {
                model: &self.model_name,
                input: texts,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("malformed embedding response: {e}")))?;

        if body.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings.into_iter().map(Array1::from).collect())
    }
}
