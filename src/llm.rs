use crate::config::LLMConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Lazy, finite, non-restartable sequence of response fragments.
pub type TokenStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Starts a completion for `prompt` and returns its fragments in the
    /// order the model emits them.
    async fn stream_completion(&self, prompt: String) -> Result<TokenStream>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a local Ollama server's `/api/generate` endpoint.
pub struct LLM {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl LLM {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(Error::Config("model name cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        info!(model = %config.model, url = %config.base_url, timeout = ?config.request_timeout, "language model configured");
        Ok(LLM {
            client,
            url: format!("{}/api/generate", config.base_url),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for LLM {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, prompt: String) -> Result<TokenStream> {
        if prompt.trim().is_empty() {
            return Err(Error::Generation("prompt cannot be empty".to_string()));
        }

        debug!(model = %self.model, prompt_len = prompt.len(), "starting generation");
        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &prompt,
                stream: true,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Generation(e.to_string()))?;

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| Error::Generation(e.to_string()))
            })
            .boxed();

        Ok(decode_ndjson(body))
    }
}

/// Reassembles newline-delimited JSON objects from arbitrarily split byte
/// chunks.
#[derive(Default)]
struct LineDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl LineDecoder {
    fn feed(&mut self, bytes: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, out)?;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut VecDeque<String>) -> Result<()> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest, out)?;
        if !self.done {
            return Err(Error::Generation("response ended before the model finished".to_string()));
        }
        Ok(())
    }

    fn decode_line(&mut self, line: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        if line.iter().all(u8::is_ascii_whitespace) || self.done {
            return Ok(());
        }

        let chunk: GenerateChunk = serde_json::from_slice(line)
            .map_err(|e| Error::Generation(format!("malformed stream line: {e}")))?;
        if let Some(error) = chunk.error {
            return Err(Error::Generation(error));
        }
        if !chunk.response.is_empty() {
            out.push_back(chunk.response);
        }
        self.done = chunk.done;
        Ok(())
    }
}

struct DecodeState {
    body: BoxStream<'static, Result<Vec<u8>>>,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    error: Option<Error>,
    finished: bool,
}

/// Turns a streamed `/api/generate` body into response fragments. The first
/// error is yielded after any fragments decoded before it and ends the stream.
fn decode_ndjson(body: BoxStream<'static, Result<Vec<u8>>>) -> TokenStream {
    let state = DecodeState {
        body,
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        error: None,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if let Some(e) = state.error.take() {
                return Some((Err(e), state));
            }
            if state.finished {
                return None;
            }

            let step = match state.body.next().await {
                Some(Ok(bytes)) => state.decoder.feed(&bytes, &mut state.pending),
                Some(Err(e)) => Err(e),
                None => {
                    state.finished = true;
                    state.decoder.finish(&mut state.pending)
                }
            };

            if let Err(e) = step {
                state.error = Some(e);
                state.finished = true;
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;

    fn body(parts: &[&str]) -> BoxStream<'static, Result<Vec<u8>>> {
        let parts: Vec<Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(parts).boxed()
    }

    async fn collect(stream: TokenStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_decodes_fragments_across_split_lines() {
        let fragments = collect(decode_ndjson(body(&[
            "{\"response\":\"The \",\"done\":false}\n{\"resp",
            "onse\":\"answer\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true,\"total_duration\":12}\n",
        ])))
        .await;

        let fragments: Vec<String> = fragments.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec!["The ", "answer"]);
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let fragments = collect(decode_ndjson(body(&[
            "{\"response\":\"ok\",\"done\":false}\n{\"response\":\"\",\"done\":true}",
        ])))
        .await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_truncated_stream_ends_with_error() {
        let fragments = collect(decode_ndjson(body(&["{\"response\":\"par\",\"done\":false}\n"]))).await;
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].as_ref().unwrap(), "par");
        assert!(matches!(fragments[1], Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_server_error_line_ends_stream() {
        let fragments = collect(decode_ndjson(body(&[
            "{\"response\":\"a\",\"done\":false}\n{\"error\":\"model crashed\"}\n{\"response\":\"b\",\"done\":false}\n",
        ])))
        .await;
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].as_ref().unwrap(), "a");
        match &fragments[1] {
            Err(Error::Generation(msg)) => assert_eq!(msg, "model crashed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let parts: Vec<Result<Vec<u8>>> = vec![
            Ok(b"{\"response\":\"x\",\"done\":false}\n".to_vec()),
            Err(Error::Generation("timed out".to_string())),
        ];
        let fragments = collect(decode_ndjson(stream::iter(parts).boxed())).await;
        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].is_err());
    }

    fn config_for(base_url: String) -> LLMConfig {
        LLMConfig {
            base_url,
            ..LLMConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_request_and_streamed_reply() {
        let (base_url, server) = serve_once(
            "200 OK",
            "{\"response\":\"Hi \",\"done\":false}\n{\"response\":\"there\",\"done\":true}\n",
        )
        .await;
        let llm = LLM::new(&config_for(base_url)).unwrap();

        let stream = llm.stream_completion("p".to_string()).await.unwrap();
        let fragments: Vec<String> = collect(stream).await.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(fragments, vec!["Hi ", "there"]);

        let request = server.await.unwrap();
        assert_eq!(request.path, "/api/generate");
        assert_eq!(
            request.body,
            serde_json::json!({"model": "llama3.2:1b", "prompt": "p", "stream": true})
        );
    }

    #[tokio::test]
    async fn test_http_error_status_is_generation_error() {
        let (base_url, server) = serve_once("404 Not Found", "{\"error\":\"model not found\"}").await;
        let llm = LLM::new(&config_for(base_url)).unwrap();

        let result = llm.stream_completion("p".to_string()).await;

        assert!(matches!(result, Err(Error::Generation(_))));
        server.await.unwrap();
    }

    #[test]
    fn test_empty_model_rejected() {
        let config = LLMConfig {
            model: " ".to_string(),
            ..LLMConfig::default()
        };
        assert!(matches!(LLM::new(&config), Err(Error::Config(_))));
    }
}
