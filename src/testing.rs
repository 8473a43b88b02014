//! Test doubles for the embedding and language-model seams.

use crate::embedding::{Embedder, HashedEmbedder};
use crate::error::{Error, Result};
use crate::ingestion::DocumentChunk;
use crate::llm::{LanguageModel, TokenStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ndarray::Array1;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub fn hashed_embedder() -> Arc<dyn Embedder> {
    Arc::new(HashedEmbedder::new("test-hashed", 384).unwrap())
}

pub fn chunks_from(file_name: &str, texts: &[&str]) -> Vec<DocumentChunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| DocumentChunk {
            id: format!("{file_name}-{i}"),
            file_name: file_name.to_string(),
            text: text.to_string(),
            chunk_index: i,
        })
        .collect()
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Array1<f32>>> {
        Err(Error::Embedding("embedding server unavailable".to_string()))
    }
}

/// Replays a fixed list of fragments for every prompt, optionally failing
/// after them. Records the prompts it receives.
pub struct ScriptedModel {
    fragments: Vec<String>,
    fail_after: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_after: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(fragments: &[&str]) -> Self {
        Self {
            fail_after: true,
            ..Self::new(fragments)
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn stream_completion(&self, prompt: String) -> Result<TokenStream> {
        self.prompts.lock().unwrap().push(prompt);

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if self.fail_after {
            items.push(Err(Error::Generation("connection reset by model".to_string())));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// A request as the mock server received it.
pub struct RecordedRequest {
    pub path: String,
    pub body: serde_json::Value,
}

/// Answers exactly one HTTP request on a local port with `status` (e.g.
/// `"200 OK"`) and `body`. Returns the base URL to point a client at and a
/// handle resolving to the request that was received.
pub async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed the connection before sending headers");
            received.extend_from_slice(&buf[..n]);
            if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&received[..header_end]).to_string();
        let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);

        while received.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed the connection mid-body");
            received.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        RecordedRequest {
            path,
            body: serde_json::from_slice(&received[header_end..header_end + content_length]).unwrap(),
        }
    });

    (base_url, handle)
}

/// Builds a single-page PDF showing `text` in Helvetica, with a correct
/// cross-reference table.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 24 Tf 72 712 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    pdf
}
