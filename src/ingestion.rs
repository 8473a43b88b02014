//! Upload ingestion: validate, stage in a scoped temp directory, parse, chunk.

use crate::config::IngestionConfig;
use crate::error::{Error, Result};
use crate::utils::{collect_files, split_into_chunks};
use std::path::Path;
use tracing::{debug, info, warn};

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: String,
    pub file_name: String,
    pub text: String,
    pub chunk_index: usize,
}

/// Rejects anything that is not a PDF, judged by both extension and magic bytes.
pub fn ensure_pdf(file_name: &str, file_bytes: &[u8]) -> Result<()> {
    let has_pdf_ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !has_pdf_ext || !file_bytes.starts_with(PDF_SIGNATURE) {
        return Err(Error::UnsupportedFormat(file_name.to_string()));
    }
    Ok(())
}

/// Turns an uploaded PDF into text chunks.
///
/// The bytes are written into a fresh temporary directory which the loader
/// then scans. The directory is owned by a `TempDir` guard, so it is removed
/// however this function exits.
pub fn ingest(file_bytes: &[u8], file_name: &str, config: &IngestionConfig) -> Result<Vec<DocumentChunk>> {
    ensure_pdf(file_name, file_bytes)?;

    let staged_name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| Error::UnsupportedFormat(file_name.to_string()))?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("pdf-chat-");
    let temp_dir = match &config.temp_root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };

    let file_path = temp_dir.path().join(staged_name);
    std::fs::write(&file_path, file_bytes)?;
    debug!(path = %file_path.display(), bytes = file_bytes.len(), "staged upload");

    let texts = load_directory(temp_dir.path(), &config.required_exts, file_name)?;

    let mut chunks = Vec::new();
    for text in texts {
        for piece in split_into_chunks(&text, config.chunk_size) {
            chunks.push(DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                file_name: file_name.to_string(),
                text: piece,
                chunk_index: chunks.len(),
            });
        }
    }

    if chunks.is_empty() {
        return Err(Error::ingestion(file_name, "document contains no extractable text"));
    }

    info!(file = file_name, chunks = chunks.len(), "document ingested");
    Ok(chunks)
}

/// Reads every matching file below `dir` and returns its extracted text.
fn load_directory(dir: &Path, required_exts: &[String], file_name: &str) -> Result<Vec<String>> {
    let files = collect_files(dir, required_exts)?;
    if files.is_empty() {
        return Err(Error::ingestion(file_name, "no files with a supported extension"));
    }

    let mut texts = Vec::with_capacity(files.len());
    for path in &files {
        // pdf-extract panics on some malformed inputs.
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
        match extracted {
            Ok(Ok(text)) => texts.push(text),
            Ok(Err(e)) => return Err(Error::ingestion(file_name, e)),
            Err(_) => {
                warn!(path = %path.display(), "PDF parser panicked");
                return Err(Error::ingestion(file_name, "PDF parser crashed on this document"));
            }
        }
    }

    Ok(texts)
}
