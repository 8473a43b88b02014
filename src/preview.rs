use crate::utils::ensure_dir;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io;
use std::path::{Path, PathBuf};

/// HTML page that shows the PDF inline, embedded as a base64 data URI.
pub fn pdf_preview_html(title: &str, file_bytes: &[u8]) -> String {
    let base64_pdf = STANDARD.encode(file_bytes);
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n\
<h3>PDF Preview</h3>\n\
<iframe src=\"data:application/pdf;base64,{base64_pdf}\" width=\"100%\" height=\"100%\" type=\"application/pdf\" style=\"height:100vh;\"></iframe>\n\
</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// Where previews go when no directory is given: the user cache dir.
pub fn default_preview_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("pdf-chat"))
}

/// Writes the preview page for `title` into `dir` and returns its path.
pub fn write_preview(dir: &Path, title: &str, file_bytes: &[u8]) -> io::Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join("preview.html");
    std::fs::write(&path, pdf_preview_html(title, file_bytes))?;
    Ok(path)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
