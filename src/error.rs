pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while handling one interaction.
///
/// None of these are fatal to the process; each one is scoped to the
/// upload, question or command that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported format: {0} is not a PDF document")]
    UnsupportedFormat(String),

    #[error("failed to ingest {file}: {reason}")]
    Ingestion { file: String, reason: String },

    #[error("failed to build index: {0}")]
    IndexBuild(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("no document loaded, upload a PDF first")]
    NoDocument,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unhandled(String),
}

impl Error {
    pub(crate) fn ingestion(file: &str, reason: impl ToString) -> Self {
        Error::Ingestion {
            file: file.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedFormat("notes.txt".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported format: notes.txt is not a PDF document"
        );

        let err = Error::ingestion("doc.pdf", "no text");
        assert_eq!(err.to_string(), "failed to ingest doc.pdf: no text");

        let err = Error::Generation("connection reset".to_string());
        assert_eq!(err.to_string(), "generation failed: connection reset");

        let err = Error::Unhandled("boom".to_string());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
