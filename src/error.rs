// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable or text-less PDF. Scoped to one document.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Every chunk of a document failed to summarize.
    #[error("Summarization failed: all {attempted} chunks failed (last error: {last_error})")]
    Summarization { attempted: usize, last_error: String },

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Processing cancelled for document {0}")]
    Cancelled(String),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<crate::capability::CapabilityError> for PipelineError {
    fn from(err: crate::capability::CapabilityError) -> Self {
        PipelineError::CapabilityUnavailable(err.to_string())
    }
}
