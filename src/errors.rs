//! Error types for climaterag
//!
//! A single error enum covers every remote collaborator (embedding
//! provider, vector store, reranker, chat model) plus local I/O.

use thiserror::Error;

/// Main error type for the retrieval pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// A remote service call failed (network, auth, quota, bad response)
    #[error("{service} error: {message}")]
    RemoteService { service: String, message: String },

    /// A remote call did not answer within its budget
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// A collaborator the operation needs was not configured
    #[error("No {0} configured for this retriever")]
    MissingCollaborator(&'static str),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// PDF parsing errors
    #[error("PDF error: {0}")]
    PdfError(String),

    /// Local model loading or inference errors
    #[error("Model error: {0}")]
    ModelError(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl RagError {
    /// Shorthand for a failed remote call
    pub fn remote(service: impl Into<String>, message: impl ToString) -> Self {
        RagError::RemoteService {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        RagError::remote("Qdrant", err)
    }
}

impl From<candle_core::Error> for RagError {
    fn from(err: candle_core::Error) -> Self {
        RagError::ModelError(err.to_string())
    }
}
