//! Error types for PolicyLens
//!
//! One enum covers ingestion, retrieval and configuration failures so that
//! callers can tell a service failure apart from an empty result.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the policy decision pipeline
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Source document could not be read; ingestion skips it
    #[error("Failed to extract text from {path:?}: {reason}")]
    ExtractionFailure { path: PathBuf, reason: String },

    /// Embedding model unavailable or rejected the input
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    /// Corpus store could not be reached or rejected a write
    #[error("Corpus store unavailable: {0}")]
    StoreUnavailable(String),

    /// Query-time retrieval failed (distinct from an empty result set)
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// External call exceeded its deadline
    #[error("{stage} timed out after {duration_ms}ms")]
    Timeout { stage: String, duration_ms: u64 },

    /// Invalid configuration, detected before any document is processed
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Tokenizer could not be loaded or failed to encode text
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    /// Store write failed part way through a corpus rebuild
    #[error(
        "Partial ingestion: {committed} of {expected} chunks committed before batch {failed_batch} failed: {reason}"
    )]
    PartialIngestion {
        committed: usize,
        expected: usize,
        failed_batch: usize,
        reason: String,
    },

    /// Nothing survived extraction, chunking and embedding
    #[error("Nothing to ingest: {0}")]
    NothingToIngest(String),

    /// Free-text answerer failed; never affects the decision
    #[error("Answerer unavailable: {0}")]
    AnswerUnavailable(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PolicyError>;

impl PolicyError {
    /// True for failures of an external service at query time
    pub fn is_retrieval_failure(&self) -> bool {
        matches!(
            self,
            PolicyError::RetrievalUnavailable(_) | PolicyError::Timeout { .. }
        )
    }
}

/// Convert anyhow errors raised by model-loading internals
impl From<anyhow::Error> for PolicyError {
    fn from(err: anyhow::Error) -> Self {
        PolicyError::EmbeddingFailure(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ingestion_display() {
        let err = PolicyError::PartialIngestion {
            committed: 1000,
            expected: 2500,
            failed_batch: 2,
            reason: "connection reset".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("2500"));
        assert!(msg.contains("batch 2"));
    }

    #[test]
    fn test_retrieval_failure_classification() {
        assert!(PolicyError::RetrievalUnavailable("down".into()).is_retrieval_failure());
        assert!(PolicyError::Timeout {
            stage: "query embedding".into(),
            duration_ms: 50
        }
        .is_retrieval_failure());
        assert!(!PolicyError::StoreUnavailable("down".into()).is_retrieval_failure());
    }

    #[test]
    fn test_timeout_display() {
        let err = PolicyError::Timeout {
            stage: "corpus query".to_string(),
            duration_ms: 30000,
        };
        assert_eq!(err.to_string(), "corpus query timed out after 30000ms");
    }
}
