//! Error types for Attest.
//!
//! This module defines a unified error enum that covers every failure the
//! answer pipeline can produce: corpus loading, embedding and generation
//! service calls, configuration, prompts and I/O.

use thiserror::Error;

/// Unified error type for Attest.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single corpus file could not be loaded. Skipped, never fatal on its own.
    #[error("Failed to load '{file}': {cause}")]
    Load { file: String, cause: String },

    /// No document in the corpus directory could be loaded.
    #[error("No documents could be loaded from {0}")]
    EmptyCorpus(String),

    /// The embedding service failed or returned an unusable response.
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// The generation service failed or produced an unusable answer.
    #[error("Generation error: {0}")]
    Generation(String),

    /// An external call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The provider rejected the request outright (unknown model, bad credentials, ...)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Index and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the failure is transient and the call may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Embedding(_) | AppError::Generation(_) | AppError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::Embedding("503".to_string()).is_retryable());
        assert!(AppError::Generation("empty".to_string()).is_retryable());
        assert!(AppError::Timeout("generate".to_string()).is_retryable());

        assert!(!AppError::Llm("model not found".to_string()).is_retryable());
        assert!(!AppError::Config("bad".to_string()).is_retryable());
        assert!(!AppError::EmptyCorpus("/docs".to_string()).is_retryable());
    }

    #[test]
    fn test_load_error_message() {
        let err = AppError::Load {
            file: "policy.pdf".to_string(),
            cause: "invalid xref".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load 'policy.pdf': invalid xref");
    }
}
