//! Embedding provider implementations.

pub mod hashing;
pub mod ollama;
pub mod openai;

pub use hashing::HashingProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use attest_core::AppError;

/// Map a transport failure onto an error kind.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(format!("{} embedding request timed out: {}", provider, err))
    } else {
        AppError::Embedding(format!("Failed to send request to {}: {}", provider, err))
    }
}

/// Map a non-success HTTP status onto an error kind.
///
/// Rate limiting and server errors are transient; other client errors are not.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    let message = format!("{} embedding API error ({}): {}", provider, status, body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AppError::Embedding(message)
    } else {
        AppError::Llm(message)
    }
}

/// Fail unless a returned vector has the configured width.
pub(crate) fn check_dimensions(provider: &str, got: usize, expected: usize) -> Result<(), AppError> {
    if got == expected {
        return Ok(());
    }
    Err(AppError::Config(format!(
        "{} returned {}-dimensional embeddings, expected {}",
        provider, got, expected
    )))
}
