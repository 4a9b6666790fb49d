//! Embedding providers.
//!
//! A provider turns passage and question text into fixed-dimension vectors.
//! The same provider identity must be used to build and to query an index.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider, ModelIdentity};
