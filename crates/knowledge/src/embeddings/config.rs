//! Embedding configuration resolved from the application config.

use attest_core::AppConfig;
use serde::{Deserialize, Serialize};

/// Fully resolved settings for one embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "hashing", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Service base URL; provider default when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(skip)]
    pub api_key: Option<String>,

    /// HTTP timeout per request
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "feature-hash-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Model and dimension used when the config names neither.
fn provider_defaults(provider: &str) -> (&'static str, usize) {
    match provider {
        "ollama" => ("nomic-embed-text", 768),
        "openai" => ("text-embedding-3-small", 1536),
        _ => ("feature-hash-v1", 384),
    }
}

impl EmbeddingConfig {
    /// Resolve from `pipeline.embedding` plus the matching `llm.providers` entry.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let settings = &config.pipeline.embedding;
        let provider = settings.provider.clone();
        let (default_model, default_dims) = provider_defaults(&provider);

        let model = settings
            .model
            .clone()
            .or_else(|| {
                config
                    .get_provider_config(&provider)
                    .and_then(|pc| pc.embedding_model())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| default_model.to_string());

        let api_key = if provider == "openai" {
            config.resolve_api_key(&provider)
        } else {
            None
        };

        Self {
            endpoint: config.resolve_endpoint(&provider),
            dimensions: settings.dimensions.unwrap_or(default_dims),
            provider,
            model,
            api_key,
            timeout_secs: settings.timeout_secs,
        }
    }
}
