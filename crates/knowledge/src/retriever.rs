//! Retriever: top-K search plus a similarity threshold.

use crate::embeddings::EmbeddingProvider;
use crate::index::EmbeddingIndex;
use crate::types::Retrieval;
use attest_core::{AppResult, PipelineConfig, RetryPolicy};
use std::sync::Arc;

/// Query policy over an embedding index.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    threshold: f32,
    retry: RetryPolicy,
}

impl Retriever {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        top_k: usize,
        threshold: f32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            index,
            provider,
            top_k: top_k.max(1),
            threshold,
            retry,
        }
    }

    /// Retriever configured from `pipeline.retrieval` and `pipeline.retry`.
    pub fn from_config(
        index: Arc<EmbeddingIndex>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            index,
            provider,
            config.retrieval.top_k,
            config.retrieval.similarity_threshold,
            config.embedding_retry(),
        )
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Passages scoring at least the threshold, best first.
    ///
    /// Returns [`Retrieval::NoRelevantContext`] when nothing qualifies.
    #[tracing::instrument(skip(self), fields(top_k = self.top_k, threshold = self.threshold))]
    pub async fn retrieve(&self, question: &str) -> AppResult<Retrieval> {
        let ranked = self
            .index
            .query(self.provider.as_ref(), question, self.top_k, &self.retry)
            .await?;

        let raw = ranked.len();
        let kept: Vec<_> = ranked
            .into_iter()
            .filter(|s| s.score >= self.threshold)
            .collect();

        tracing::debug!("Kept {} of {} passages above threshold", kept.len(), raw);

        Ok(Retrieval::from_ranked(kept))
    }
}
