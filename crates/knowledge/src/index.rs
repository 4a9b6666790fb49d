//! In-memory embedding index with cosine similarity search.
//!
//! The index is write-once: [`EmbeddingIndex::build`] embeds every passage,
//! after which the index is only read. Every vector shares the dimension of
//! the model recorded in the index identity.

use crate::embeddings::{EmbeddingProvider, ModelIdentity};
use crate::progress::ProgressReporter;
use crate::types::{Passage, ScoredPassage};
use attest_core::{AppError, AppResult, PipelineConfig, RetryPolicy};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;

/// A passage and its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

/// Options for building an index.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Passages per embedding request
    pub batch_size: usize,

    /// Batches in flight at once
    pub concurrency: usize,

    pub retry: RetryPolicy,
}

impl BuildOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.embedding.batch_size.max(1),
            concurrency: config.embedding.concurrency.max(1),
            retry: config.embedding_retry(),
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Nearest-neighbour index over passage embeddings.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    identity: ModelIdentity,
    entries: Vec<IndexEntry>,
}

impl EmbeddingIndex {
    /// Assemble an index from precomputed entries.
    ///
    /// # Errors
    /// `AppError::Knowledge` if any vector's length differs from the identity's dimension.
    pub fn from_entries(identity: ModelIdentity, entries: Vec<IndexEntry>) -> AppResult<Self> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.vector.len() != identity.dimensions)
        {
            return Err(AppError::Knowledge(format!(
                "Passage {} has a {}-dimensional vector, index expects {}",
                bad.passage.id,
                bad.vector.len(),
                identity.dimensions
            )));
        }
        Ok(Self { identity, entries })
    }

    /// Embed `passages` and build the index.
    ///
    /// Batches run concurrently up to `options.concurrency`, each under the
    /// retry policy. A batch that still fails is logged and left out of the
    /// index; the build fails only if no batch succeeds.
    pub async fn build(
        passages: Vec<Passage>,
        provider: &dyn EmbeddingProvider,
        options: &BuildOptions,
        progress: &ProgressReporter,
    ) -> AppResult<Self> {
        if passages.is_empty() {
            return Err(AppError::Knowledge("No passages to index".to_string()));
        }

        let identity = ModelIdentity::of(provider);
        let total = passages.len() as u64;
        let batch_size = options.batch_size.max(1);
        let batches: Vec<Vec<Passage>> = passages
            .chunks(batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();

        tracing::info!(
            "Embedding {} passages in {} batches with {}",
            total,
            batch_count,
            identity
        );

        let retry = &options.retry;
        let results: Vec<(Vec<Passage>, AppResult<Vec<Vec<f32>>>)> =
            stream::iter(batches.into_iter().enumerate().map(|(i, batch)| async move {
                let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
                let label = format!("embed batch {}/{}", i + 1, batch_count);
                let result = retry.run(&label, || provider.embed_batch(&texts)).await;
                (batch, result)
            }))
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

        let mut entries = Vec::with_capacity(total as usize);
        let mut failed = 0usize;
        let mut first_error = None;

        for (batch, result) in results {
            match result {
                Ok(vectors) if vectors.len() == batch.len() => {
                    entries.extend(
                        batch
                            .into_iter()
                            .zip(vectors)
                            .map(|(passage, vector)| IndexEntry { passage, vector }),
                    );
                }
                Ok(vectors) => {
                    failed += 1;
                    let err = AppError::Embedding(format!(
                        "Provider returned {} vectors for {} passages",
                        vectors.len(),
                        batch.len()
                    ));
                    tracing::error!("Skipping batch starting at {}: {}", batch[0].id, err);
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    failed += 1;
                    tracing::error!("Skipping batch starting at {}: {}", batch[0].id, err);
                    first_error.get_or_insert(err);
                }
            }
            progress.embed(entries.len() as u64, Some(total), &identity.model);
        }

        if entries.is_empty() {
            return Err(first_error
                .unwrap_or_else(|| AppError::Embedding("No passages were embedded".to_string())));
        }

        if failed > 0 {
            tracing::warn!(
                "{} of {} embedding batches failed; index holds {} of {} passages",
                failed,
                batch_count,
                entries.len(),
                total
            );
        }

        Self::from_entries(identity, entries)
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the documents with at least one indexed passage.
    pub fn documents(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .map(|e| e.passage.document.as_str())
            .collect()
    }

    /// Embed `text` with `provider` and return the `k` most similar passages.
    ///
    /// # Errors
    /// `AppError::Knowledge` if the provider's identity differs from the one
    /// the index was built with.
    pub async fn query(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        k: usize,
        retry: &RetryPolicy,
    ) -> AppResult<Vec<ScoredPassage>> {
        self.identity.ensure_matches(&ModelIdentity::of(provider))?;

        let vector = retry.run("embed query", || provider.embed(text)).await?;
        if vector.len() != self.identity.dimensions {
            return Err(AppError::Embedding(format!(
                "Query vector has {} dimensions, index expects {}",
                vector.len(),
                self.identity.dimensions
            )));
        }

        Ok(self.search(&vector, k))
    }

    /// Top `k` passages by cosine similarity, descending. Ties keep index order.
    pub fn search(&self, vector: &[f32], k: usize) -> Vec<ScoredPassage> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        tracing::debug!("Retrieved {} passages (requested top-{})", scored.len(), k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredPassage {
                passage: self.entries[i].passage.clone(),
                score,
            })
            .collect()
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::HashingProvider;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_options(batch_size: usize) -> BuildOptions {
        BuildOptions {
            batch_size,
            concurrency: 2,
            retry: RetryPolicy::new(
                3,
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_secs(5),
            ),
        }
    }

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("policy.pdf", 1, 0, "Backups run nightly to region A".to_string()),
            Passage::new("policy.pdf", 2, 0, "Backup retention is 30 days.".to_string()),
            Passage::new("access.txt", 1, 0, "Access reviews happen quarterly.".to_string()),
            Passage::new("access.txt", 1, 30, "MFA is required for administrators.".to_string()),
            Passage::new("crypto.md", 1, 0, "TLS 1.2 or higher protects data in transit.".to_string()),
        ]
    }

    /// Fails the first `failures` calls with a transient error.
    #[derive(Debug)]
    struct FlakyProvider {
        inner: HashingProvider,
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn provider_name(&self) -> &str {
            self.inner.provider_name()
        }
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(AppError::Embedding("503 Service Unavailable".to_string()));
            }
            self.inner.embed_batch(texts).await
        }
    }

    /// Always fails for batches containing "poison".
    #[derive(Debug)]
    struct PoisonProvider(HashingProvider);

    #[async_trait::async_trait]
    impl EmbeddingProvider for PoisonProvider {
        fn provider_name(&self) -> &str {
            self.0.provider_name()
        }
        fn model_name(&self) -> &str {
            self.0.model_name()
        }
        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("poison")) {
                return Err(AppError::Embedding("payload rejected".to_string()));
            }
            self.0.embed_batch(texts).await
        }
    }

    #[tokio::test]
    async fn test_build_indexes_every_passage() {
        let provider = HashingProvider::new(384);
        let index = EmbeddingIndex::build(
            passages(),
            &provider,
            &fast_options(2),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        assert_eq!(index.len(), 5);
        assert_eq!(index.identity().dimensions, 384);
        assert!(index.entries().iter().all(|e| e.vector.len() == 384));
        // Batches keep passage order
        let ids: Vec<_> = index.entries().iter().map(|e| e.passage.id.clone()).collect();
        let expected: Vec<_> = passages().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(
            index.documents().into_iter().collect::<Vec<_>>(),
            vec!["access.txt", "crypto.md", "policy.pdf"]
        );
    }

    #[tokio::test]
    async fn test_build_retries_transient_failures() {
        let provider = FlakyProvider {
            inner: HashingProvider::new(384),
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let index = EmbeddingIndex::build(
            passages(),
            &provider,
            &fast_options(10),
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        assert_eq!(index.len(), 5);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_is_isolated() {
        let mut input = passages();
        input.push(Passage::new("bad.txt", 1, 0, "poison".to_string()));
        let provider = PoisonProvider(HashingProvider::new(384));

        let index = EmbeddingIndex::build(input, &provider, &fast_options(1), &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(index.len(), 5);
        assert!(!index.documents().contains("bad.txt"));
    }

    #[tokio::test]
    async fn test_build_fails_when_every_batch_fails() {
        let input = vec![Passage::new("bad.txt", 1, 0, "poison".to_string())];
        let provider = PoisonProvider(HashingProvider::new(384));

        let result =
            EmbeddingIndex::build(input, &provider, &fast_options(1), &ProgressReporter::noop()).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_query_is_deterministic_and_ranked() {
        let provider = HashingProvider::new(384);
        let options = fast_options(2);
        let index =
            EmbeddingIndex::build(passages(), &provider, &options, &ProgressReporter::noop())
                .await
                .unwrap();

        let first = index
            .query(&provider, "How long is backup retention?", 3, &options.retry)
            .await
            .unwrap();
        let second = index
            .query(&provider, "How long is backup retention?", 3, &options.retry)
            .await
            .unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first[0].passage.id, "policy.pdf#p2@0");
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
        let ids = |r: &[ScoredPassage]| r.iter().map(|s| s.passage.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_query_rejects_other_model() {
        let provider = HashingProvider::new(384);
        let options = fast_options(8);
        let index =
            EmbeddingIndex::build(passages(), &provider, &options, &ProgressReporter::noop())
                .await
                .unwrap();

        let other = HashingProvider::with_model("feature-hash-v2", 384);
        let result = index.query(&other, "backups", 3, &options.retry).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_from_entries_checks_dimensions() {
        let identity = ModelIdentity {
            provider: "hashing".to_string(),
            model: "feature-hash-v1".to_string(),
            dimensions: 3,
        };
        let entries = vec![IndexEntry {
            passage: Passage::new("a.txt", 1, 0, "x".to_string()),
            vector: vec![1.0, 0.0],
        }];
        assert!(EmbeddingIndex::from_entries(identity, entries).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![1.0, 0.0, 0.0];
        let d = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&c, &d) - 0.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
