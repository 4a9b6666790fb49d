//! Deterministic feature-hashing embeddings.
//!
//! Maps word trigrams and whole words into a fixed number of buckets. Not a
//! semantic model, but content-dependent and fully offline, which makes it the
//! default for local runs and tests.

use crate::embeddings::provider::EmbeddingProvider;
use attest_core::AppResult;
use std::collections::{BTreeMap, HashSet};

const STOP_WORDS: [&str; 33] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "does",
];

/// Feature-hashing provider.
#[derive(Debug)]
pub struct HashingProvider {
    model: String,
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl HashingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self::with_model("feature-hash-v1", dimensions)
    }

    pub fn with_model(model: &str, dimensions: usize) -> Self {
        Self {
            model: model.to_string(),
            dimensions: dimensions.max(1),
            stop_words: STOP_WORDS.into_iter().collect(),
        }
    }

    /// Lowercased content words of `text`, split on anything not alphanumeric.
    fn terms<'a>(&self, lower: &'a str) -> Vec<&'a str> {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !self.stop_words.contains(w))
            .collect()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in self.terms(&lower) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = bucket(&trigram, 37, self.dimensions);
                embedding[idx] += (*freq as f32).sqrt();
            }

            embedding[bucket(word, 31, self.dimensions)] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn bucket(token: &str, multiplier: u64, dimensions: usize) -> usize {
    let hash = token
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_identity() {
        let provider = HashingProvider::new(384);
        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.model_name(), "feature-hash-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_unit_length_batch() {
        let provider = HashingProvider::new(384);
        let texts = vec![
            "Encryption at rest uses AES-256".to_string(),
            "Access reviews happen quarterly".to_string(),
            "Política de contraseñas 🔐 aplicada".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = HashingProvider::new(384);
        let a = provider.embed("Backup retention is 30 days").await.unwrap();
        let b = provider.embed("Backup retention is 30 days").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_punctuation_does_not_change_terms() {
        let provider = HashingProvider::new(384);
        let a = provider.embed("backups, nightly.").await.unwrap();
        let b = provider.embed("Backups nightly").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_text_scores_higher() {
        let provider = HashingProvider::new(384);
        let query = provider.embed("How long are backups retained?").await.unwrap();
        let related = provider.embed("Backup retention is 30 days.").await.unwrap();
        let unrelated = provider.embed("Visitors sign in at reception.").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_stop_words_only_is_zero_vector() {
        let provider = HashingProvider::new(384);
        let embedding = provider.embed("it is at the").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }
}
