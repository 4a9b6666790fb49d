//! Retrieval-augmented answering over a corpus of security documents.
//!
//! Build time: [`loader`] → [`chunker`] → [`index`] (optionally persisted by
//! [`snapshot`]). Query time: [`retriever`] → [`rag`] synthesis.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod snapshot;
pub mod types;

pub use chunker::Chunker;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider, ModelIdentity};
pub use index::{BuildOptions, EmbeddingIndex};
pub use loader::{LoadedCorpus, SkippedFile};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{AnswerRecord, AnswerStatus, AnswerSynthesizer, Citation};
pub use retriever::Retriever;
pub use types::{LearnStats, Passage, Retrieval, ScoredPassage};

use attest_core::{AppResult, PipelineConfig};
use std::path::Path;
use std::time::Instant;

/// A built index plus how it was obtained.
#[derive(Debug)]
pub struct LearnOutcome {
    pub index: EmbeddingIndex,
    pub stats: LearnStats,
    pub skipped: Vec<SkippedFile>,
}

/// Load `corpus`, chunk it and embed the passages.
///
/// With `snapshot_path`, an existing snapshot built from the same corpus,
/// chunking and embedding model is reused instead of re-embedding, and a
/// freshly built index is saved there.
///
/// # Errors
/// `AppError::EmptyCorpus` if no document loads, or an embedding error if no
/// batch could be embedded.
pub async fn learn(
    corpus: &Path,
    config: &PipelineConfig,
    provider: &dyn EmbeddingProvider,
    snapshot_path: Option<&Path>,
    progress: &ProgressReporter,
) -> AppResult<LearnOutcome> {
    let start = Instant::now();
    tracing::info!("Indexing corpus {:?}", corpus);

    let loaded = loader::load_directory_with_progress(corpus, progress)?;
    let chunker = Chunker::new(config.chunking.size, config.chunking.overlap)?;
    let passages = chunker.split_all(loaded.pages());
    progress.chunk(loaded.page_count() as u64, passages.len());

    let fingerprint = loaded.fingerprint();
    let identity = ModelIdentity::of(provider);

    let reused = match snapshot_path {
        Some(path) => try_reuse(path, &identity, &fingerprint, &chunker),
        None => None,
    };

    let (index, reused_snapshot) = match reused {
        Some(index) => (index, true),
        None => {
            let expected = passages.len();
            let index = EmbeddingIndex::build(
                passages,
                provider,
                &BuildOptions::from_config(config),
                progress,
            )
            .await?;
            if let Some(path) = snapshot_path {
                // A partial index must not be reused as if the corpus were fully embedded
                if index.len() == expected {
                    snapshot::save(path, &index, &fingerprint, chunker.size(), chunker.overlap())?;
                } else {
                    tracing::warn!(
                        "Not saving snapshot {:?}: only {} of {} passages were embedded",
                        path,
                        index.len(),
                        expected
                    );
                }
            }
            (index, false)
        }
    };

    let stats = LearnStats {
        documents_count: loaded.documents.len() as u32,
        skipped_count: loaded.skipped.len() as u32,
        pages_count: loaded.page_count() as u32,
        passages_count: index.len() as u32,
        reused_snapshot,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Indexed {} passages from {} documents in {:.2}s (snapshot reused: {})",
        stats.passages_count,
        stats.documents_count,
        stats.duration_secs,
        stats.reused_snapshot
    );

    Ok(LearnOutcome {
        index,
        stats,
        skipped: loaded.skipped,
    })
}

/// Load the snapshot at `path` if it was built from the same inputs.
fn try_reuse(
    path: &Path,
    identity: &ModelIdentity,
    fingerprint: &str,
    chunker: &Chunker,
) -> Option<EmbeddingIndex> {
    let meta = match snapshot::read_meta(path) {
        Ok(Some(meta)) => meta,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot {:?}: {}", path, e);
            return None;
        }
    };

    if !meta.is_reusable_for(identity, fingerprint, chunker.size(), chunker.overlap()) {
        tracing::info!("Snapshot {:?} is stale, rebuilding", path);
        return None;
    }

    match snapshot::load(path) {
        Ok((_, index)) => {
            tracing::info!("Reusing snapshot {:?} from {}", path, meta.created_at);
            Some(index)
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot {:?}: {}", path, e);
            None
        }
    }
}
