//! Index command handler.

use super::pipeline;
use attest_core::{config::AppConfig, AppResult};
use clap::Args;
use std::path::PathBuf;

/// Build (or refresh) the passage index for a corpus
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Directory of PDF, text and markdown documents
    #[arg(long)]
    pub corpus: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command for {:?}", self.corpus);

        let pipeline = pipeline::pipeline_config(config, None)?;
        let provider = pipeline::embedding_provider(config)?;
        let progress = pipeline::progress_reporter(self.json);
        let outcome =
            pipeline::index_corpus(config, &pipeline, &self.corpus, provider.as_ref(), &progress)
                .await?;
        let stats = &outcome.stats;

        if self.json {
            let skipped: Vec<_> = outcome
                .skipped
                .iter()
                .map(|s| serde_json::json!({ "file": s.file, "cause": s.cause }))
                .collect();
            let output = serde_json::json!({
                "index": config.index_path(),
                "model": outcome.index.identity().to_string(),
                "stats": stats,
                "skipped": skipped,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} passages from {} documents ({} pages) in {:.2}s",
                stats.passages_count, stats.documents_count, stats.pages_count, stats.duration_secs
            );
            println!("  Model: {}", outcome.index.identity());
            println!("  Snapshot: {}", config.index_path().display());
            if stats.reused_snapshot {
                println!("  Reused the existing snapshot; nothing changed since the last build");
            }
            for skipped in &outcome.skipped {
                println!("  Skipped {}: {}", skipped.file, skipped.cause);
            }
        }

        Ok(())
    }
}
