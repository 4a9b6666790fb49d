//! Ask command handler.
//!
//! Runs one ad-hoc question through the same pipeline as `run`.

use super::pipeline;
use attest_core::{config::AppConfig, AppResult};
use attest_knowledge::AnswerStatus;
use attest_questionnaire::QualityScores;
use clap::Args;
use std::path::PathBuf;

/// Answer one question from a corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Directory of PDF, text and markdown documents
    #[arg(long)]
    pub corpus: PathBuf,

    /// Synthesis strategy (stuff, refine, auto)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let pipeline = pipeline::pipeline_config(config, self.strategy.as_deref())?;
        let progress = pipeline::progress_reporter(true);
        let orchestrator =
            pipeline::build_orchestrator(config, &pipeline, &self.corpus, &progress).await?;

        let (record, state) = orchestrator.answer("ask", &self.question).await;
        tracing::debug!("Question finished in state {}", state);

        if self.json {
            let output = serde_json::json!({
                "record": record,
                "quality": QualityScores::assess(&record),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        match record.status {
            AnswerStatus::Failed => {
                println!(
                    "Failed: {}",
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
            _ => {
                println!("Answer:");
                println!("{}", record.answer_text);
                println!();
                if record.citations.is_empty() {
                    println!("Sources: (none)");
                } else {
                    println!("Sources:");
                    for citation in &record.citations {
                        println!("- {} (page {})", citation.document_name, citation.page_number);
                    }
                }
            }
        }

        Ok(())
    }
}
