//! Run command handler.
//!
//! Answers the whole catalog and writes the result set.

use super::pipeline;
use attest_core::{config::AppConfig, AppResult};
use attest_questionnaire::{Catalog, RunReport};
use clap::Args;
use std::path::PathBuf;

/// Answer every catalog question from a corpus
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Directory of PDF, text and markdown documents
    #[arg(long)]
    pub corpus: PathBuf,

    /// Custom catalog YAML (default: built-in catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Only answer these sections (repeatable)
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Synthesis strategy (stuff, refine, auto)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Write the result set JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the full run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing run command for {:?}", self.corpus);

        let mut catalog = Catalog::resolve(self.catalog.as_deref())?;
        if !self.sections.is_empty() {
            catalog = catalog.only_sections(&self.sections)?;
        }

        let pipeline = pipeline::pipeline_config(config, self.strategy.as_deref())?;
        let progress = pipeline::progress_reporter(self.json);
        let orchestrator =
            pipeline::build_orchestrator(config, &pipeline, &self.corpus, &progress).await?;

        let results = orchestrator.run(&catalog).await;
        let report = RunReport::new(orchestrator.strategy_name(), results);

        if let Some(ref path) = self.output {
            std::fs::write(path, serde_json::to_string_pretty(&report.results)?)?;
            tracing::info!("Wrote results to {:?}", path);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_summary(&report);
        }

        Ok(())
    }
}

fn print_summary(report: &RunReport) {
    let coverage = &report.coverage;

    println!("Run {} ({} strategy)", report.run_id, report.strategy);
    println!(
        "  {} questions: {} answered, {} insufficient evidence, {} failed ({:.0}% answered)",
        coverage.total,
        coverage.answered,
        coverage.insufficient_evidence,
        coverage.failed,
        coverage.answer_rate() * 100.0
    );
    if let Some(quality) = report.mean_quality {
        println!("  Mean answer quality: {:.2}", quality);
    }

    println!();
    println!("Sections:");
    for section in &coverage.sections {
        println!(
            "  {:<40} {:>3}/{:<3} answered",
            section.title, section.answered, section.total
        );
    }

    if !coverage.document_citations.is_empty() {
        println!();
        println!("Most cited documents:");
        let mut documents: Vec<_> = coverage.document_citations.iter().collect();
        documents.sort_by(|a, b| b.1.cmp(a.1));
        for (document, count) in documents.into_iter().take(5) {
            println!("  {} ({})", document, count);
        }
    }

    let priorities = coverage.priority_sections(3);
    if !priorities.is_empty() {
        println!();
        println!("Needs attention:");
        for section in priorities {
            println!(
                "  {} ({:.0}% without an answer)",
                section.title,
                section.missing_ratio() * 100.0
            );
        }
    }
}
