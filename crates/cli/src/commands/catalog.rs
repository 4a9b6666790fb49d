//! Catalog command handler.

use attest_core::AppResult;
use attest_questionnaire::Catalog;
use clap::Args;
use std::path::PathBuf;

/// List questionnaire sections and questions
#[derive(Args, Debug)]
pub struct CatalogCommand {
    /// Custom catalog YAML (default: built-in catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CatalogCommand {
    pub fn execute(&self) -> AppResult<()> {
        let catalog = Catalog::resolve(self.catalog.as_deref())?;

        if self.json {
            let sections: Vec<_> = catalog
                .sections()
                .iter()
                .map(|section| {
                    serde_json::json!({
                        "id": section.id,
                        "title": section.display_title(),
                        "questions": section.questions.iter().map(|q| {
                            serde_json::json!({ "id": q.id, "text": q.text })
                        }).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&sections)?);
            return Ok(());
        }

        for section in catalog.sections() {
            println!("{} ({})", section.display_title(), section.id);
            for question in &section.questions {
                println!("  {}: {}", question.id, question.text);
            }
            println!();
        }
        println!(
            "{} questions in {} sections",
            catalog.len(),
            catalog.sections().len()
        );

        Ok(())
    }
}
