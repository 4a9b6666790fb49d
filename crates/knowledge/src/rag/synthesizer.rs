//! Answer synthesizer.

use crate::rag::grounding::citations_for;
use crate::rag::strategy::{create_strategy, Generator, SynthesisStrategy};
use crate::rag::types::{AnswerRecord, Citation};
use crate::types::Retrieval;
use attest_core::{AppError, AppResult, PipelineConfig};
use attest_llm::LlmClient;
use std::path::Path;
use std::sync::Arc;

/// Produces grounded answers from retrieval results.
#[derive(Debug)]
pub struct AnswerSynthesizer {
    strategy: Box<dyn SynthesisStrategy>,
    generator: Generator,
}

impl AnswerSynthesizer {
    pub fn new(strategy: Box<dyn SynthesisStrategy>, generator: Generator) -> Self {
        Self {
            strategy,
            generator,
        }
    }

    /// Synthesizer for `pipeline.synthesis`, with prompt overrides from `workspace`.
    pub fn from_config(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        config: &PipelineConfig,
        workspace: Option<&Path>,
    ) -> AppResult<Self> {
        let strategy = create_strategy(
            &config.synthesis.strategy,
            workspace,
            config.synthesis.context_budget_chars,
        )?;
        Ok(Self::new(strategy, Generator::from_config(llm, model, config)))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Answer text and citations, or the error that stopped generation.
    ///
    /// # Errors
    /// `AppError::Generation` if called with the no-context sentinel.
    pub async fn try_synthesize(
        &self,
        question: &str,
        retrieval: &Retrieval,
    ) -> AppResult<(String, Vec<Citation>)> {
        let passages = match retrieval {
            Retrieval::Found(passages) if !passages.is_empty() => passages,
            _ => {
                return Err(AppError::Generation(
                    "No passages to synthesize from".to_string(),
                ))
            }
        };

        let answer = self
            .strategy
            .synthesize(&self.generator, question, passages)
            .await?;

        Ok((answer, citations_for(passages)))
    }

    /// Always returns a record: an answer, the insufficient-evidence
    /// sentinel, or a failure marker.
    #[tracing::instrument(skip(self, question, retrieval), fields(strategy = self.strategy.name()))]
    pub async fn synthesize(
        &self,
        question_id: &str,
        question: &str,
        retrieval: &Retrieval,
    ) -> AnswerRecord {
        if retrieval.is_empty() {
            tracing::info!("No relevant context for {}; insufficient evidence", question_id);
            return AnswerRecord::insufficient_evidence(question_id, question);
        }

        match self.try_synthesize(question, retrieval).await {
            Ok((answer, citations)) => {
                AnswerRecord::answered(question_id, question, answer, citations)
            }
            Err(e) => {
                tracing::error!("Synthesis failed for {}: {}", question_id, e);
                AnswerRecord::failed(question_id, question, e.to_string())
            }
        }
    }
}
