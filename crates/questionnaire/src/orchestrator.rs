//! Orchestrator: runs every catalog question through retrieval and synthesis.
//!
//! Questions are processed one at a time. A failing question is recorded
//! with a failure marker and the run moves on; the result set always holds
//! exactly one record per catalog question.

use crate::catalog::Catalog;
use crate::results::ResultSet;
use attest_knowledge::{AnswerRecord, AnswerSynthesizer, ProgressReporter, Retriever};
use serde::Serialize;
use std::fmt;
use tracing::Instrument;

/// Lifecycle of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    Pending,
    Retrieving,
    Synthesizing,
    Done,
    Failed,
}

impl QuestionState {
    /// Whether `next` may follow this state.
    pub fn can_transition_to(self, next: QuestionState) -> bool {
        use QuestionState::*;
        matches!(
            (self, next),
            (Pending, Retrieving)
                | (Retrieving, Synthesizing)
                | (Retrieving, Failed)
                | (Synthesizing, Done)
                | (Synthesizing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for QuestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State tracker for one question.
#[derive(Debug)]
struct QuestionRun<'a> {
    question_id: &'a str,
    state: QuestionState,
}

impl<'a> QuestionRun<'a> {
    fn new(question_id: &'a str) -> Self {
        Self {
            question_id,
            state: QuestionState::Pending,
        }
    }

    fn advance(&mut self, next: QuestionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("{}: {} -> {}", self.question_id, self.state, next);
        self.state = next;
    }
}

/// Drives questions through the pipeline.
#[derive(Debug)]
pub struct Orchestrator {
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    progress: ProgressReporter,
}

impl Orchestrator {
    pub fn new(retriever: Retriever, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            retriever,
            synthesizer,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.synthesizer.strategy_name()
    }

    /// Answer one question, returning its record and final state.
    pub async fn answer(&self, question_id: &str, question: &str) -> (AnswerRecord, QuestionState) {
        let mut run = QuestionRun::new(question_id);

        run.advance(QuestionState::Retrieving);
        let retrieval = match self.retriever.retrieve(question).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::error!("Retrieval failed for {}: {}", question_id, e);
                run.advance(QuestionState::Failed);
                return (
                    AnswerRecord::failed(question_id, question, format!("Retrieval failed: {}", e)),
                    run.state,
                );
            }
        };

        run.advance(QuestionState::Synthesizing);
        let record = self
            .synthesizer
            .synthesize(question_id, question, &retrieval)
            .await;

        run.advance(if record.is_failed() {
            QuestionState::Failed
        } else {
            QuestionState::Done
        });

        (record, run.state)
    }

    /// Answer every catalog question in order.
    pub async fn run(&self, catalog: &Catalog) -> ResultSet {
        let total = catalog.len() as u64;
        let mut results = ResultSet::new();
        let mut failed = 0usize;

        tracing::info!(
            "Answering {} questions with the {} strategy",
            total,
            self.strategy_name()
        );

        for (i, item) in catalog.items().enumerate() {
            let span = tracing::info_span!(
                "question",
                section = item.section_id,
                question = item.question_id
            );
            let (record, state) = self
                .answer(item.question_id, item.text)
                .instrument(span)
                .await;
            if state == QuestionState::Failed {
                failed += 1;
                tracing::error!(
                    "Question {}/{} failed: {}",
                    item.section_id,
                    item.question_id,
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }

            let title = catalog
                .section(item.section_id)
                .map(|s| s.display_title())
                .unwrap_or(item.section_id);
            results.push(item.section_id, title, record);
            self.progress.answer(i as u64 + 1, Some(total), item.question_id);
        }

        tracing::info!(
            "Questionnaire run finished: {} questions, {} failed",
            results.len(),
            failed
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use QuestionState::*;
        assert!(Pending.can_transition_to(Retrieving));
        assert!(Retrieving.can_transition_to(Synthesizing));
        assert!(Retrieving.can_transition_to(Failed));
        assert!(Synthesizing.can_transition_to(Done));
        assert!(Synthesizing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Done));
        assert!(!Done.can_transition_to(Retrieving));
        assert!(!Failed.can_transition_to(Synthesizing));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert!(!Synthesizing.is_terminal());
    }
}
