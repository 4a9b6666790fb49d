//! Answer synthesis over retrieved passages.
//!
//! Turns a [`Retrieval`](crate::types::Retrieval) into an [`AnswerRecord`]:
//! the no-context sentinel becomes the insufficient-evidence answer, passages
//! go through the configured [`SynthesisStrategy`], and exhausted generation
//! retries become a failure marker.

pub mod grounding;
pub mod strategy;
pub mod synthesizer;
pub mod types;

pub use strategy::{
    create_strategy, format_context, AdaptiveStrategy, Generator, RefineStrategy, StuffStrategy,
    SynthesisStrategy, STRATEGY_NAMES,
};
pub use synthesizer::AnswerSynthesizer;
pub use types::{AnswerRecord, AnswerStatus, Citation, INSUFFICIENT_EVIDENCE_ANSWER};
