//! Questionnaire catalog and batch answering.
//!
//! The [`Orchestrator`] walks a [`Catalog`] question by question, retrieving
//! evidence and synthesizing an answer for each. A failing question is
//! recorded with a failure marker and never stops the run.

pub mod catalog;
pub mod coverage;
pub mod orchestrator;
pub mod quality;
pub mod report;
pub mod results;

pub use catalog::{Catalog, Question, QuestionnaireItem, Section};
pub use coverage::{CoverageSummary, SectionCoverage};
pub use orchestrator::{Orchestrator, QuestionState};
pub use quality::QualityScores;
pub use report::RunReport;
pub use results::{ResultSet, SectionResult};
