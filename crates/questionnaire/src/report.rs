//! Run report combining results with their analysis.

use crate::coverage::CoverageSummary;
use crate::quality::QualityScores;
use crate::results::ResultSet;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything known about one questionnaire run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub strategy: String,
    pub coverage: CoverageSummary,

    /// Mean overall quality of answered questions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_quality: Option<f64>,

    pub results: ResultSet,
}

impl RunReport {
    pub fn new(strategy: &str, results: ResultSet) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            strategy: strategy.to_string(),
            coverage: CoverageSummary::from_results(&results),
            mean_quality: QualityScores::mean_overall(&results),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_knowledge::AnswerRecord;

    #[test]
    fn test_report_serializes_results_contract() {
        let mut results = ResultSet::new();
        results.push("access", "Access", AnswerRecord::insufficient_evidence("q1", "Badges?"));

        let report = RunReport::new("stuff", results);
        assert_eq!(report.coverage.total, 1);
        assert_eq!(report.mean_quality, None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "stuff");
        assert_eq!(json["results"]["access"]["q1"]["status"], "insufficient_evidence");
        assert!(json.get("mean_quality").is_none());
        assert_eq!(json["run_id"].as_str().map(str::len), Some(36));
    }
}
