//! Coverage summary over a result set.

use crate::results::ResultSet;
use attest_knowledge::{AnswerRecord, AnswerStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Answered records that still say the documents lack the information.
fn is_hedged(record: &AnswerRecord) -> bool {
    let lower = record.answer_text.to_lowercase();
    lower.starts_with("i don't")
        || lower.contains("don't have")
        || lower.contains("unable to determine")
        || lower.contains("insufficient evidence")
}

/// Counts for one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionCoverage {
    pub section_id: String,
    pub title: String,
    pub total: usize,
    pub answered: usize,
    pub insufficient_evidence: usize,
    pub failed: usize,

    /// Answered, but the answer admits missing information
    pub hedged: usize,
}

impl SectionCoverage {
    /// Share of questions without a usable answer.
    pub fn missing_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.total - self.answered + self.hedged) as f64 / self.total as f64
    }
}

/// Totals and per-section breakdown of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub total: usize,
    pub answered: usize,
    pub insufficient_evidence: usize,
    pub failed: usize,
    pub hedged: usize,
    pub sections: Vec<SectionCoverage>,

    /// Citations per document across all answers
    pub document_citations: BTreeMap<String, usize>,

    /// Sections where more than half the questions lack a usable answer
    pub needs_attention: Vec<String>,
}

impl CoverageSummary {
    pub fn from_results(results: &ResultSet) -> Self {
        let mut summary = Self::default();

        for section in results.sections() {
            let mut coverage = SectionCoverage {
                section_id: section.section_id.clone(),
                title: section.title.clone(),
                ..Default::default()
            };

            for record in &section.answers {
                coverage.total += 1;
                match record.status {
                    AnswerStatus::Answered => {
                        coverage.answered += 1;
                        if is_hedged(record) {
                            coverage.hedged += 1;
                        }
                    }
                    AnswerStatus::InsufficientEvidence => coverage.insufficient_evidence += 1,
                    AnswerStatus::Failed => coverage.failed += 1,
                }
                for citation in &record.citations {
                    *summary
                        .document_citations
                        .entry(citation.document_name.clone())
                        .or_insert(0) += 1;
                }
            }

            summary.total += coverage.total;
            summary.answered += coverage.answered;
            summary.insufficient_evidence += coverage.insufficient_evidence;
            summary.failed += coverage.failed;
            summary.hedged += coverage.hedged;
            if coverage.missing_ratio() > 0.5 {
                summary.needs_attention.push(coverage.section_id.clone());
            }
            summary.sections.push(coverage);
        }

        summary
    }

    /// Share of questions answered, 0.0 for an empty run.
    pub fn answer_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.answered as f64 / self.total as f64
        }
    }

    /// Up to `n` sections with the highest share of missing answers.
    pub fn priority_sections(&self, n: usize) -> Vec<&SectionCoverage> {
        let mut sections: Vec<&SectionCoverage> = self
            .sections
            .iter()
            .filter(|s| s.missing_ratio() > 0.0)
            .collect();
        sections.sort_by(|a, b| {
            b.missing_ratio()
                .partial_cmp(&a.missing_ratio())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sections.truncate(n);
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_knowledge::Citation;

    fn cite(doc: &str, page: u32) -> Citation {
        Citation {
            document_name: doc.to_string(),
            page_number: page,
        }
    }

    fn results() -> ResultSet {
        let mut results = ResultSet::new();
        results.push(
            "backup",
            "Backup and Recovery",
            AnswerRecord::answered(
                "q1",
                "Frequency?",
                "Nightly (policy.pdf)".to_string(),
                vec![cite("policy.pdf", 1), cite("policy.pdf", 2)],
            ),
        );
        results.push(
            "backup",
            "Backup and Recovery",
            AnswerRecord::answered("q2", "Retention?", "30 days".to_string(), vec![cite("dr.md", 1)]),
        );
        results.push("access", "Access", AnswerRecord::insufficient_evidence("q3", "Badges?"));
        results.push(
            "access",
            "Access",
            AnswerRecord::answered(
                "q4",
                "Reviews?",
                "I don't have enough information in the documents.".to_string(),
                vec![cite("policy.pdf", 3)],
            ),
        );
        results.push("access", "Access", AnswerRecord::failed("q5", "MFA?", "timeout"));
        results
    }

    #[test]
    fn test_totals() {
        let summary = CoverageSummary::from_results(&results());
        assert_eq!(summary.total, 5);
        assert_eq!(summary.answered, 3);
        assert_eq!(summary.insufficient_evidence, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.hedged, 1);
        assert!((summary.answer_rate() - 0.6).abs() < 1e-9);
        assert_eq!(summary.document_citations["policy.pdf"], 3);
        assert_eq!(summary.document_citations["dr.md"], 1);
    }

    #[test]
    fn test_sections_needing_attention() {
        let summary = CoverageSummary::from_results(&results());
        assert_eq!(summary.needs_attention, vec!["access".to_string()]);

        let access = &summary.sections[1];
        assert_eq!(access.total, 3);
        assert!((access.missing_ratio() - 1.0).abs() < 1e-9);

        let priorities = summary.priority_sections(3);
        assert_eq!(priorities.len(), 1);
        assert_eq!(priorities[0].section_id, "access");
    }

    #[test]
    fn test_empty_results() {
        let summary = CoverageSummary::from_results(&ResultSet::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.answer_rate(), 0.0);
        assert!(summary.needs_attention.is_empty());
    }
}
