//! Answer record types.

use serde::{Deserialize, Serialize};

/// Fixed answer for questions with no passage above the similarity threshold.
pub const INSUFFICIENT_EVIDENCE_ANSWER: &str =
    "Insufficient evidence: no passage in the indexed documents is relevant enough to answer this question.";

/// A supporting source for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub document_name: String,
    pub page_number: u32,
}

/// Outcome of answering one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    InsufficientEvidence,
    /// Generation failed; `answer_text` is empty and `error` says why
    Failed,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::InsufficientEvidence => "insufficient_evidence",
            Self::Failed => "failed",
        }
    }
}

/// The answer to one questionnaire item.
///
/// Records are never mutated after creation; reprocessing a question
/// produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub question: String,
    pub status: AnswerStatus,
    pub answer_text: String,

    /// Sources in the order synthesis used them
    pub citations: Vec<Citation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerRecord {
    pub fn answered(
        question_id: impl Into<String>,
        question: impl Into<String>,
        answer_text: String,
        citations: Vec<Citation>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question: question.into(),
            status: AnswerStatus::Answered,
            answer_text,
            citations,
            error: None,
        }
    }

    pub fn insufficient_evidence(question_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            question: question.into(),
            status: AnswerStatus::InsufficientEvidence,
            answer_text: INSUFFICIENT_EVIDENCE_ANSWER.to_string(),
            citations: Vec::new(),
            error: None,
        }
    }

    /// Failure marker; never carries answer text.
    pub fn failed(
        question_id: impl Into<String>,
        question: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question: question.into(),
            status: AnswerStatus::Failed,
            answer_text: String::new(),
            citations: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == AnswerStatus::Answered
    }

    pub fn is_failed(&self) -> bool {
        self.status == AnswerStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_marker_has_no_answer() {
        let record = AnswerRecord::failed("q1", "Is MFA enforced?", "Generation failed: 503");
        assert!(record.is_failed());
        assert!(record.answer_text.is_empty());
        assert!(record.citations.is_empty());
        assert_eq!(record.error.as_deref(), Some("Generation failed: 503"));
    }

    #[test]
    fn test_insufficient_evidence_is_deterministic() {
        let a = AnswerRecord::insufficient_evidence("q1", "Badge policy?");
        let b = AnswerRecord::insufficient_evidence("q1", "Badge policy?");
        assert_eq!(a, b);
        assert_eq!(a.answer_text, INSUFFICIENT_EVIDENCE_ANSWER);
        assert!(!a.is_answered());
    }

    #[test]
    fn test_serialization_shape() {
        let record = AnswerRecord::answered(
            "q2",
            "Backup retention?",
            "30 days".to_string(),
            vec![Citation {
                document_name: "policy.pdf".to_string(),
                page_number: 2,
            }],
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "answered");
        assert_eq!(json["citations"][0]["document_name"], "policy.pdf");
        assert_eq!(json["citations"][0]["page_number"], 2);
        assert!(json.get("error").is_none());
    }
}
