//! Result set of a questionnaire run.
//!
//! Serializes as `{section_id: {question_id: record}}` in catalog order.

use attest_knowledge::AnswerRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Answers for one catalog section.
#[derive(Debug, Clone)]
pub struct SectionResult {
    pub section_id: String,
    pub title: String,
    pub answers: Vec<AnswerRecord>,
}

/// One record per catalog question, grouped by section.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    sections: Vec<SectionResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; sections are created in first-seen order.
    pub(crate) fn push(&mut self, section_id: &str, title: &str, record: AnswerRecord) {
        match self.sections.iter_mut().find(|s| s.section_id == section_id) {
            Some(section) => section.answers.push(record),
            None => self.sections.push(SectionResult {
                section_id: section_id.to_string(),
                title: title.to_string(),
                answers: vec![record],
            }),
        }
    }

    pub fn sections(&self) -> &[SectionResult] {
        &self.sections
    }

    /// `(section_id, record)` pairs in catalog order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &AnswerRecord)> {
        self.sections.iter().flat_map(|s| {
            s.answers
                .iter()
                .map(move |record| (s.section_id.as_str(), record))
        })
    }

    pub fn get(&self, section_id: &str, question_id: &str) -> Option<&AnswerRecord> {
        self.sections
            .iter()
            .find(|s| s.section_id == section_id)?
            .answers
            .iter()
            .find(|r| r.question_id == question_id)
    }

    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.answers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SectionAnswers<'a>(&'a [AnswerRecord]);

impl Serialize for SectionAnswers<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(&record.question_id, record)?;
        }
        map.end()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(&section.section_id, &SectionAnswers(&section.answers))?;
        }
        map.end()
    }
}
