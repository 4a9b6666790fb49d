//! Heuristic quality scores for generated answers.
//!
//! Scores are in [0, 1]. They reward concrete detail and cited evidence;
//! they say nothing about whether an answer is correct.

use crate::results::ResultSet;
use attest_knowledge::AnswerRecord;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Security vocabulary counted toward technical depth.
const SECURITY_TERMS: &[&str] = &[
    "encrypt",
    "aes",
    "tls",
    "mfa",
    "multi-factor",
    "access control",
    "least privilege",
    "rbac",
    "audit",
    "logging",
    "monitoring",
    "siem",
    "vulnerability",
    "patch",
    "penetration",
    "incident",
    "backup",
    "firewall",
    "key management",
    "retention",
];

fn number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b\d+(?:\.\d+)*%?").ok())
        .as_ref()
}

fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)\b(?:iso\s?\d{4,5}|soc\s?[12]|nist|pci[\s-]?dss|gdpr|hipaa|cis)\b").ok()
        })
        .as_ref()
}

fn sentence_end_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[.!?](?:\s|$)").ok())
        .as_ref()
}

fn count_matches(pattern: Option<&Regex>, text: &str) -> usize {
    pattern.map_or(0, |p| p.find_iter(text).count())
}

fn sentence_count(text: &str) -> usize {
    match sentence_end_pattern() {
        Some(pattern) => pattern
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .count(),
        None => usize::from(!text.trim().is_empty()),
    }
}

fn ratio(count: usize, saturation: usize) -> f64 {
    (count as f64 / saturation as f64).min(1.0)
}

/// Per-answer heuristic scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityScores {
    /// Numbers, versions and standard references
    pub specificity: f64,

    /// Length and sentence structure
    pub completeness: f64,

    /// Breadth of security vocabulary
    pub technical_depth: f64,

    /// Distinct cited pages
    pub citation: f64,

    pub overall: f64,
}

impl QualityScores {
    /// Score one record. Records without an answer score zero.
    pub fn assess(record: &AnswerRecord) -> Self {
        if !record.is_answered() {
            return Self::default();
        }
        let text = record.answer_text.as_str();
        let lower = text.to_lowercase();

        let specificity = ratio(
            count_matches(number_pattern(), text) + count_matches(reference_pattern(), text),
            4,
        );

        let chars = text.trim().chars().count();
        let completeness = 0.5 * ratio(sentence_count(text), 4) + 0.5 * ratio(chars, 400);

        let terms: BTreeSet<&str> = SECURITY_TERMS
            .iter()
            .copied()
            .filter(|term| lower.contains(term))
            .collect();
        let technical_depth = ratio(terms.len(), 5);

        let citation = ratio(record.citations.len(), 2);

        let overall =
            0.3 * specificity + 0.2 * completeness + 0.25 * technical_depth + 0.25 * citation;

        Self {
            specificity,
            completeness,
            technical_depth,
            citation,
            overall,
        }
    }

    /// Mean overall score across answered records, if any.
    pub fn mean_overall(results: &ResultSet) -> Option<f64> {
        let scores: Vec<f64> = results
            .records()
            .filter(|(_, r)| r.is_answered())
            .map(|(_, r)| Self::assess(r).overall)
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}
