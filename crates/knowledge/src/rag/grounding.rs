//! Grounding checks on generated answers.
//!
//! An answer may only name documents that back the passages it was given.
//! Document mentions are detected by file extension.

use crate::rag::types::Citation;
use crate::types::ScoredPassage;
use attest_core::{AppError, AppResult};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

fn document_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)[a-z0-9_\-.]+\.(?:pdf|txt|md|markdown)\b").ok())
        .as_ref()
}

/// Document file names mentioned in `text`, in order of appearance.
pub fn mentioned_documents(text: &str) -> Vec<String> {
    let Some(pattern) = document_pattern() else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches('.').to_string())
        .collect()
}

/// Distinct document names backing `passages`.
pub fn allowed_documents(passages: &[ScoredPassage]) -> BTreeSet<String> {
    passages
        .iter()
        .map(|s| s.passage.document.clone())
        .collect()
}

/// A mention is grounded if some allowed name ends with it, ignoring case,
/// so "Report.pdf" matches "SOC2 Report.pdf".
fn is_allowed(mention: &str, allowed: &BTreeSet<String>) -> bool {
    let mention = mention.to_lowercase();
    allowed
        .iter()
        .any(|name| name.to_lowercase().ends_with(&mention))
}

/// Reject an answer that names a document outside `allowed`.
///
/// # Errors
/// `AppError::Generation`, so the retry policy asks the model again.
pub fn check_grounding(answer: &str, allowed: &BTreeSet<String>) -> AppResult<()> {
    let ungrounded: Vec<String> = mentioned_documents(answer)
        .into_iter()
        .filter(|m| !is_allowed(m, allowed))
        .collect();

    if ungrounded.is_empty() {
        return Ok(());
    }

    Err(AppError::Generation(format!(
        "Answer cites documents not in the supplied passages: {}",
        ungrounded.join(", ")
    )))
}

/// Citations for `passages`, deduplicated on (document, page) in first-use order.
pub fn citations_for(passages: &[ScoredPassage]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    passages
        .iter()
        .map(|s| Citation {
            document_name: s.passage.document.clone(),
            page_number: s.passage.page_number,
        })
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
