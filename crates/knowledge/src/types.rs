//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Paginated; one page unit per PDF page
    Pdf,
    /// Flat text (.txt, .md); the whole file is one page
    Text,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
        }
    }
}

/// Text of one page of a source document, with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUnit {
    /// Source file name (e.g. "policy.pdf")
    pub document: String,

    /// Full path the page was read from
    pub path: PathBuf,

    /// 1-based page number
    pub page_number: u32,

    pub text: String,
}

/// A bounded span of page text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable identifier derived from provenance
    pub id: String,

    /// Owning document name
    pub document: String,

    /// 1-based page number within the document
    pub page_number: u32,

    /// Character offset of the passage start within its page
    pub start_offset: usize,

    pub text: String,
}

impl Passage {
    pub fn new(document: &str, page_number: u32, start_offset: usize, text: String) -> Self {
        Self {
            id: format!("{}#p{}@{}", document, page_number, start_offset),
            document: document.to_string(),
            page_number,
            start_offset,
            text,
        }
    }

    /// Character offset one past the passage end within its page.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.chars().count()
    }
}

/// A passage with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Outcome of a retrieval.
///
/// An empty filtered result is reported as `NoRelevantContext`, never as an
/// empty list, so answer synthesis can tell "nothing relevant" apart from data.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Passages ordered by descending score, all at or above the threshold
    Found(Vec<ScoredPassage>),
    NoRelevantContext,
}

impl Retrieval {
    /// Build from ranked passages, mapping an empty list to the sentinel.
    pub fn from_ranked(passages: Vec<ScoredPassage>) -> Self {
        if passages.is_empty() {
            Self::NoRelevantContext
        } else {
            Self::Found(passages)
        }
    }

    pub fn passages(&self) -> &[ScoredPassage] {
        match self {
            Self::Found(passages) => passages,
            Self::NoRelevantContext => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoRelevantContext)
    }
}

/// Statistics from building an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnStats {
    /// Documents successfully loaded
    pub documents_count: u32,

    /// Files skipped with a load error
    pub skipped_count: u32,

    /// Non-blank pages extracted
    pub pages_count: u32,

    /// Passages indexed
    pub passages_count: u32,

    /// Whether embeddings came from an existing snapshot
    pub reused_snapshot: bool,

    /// Duration in seconds
    pub duration_secs: f64,
}
