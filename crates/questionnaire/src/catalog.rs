//! Questionnaire catalog: sections of questions answered in order.
//!
//! The catalog is loaded once and never mutated. A built-in catalog is
//! compiled into the binary; a custom one can be read from YAML.

use attest_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.yaml");

/// One question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
}

/// A titled group of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,

    /// Display title; the id is shown when absent
    #[serde(default)]
    pub title: Option<String>,

    pub questions: Vec<Question>,
}

impl Section {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// A (section id, question id, question text) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireItem<'a> {
    pub section_id: &'a str,
    pub question_id: &'a str,
    pub text: &'a str,
}

/// Validated, immutable catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    sections: Vec<Section>,
}

#[derive(Deserialize)]
struct CatalogFile {
    sections: Vec<Section>,
}

impl Catalog {
    /// Build and validate a catalog.
    pub fn new(sections: Vec<Section>) -> AppResult<Self> {
        let catalog = Self { sections };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.sections)
    }

    /// Read a catalog from a YAML file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read catalog {:?}: {}", path, e))
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        tracing::debug!(
            "Loaded catalog {:?} ({} sections, {} questions)",
            path,
            catalog.sections.len(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// The file at `path` if given, otherwise the built-in catalog.
    pub fn resolve(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.sections.is_empty() {
            return Err(AppError::Config("Catalog has no sections".to_string()));
        }

        let mut section_ids = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(AppError::Config("Catalog section with empty id".to_string()));
            }
            if !section_ids.insert(section.id.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate catalog section '{}'",
                    section.id
                )));
            }
            if section.questions.is_empty() {
                return Err(AppError::Config(format!(
                    "Catalog section '{}' has no questions",
                    section.id
                )));
            }

            let mut question_ids = HashSet::new();
            for question in &section.questions {
                if question.id.trim().is_empty() || question.text.trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "Catalog section '{}' has a question with an empty id or text",
                        section.id
                    )));
                }
                if !question_ids.insert(question.id.as_str()) {
                    return Err(AppError::Config(format!(
                        "Duplicate question '{}' in section '{}'",
                        question.id, section.id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Every question in catalog order.
    pub fn items(&self) -> impl Iterator<Item = QuestionnaireItem<'_>> {
        self.sections.iter().flat_map(|section| {
            section.questions.iter().map(move |q| QuestionnaireItem {
                section_id: &section.id,
                question_id: &q.id,
                text: &q.text,
            })
        })
    }

    /// Total number of questions.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A catalog restricted to the named sections, in catalog order.
    pub fn only_sections(&self, ids: &[String]) -> AppResult<Self> {
        if let Some(unknown) = ids.iter().find(|id| self.section(id).is_none()) {
            return Err(AppError::Config(format!("Unknown catalog section '{}'", unknown)));
        }
        Self::new(
            self.sections
                .iter()
                .filter(|s| ids.contains(&s.id))
                .cloned()
                .collect(),
        )
    }
}
