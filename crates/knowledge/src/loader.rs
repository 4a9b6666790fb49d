//! Corpus loading.
//!
//! Reads PDF and plain-text files from a directory into page units. Files
//! that cannot be read are skipped with a `Load` error; only an entirely
//! unloadable corpus is fatal.

use crate::progress::ProgressReporter;
use crate::types::{DocumentFormat, PageUnit};
use attest_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A file that was skipped during loading.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file: String,
    pub cause: String,
}

/// Page units of one successfully loaded document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub name: String,
    pub format: DocumentFormat,
    pub pages: Vec<PageUnit>,
    /// SHA-256 of the raw file bytes
    pub content_hash: String,
}

/// Everything loaded from a corpus directory.
#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub documents: Vec<LoadedDocument>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedCorpus {
    /// All page units in document order.
    pub fn pages(&self) -> impl Iterator<Item = &PageUnit> {
        self.documents.iter().flat_map(|d| d.pages.iter())
    }

    pub fn page_count(&self) -> usize {
        self.documents.iter().map(|d| d.pages.len()).sum()
    }

    /// Digest over document names and content, stable across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for doc in &self.documents {
            hasher.update(doc.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(doc.content_hash.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Lazy per-file reader over a corpus directory.
///
/// Yields one result per candidate file in file-name order; a failing file
/// yields `Err(AppError::Load { .. })` and iteration continues.
pub struct CorpusReader {
    files: std::vec::IntoIter<PathBuf>,
}

impl CorpusReader {
    /// Files not yet read.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl Iterator for CorpusReader {
    type Item = AppResult<LoadedDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        self.files.next().map(|path| load_file(&path))
    }
}

/// List the candidate files of a corpus directory without reading them.
///
/// The scan is not recursive and skips hidden files.
pub fn scan_directory(dir: &Path) -> AppResult<CorpusReader> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Corpus directory does not exist: {:?}",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    tracing::debug!("Found {} files in {:?}", files.len(), dir);

    Ok(CorpusReader {
        files: files.into_iter(),
    })
}

/// Load every supported document in `dir`.
///
/// # Errors
/// `AppError::EmptyCorpus` if no document could be loaded.
pub fn load_directory(dir: &Path) -> AppResult<LoadedCorpus> {
    load_directory_with_progress(dir, &ProgressReporter::noop())
}

/// [`load_directory`], emitting a `load` event per file.
pub fn load_directory_with_progress(
    dir: &Path,
    progress: &ProgressReporter,
) -> AppResult<LoadedCorpus> {
    let reader = scan_directory(dir)?;
    let total = reader.remaining() as u64;
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for (i, result) in reader.enumerate() {
        let name = match &result {
            Ok(doc) => doc.name.clone(),
            Err(AppError::Load { file, .. }) => file.clone(),
            Err(_) => String::new(),
        };
        progress.load(i as u64 + 1, Some(total), &name);

        match result {
            Ok(doc) => {
                tracing::debug!("Loaded {} ({} pages)", doc.name, doc.pages.len());
                documents.push(doc);
            }
            Err(AppError::Load { file, cause }) => {
                tracing::warn!("Skipping {}: {}", file, cause);
                skipped.push(SkippedFile { file, cause });
            }
            Err(e) => return Err(e),
        }
    }

    if documents.is_empty() {
        return Err(AppError::EmptyCorpus(dir.display().to_string()));
    }

    tracing::info!(
        "Loaded {} documents from {:?} ({} skipped)",
        documents.len(),
        dir,
        skipped.len()
    );

    Ok(LoadedCorpus { documents, skipped })
}

/// Load one file into page units.
pub fn load_file(path: &Path) -> AppResult<LoadedDocument> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let load_error = |cause: String| AppError::Load {
        file: name.clone(),
        cause,
    };

    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| load_error("unsupported file type".to_string()))?;

    let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
    let content_hash = format!("{:x}", Sha256::digest(&bytes));

    let raw_pages = match format {
        DocumentFormat::Pdf => extract_pdf_pages(&bytes).map_err(load_error)?,
        DocumentFormat::Text => vec![decode_text(&bytes)],
    };

    let pages: Vec<PageUnit> = raw_pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| PageUnit {
            document: name.clone(),
            path: path.to_path_buf(),
            page_number: i as u32 + 1,
            text,
        })
        .collect();

    if pages.is_empty() {
        return Err(load_error("no extractable text".to_string()));
    }

    Ok(LoadedDocument {
        name,
        format,
        pages,
        content_hash,
    })
}

/// Extract per-page text from PDF bytes.
///
/// Blank pages keep their position so page numbers stay aligned with the
/// document.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    // pdf-extract panics on some malformed font tables
    let extracted =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| "PDF extraction aborted on malformed content".to_string())?;

    extracted.map_err(|e| {
        let message = e.to_string();
        if message.to_lowercase().contains("encrypt") {
            format!("password-protected PDF: {}", message)
        } else {
            format!("PDF extraction failed: {}", message)
        }
    })
}

/// Decode file bytes as UTF-8, falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_text_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("policy.txt");
        fs::write(&path, "Passwords rotate every 90 days.").unwrap();

        let doc = load_file(&path).unwrap();
        assert_eq!(doc.name, "policy.txt");
        assert_eq!(doc.format, DocumentFormat::Text);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].page_number, 1);
        assert_eq!(doc.pages[0].text, "Passwords rotate every 90 days.");
    }

    #[test]
    fn test_latin1_fallback() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("legacy.txt");
        // "café" in Latin-1
        fs::write(&path, [0x63, 0x61, 0x66, 0xE9]).unwrap();

        let doc = load_file(&path).unwrap();
        assert_eq!(doc.pages[0].text, "café");
    }

    #[test]
    fn test_bom_stripped() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello"), "hello");
    }

    #[test]
    fn test_blank_file_is_load_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.md");
        fs::write(&path, "   \n\t ").unwrap();

        match load_file(&path) {
            Err(AppError::Load { file, .. }) => assert_eq!(file, "empty.md"),
            other => panic!("Expected load error, got {:?}", other.map(|d| d.name)),
        }
    }

    #[test]
    fn test_corrupt_pdf_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.pdf"), b"not a pdf at all").unwrap();
        fs::write(temp.path().join("controls.txt"), "MFA is enforced for all staff.").unwrap();

        let corpus = load_directory(temp.path()).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.documents[0].name, "controls.txt");
        assert_eq!(corpus.skipped.len(), 1);
        assert_eq!(corpus.skipped[0].file, "broken.pdf");
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_pdf_pages_keep_their_numbers() {
        let doc = load_file(&fixture("policy.pdf")).unwrap();

        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].page_number, 1);
        assert!(doc.pages[0].text.contains("Backups run nightly to region A"));
        assert!(!doc.pages[0].text.contains("retention"));
        assert_eq!(doc.pages[1].page_number, 2);
        assert!(doc.pages[1].text.contains("Backup retention is 30 days."));
    }

    #[test]
    fn test_blank_pdf_page_keeps_numbering() {
        let doc = load_file(&fixture("blank_middle_page.pdf")).unwrap();

        let numbers: Vec<u32> = doc.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(doc.pages[1].text.contains("30 days"));
    }

    #[test]
    fn test_unsupported_and_hidden_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".hidden.txt"), "secret").unwrap();
        fs::write(temp.path().join("diagram.png"), [0u8, 1, 2]).unwrap();
        fs::write(temp.path().join("b.md"), "second").unwrap();
        fs::write(temp.path().join("a.txt"), "first").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/deep.txt"), "not scanned").unwrap();

        let corpus = load_directory(temp.path()).unwrap();
        let names: Vec<_> = corpus.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.md"]);
        assert_eq!(corpus.skipped.len(), 1);
        assert_eq!(corpus.skipped[0].file, "diagram.png");
    }

    #[test]
    fn test_empty_corpus_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.pdf"), b"%PDF-garbage").unwrap();

        match load_directory(temp.path()) {
            Err(AppError::EmptyCorpus(_)) => {}
            other => panic!("Expected EmptyCorpus, got {:?}", other.map(|c| c.documents.len())),
        }
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            load_directory(&temp.path().join("absent")),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_reader_is_lazy_per_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "one").unwrap();
        fs::write(temp.path().join("b.pdf"), b"junk").unwrap();

        let mut reader = scan_directory(temp.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next().unwrap(), Err(AppError::Load { .. })));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "one").unwrap();
        let first = load_directory(temp.path()).unwrap().fingerprint();
        let again = load_directory(temp.path()).unwrap().fingerprint();
        fs::write(&path, "two").unwrap();
        let changed = load_directory(temp.path()).unwrap().fingerprint();

        assert_eq!(first, again);
        assert_ne!(first, changed);
    }
}
