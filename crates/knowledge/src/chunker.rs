//! Text chunking with configurable size and overlap.
//!
//! Cuts prefer paragraph breaks, then line breaks, then spaces, and fall back
//! to a hard character cut only when the window holds no separator. Offsets
//! and lengths are counted in characters, never bytes. Passage text is kept
//! verbatim (no trimming) so a page can be rebuilt from its passages.

use crate::types::{PageUnit, Passage};
use attest_core::{AppError, AppResult};

/// Separators in order of preference.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits page text into overlapping passages.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with maximum passage length `size` and `overlap` < `size`.
    pub fn new(size: usize, overlap: usize) -> AppResult<Self> {
        if size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split one page into passages carrying its provenance.
    pub fn split(&self, page: &PageUnit) -> Vec<Passage> {
        self.split_text(&page.text)
            .into_iter()
            .map(|(start, text)| Passage::new(&page.document, page.page_number, start, text))
            .collect()
    }

    /// Split every page in order.
    pub fn split_all<'a>(&self, pages: impl IntoIterator<Item = &'a PageUnit>) -> Vec<Passage> {
        let passages: Vec<Passage> = pages.into_iter().flat_map(|p| self.split(p)).collect();

        tracing::debug!(
            "Chunked pages into {} passages (size: {}, overlap: {})",
            passages.len(),
            self.size,
            self.overlap
        );

        passages
    }

    /// Split raw text into `(start_offset, text)` spans.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut spans = Vec::new();

        if len == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            if len - start <= self.size {
                spans.push((start, chars[start..].iter().collect()));
                break;
            }

            // The cut must leave room for a start strictly after `start`
            let (end, separator) =
                find_cut(&chars, start + self.overlap + 1, start + self.size);
            spans.push((start, chars[start..end].iter().collect()));

            start = match separator {
                Some(sep) => first_boundary(&chars, end - self.overlap, end, sep)
                    .unwrap_or(end - self.overlap),
                None => end - self.overlap,
            };
        }

        spans
    }
}

/// Whether a separator ends exactly at char position `pos`.
fn ends_with_at(chars: &[char], pos: usize, sep: &str) -> bool {
    let sep_len = sep.chars().count();
    pos >= sep_len && chars[pos - sep_len..pos].iter().copied().eq(sep.chars())
}

/// Latest cut position in `[lo, hi]` following the most preferred separator.
fn find_cut(chars: &[char], lo: usize, hi: usize) -> (usize, Option<&'static str>) {
    for sep in SEPARATORS {
        if let Some(pos) = (lo..=hi).rev().find(|&p| ends_with_at(chars, p, sep)) {
            return (pos, Some(sep));
        }
    }
    (hi, None)
}

/// Earliest position in `[lo, hi)` following `sep`.
fn first_boundary(chars: &[char], lo: usize, hi: usize, sep: &str) -> Option<usize> {
    (lo..hi).find(|&p| ends_with_at(chars, p, sep))
}

/// Rebuild page text from consecutive passages of that page.
pub fn reconstruct(passages: &[Passage]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;

    for passage in passages {
        let skip = covered.saturating_sub(passage.start_offset);
        text.extend(passage.text.chars().skip(skip));
        covered = covered.max(passage.end_offset());
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page(text: &str) -> PageUnit {
        PageUnit {
            document: "policy.pdf".to_string(),
            path: PathBuf::from("/corpus/policy.pdf"),
            page_number: 3,
            text: text.to_string(),
        }
    }

    fn sample_texts() -> Vec<String> {
        vec![
            "a".repeat(1000),
            "abcdefghijklmnopqrstuvwxyz".repeat(40),
            "Access reviews are performed quarterly by system owners. ".repeat(30),
            "Line one of the policy\nLine two of the policy\n".repeat(25),
            "Section 1\n\nEncryption at rest uses AES-256.\n\nSection 2\n\nTLS 1.2 or higher is required in transit.\n\n"
                .repeat(12),
            "Política de contraseñas: mínimo 12 caracteres, rotación cada 90 días. ".repeat(20),
            "word ".repeat(3) + &"x".repeat(700) + " tail",
        ]
    }

    #[test]
    fn test_new_validates_parameters() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(100, 100).is_err());
        assert!(Chunker::new(100, 150).is_err());
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_page_yields_single_passage() {
        let chunker = Chunker::new(500, 50).unwrap();
        let passages = chunker.split(&page("Backups run nightly to region A."));

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "Backups run nightly to region A.");
        assert_eq!(passages[0].start_offset, 0);
        assert_eq!(passages[0].document, "policy.pdf");
        assert_eq!(passages[0].page_number, 3);
    }

    #[test]
    fn test_page_of_exact_size_is_not_split() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert_eq!(chunker.split_text(&"z".repeat(100)).len(), 1);
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let chunker = Chunker::new(500, 50).unwrap();
        assert!(chunker.split(&page("")).is_empty());
    }

    #[test]
    fn test_reconstruction_is_lossless() {
        for (size, overlap) in [(500, 50), (100, 20), (64, 1), (40, 39), (120, 0)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            for text in sample_texts() {
                let passages = chunker.split(&page(&text));
                assert_eq!(
                    reconstruct(&passages),
                    text,
                    "size={} overlap={}",
                    size,
                    overlap
                );
            }
        }
    }

    #[test]
    fn test_passages_respect_max_length() {
        let chunker = Chunker::new(100, 20).unwrap();
        for text in sample_texts() {
            for passage in chunker.split(&page(&text)) {
                assert!(passage.text.chars().count() <= 100);
            }
        }
    }

    #[test]
    fn test_overlap_is_bounded_and_positive() {
        for (size, overlap) in [(500, 50), (100, 20), (64, 1), (40, 39)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            for text in sample_texts() {
                let passages = chunker.split(&page(&text));
                for pair in passages.windows(2) {
                    let shared = pair[0].end_offset() - pair[1].start_offset;
                    assert!(
                        shared > 0 && shared <= overlap,
                        "shared={} size={} overlap={}",
                        shared,
                        size,
                        overlap
                    );
                    assert!(pair[1].start_offset > pair[0].start_offset);
                }
            }
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunker = Chunker::new(100, 10).unwrap();
        let spans = chunker.split_text(&text);

        assert_eq!(spans[0].1, format!("{}\n\n", "a".repeat(60)));
    }

    #[test]
    fn test_prefers_word_boundaries_over_hard_cut() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let chunker = Chunker::new(20, 5).unwrap();

        for (_, span) in chunker.split_text(text).iter().rev().skip(1) {
            assert!(span.ends_with(' '), "span {:?} cut mid-word", span);
        }
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let chunker = Chunker::new(100, 10).unwrap();
        let spans = chunker.split_text(&"x".repeat(250));

        assert_eq!(spans[0], (0, "x".repeat(100)));
        assert_eq!(spans[1].0, 90);
        assert_eq!(spans.last().map(|(_, t)| t.len()), Some(250 - spans.last().unwrap().0));
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let text = "é".repeat(250);
        let chunker = Chunker::new(100, 10).unwrap();
        let passages = chunker.split(&page(&text));

        assert_eq!(passages[1].start_offset, 90);
        assert_eq!(reconstruct(&passages), text);
    }
}
