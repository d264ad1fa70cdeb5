// file: src/models/document.rs
// description: extracted document model with per-page confidence
// reference: internal data structures

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageConfidence {
    High,
    Low,
}

impl PageConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageConfidence::High => "high",
            PageConfidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
    pub confidence: PageConfidence,
}

impl Page {
    pub fn new(number: u32, text: String) -> Self {
        let confidence = if text.trim().is_empty() {
            PageConfidence::Low
        } else {
            PageConfidence::High
        };

        Self {
            number,
            text,
            confidence,
        }
    }

    pub fn unreadable(number: u32) -> Self {
        Self {
            number,
            text: String::new(),
            confidence: PageConfidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub byte_len: u64,
    pub title: Option<String>,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(id: String, byte_len: u64, pages: Vec<Page>) -> Self {
        let title = pages.first().and_then(|page| Self::detect_title(&page.text));

        Self {
            id,
            byte_len,
            title,
            pages,
        }
    }

    /// Builds a document from already-extracted page texts, keyed on the
    /// hash of the joined text.
    pub fn from_page_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let pages: Vec<Page> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Page::new(i as u32 + 1, text.as_ref().to_string()))
            .collect();
        let joined = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self::new(
            Self::compute_id(joined.as_bytes()),
            joined.len() as u64,
            pages,
        )
    }

    pub fn compute_id(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|p| p.confidence == PageConfidence::High)
    }

    pub fn low_confidence_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.confidence == PageConfidence::Low)
            .map(|p| p.number)
            .collect()
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    // First line long enough to be a heading rather than a running header.
    fn detect_title(text: &str) -> Option<String> {
        text.lines()
            .map(str::trim)
            .find(|line| line.chars().count() > 10)
            .map(|line| line.chars().take(200).collect())
    }
}

/// First 12 characters of a document id, for logs and file names.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((cut, _)) => &id[..cut],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_respects_char_boundaries() {
        assert_eq!(short_id("3f9a0c1d2e4b5a6f"), "3f9a0c1d2e4b");
        assert_eq!(short_id("short"), "short");
        assert_eq!(short_id("résumé-étude-ñ-2024"), "résumé-étude");
        assert_eq!(short_id("論文論文論文論文論文論文論文"), "論文論文論文論文論文論文");
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::from_page_texts(&[
            "Sparse Attention for Long Documents\nWe study attention.",
            "",
        ]);

        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].confidence, PageConfidence::High);
        assert_eq!(doc.pages[1].confidence, PageConfidence::Low);
        assert_eq!(
            doc.title.as_deref(),
            Some("Sparse Attention for Long Documents")
        );
        assert_eq!(doc.low_confidence_pages(), vec![2]);
    }

    #[test]
    fn test_hash_consistency() {
        let hash1 = Document::compute_id(b"%PDF-1.5 same bytes");
        let hash2 = Document::compute_id(b"%PDF-1.5 same bytes");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_full_text_joins_pages() {
        let doc = Document::from_page_texts(&["first page", "second page"]);
        assert_eq!(doc.full_text(), "first page\nsecond page");
        assert!(doc.has_text());
    }
}
