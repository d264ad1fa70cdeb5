// file: src/models/citation.rs
// description: bibliographic reference model with normalized matching fields
// reference: citation parsing and dedup keys

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub chunk_index: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Id of the citing document.
    pub document_id: String,
    pub number: Option<u32>,
    pub raw: String,
    pub title: Option<String>,
    pub normalized_title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<u16>,
    pub markers: Vec<MarkerPosition>,
}

/// Dedup key for graph insertion: (citing document, normalized title, year).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CitationKey {
    pub citing: String,
    pub title: String,
    pub year: Option<u16>,
}

impl Citation {
    pub fn new(document_id: &str, raw: String) -> Self {
        Self {
            document_id: document_id.to_string(),
            number: None,
            raw,
            title: None,
            normalized_title: None,
            authors: Vec::new(),
            year: None,
            markers: Vec::new(),
        }
    }

    /// Title used for matching. Unparsed references fall back to their
    /// normalized raw text so they still get a stable identity.
    pub fn match_title(&self) -> String {
        self.normalized_title
            .clone()
            .unwrap_or_else(|| normalize_title(&self.raw))
    }

    pub fn key(&self) -> CitationKey {
        CitationKey {
            citing: self.document_id.clone(),
            title: self.match_title(),
            year: self.year,
        }
    }

    /// Lower-cased surname of the first author, used for author-year markers.
    pub fn first_author_surname(&self) -> Option<String> {
        let first = self.authors.first()?;
        let surname = if let Some((last, _)) = first.split_once(',') {
            last
        } else {
            first.split_whitespace().last()?
        };
        let surname = surname.trim_matches(|c: char| !c.is_alphanumeric() && c != '-');
        if surname.is_empty() {
            None
        } else {
            Some(surname.to_lowercase())
        }
    }
}

/// Non-fatal problem with a single reference string. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationParseWarning {
    pub document_id: String,
    pub raw: String,
    pub reason: String,
}

/// Lower-cases, collapses whitespace and strips surrounding punctuation.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}
