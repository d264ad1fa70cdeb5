// file: src/models/chunk.rs
// description: bounded text segment of a document
// reference: chunking for model context limits

use serde::{Deserialize, Serialize};

/// `start` and `end` are character offsets into `Document::full_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub char_count: usize,
    pub overlaps_previous: bool,
}

impl Chunk {
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}
