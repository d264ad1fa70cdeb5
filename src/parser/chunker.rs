// file: src/parser/chunker.rs
// description: splits document text into bounded, overlapping windows
// reference: sliding window chunking over characters

use crate::config::ChunkingConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Document};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.max_chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunking.max_chunk_size must be greater than 0".to_string(),
            ));
        }
        if config.overlap_size >= config.max_chunk_size {
            return Err(PipelineError::Config(format!(
                "chunking.overlap_size ({}) must be smaller than max_chunk_size ({})",
                config.overlap_size, config.max_chunk_size
            )));
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chunks = self.chunk_text(&document.id, &document.full_text());
        debug!(
            "Document {}: {} chunks (max {}, overlap {})",
            document.short_id(),
            chunks.len(),
            self.config.max_chunk_size,
            self.config.overlap_size
        );
        chunks
    }

    /// Greedy fixed window: each chunk starts `max - overlap` characters after
    /// the previous one, and the window that reaches the end of the text is
    /// the last.
    pub fn chunk_text(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let step = self.config.max_chunk_size - self.config.overlap_size;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.config.max_chunk_size).min(total);
            let text: String = chars[start..end].iter().collect();

            chunks.push(Chunk {
                document_id: document_id.to_string(),
                index: chunks.len(),
                start,
                end,
                char_count: end - start,
                overlaps_previous: start > 0 && self.config.overlap_size > 0,
                text,
            });

            if end == total {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Rebuilds the text a chunk sequence was cut from, dropping the overlapping
/// prefix of every chunk after the first.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered: usize = 0;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        text.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunker(max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig {
            max_chunk_size: max,
            overlap_size: overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_max() {
        let result = Chunker::new(ChunkingConfig {
            max_chunk_size: 100,
            overlap_size: 100,
        });
        assert!(matches!(result, Err(PipelineError::Config(_))));

        let result = Chunker::new(ChunkingConfig {
            max_chunk_size: 0,
            overlap_size: 0,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_bounds_and_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker(10, 3).chunk_text("doc", text);

        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(0, 10), (7, 17), (14, 24), (21, 26)]);
        assert!(chunks.iter().all(|c| c.char_count <= 10));
        assert!(!chunks[0].overlaps_previous);
        assert!(chunks[1..].iter().all(|c| c.overlaps_previous));
        assert_eq!(chunks[3].text, "vwxyz");
    }

    #[test]
    fn test_reassemble_round_trip() {
        let text = "Résumé of naïve methods: ünïcödé text survives chunking intact. ".repeat(20);
        for (max, overlap) in [(50, 0), (50, 10), (7, 6), (1000, 100)] {
            let chunks = chunker(max, overlap).chunk_text("doc", &text);
            assert_eq!(reassemble(&chunks), text, "max={} overlap={}", max, overlap);
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let doc = Document::from_page_texts(&["first page text", "second page text"]);
        let chunker = chunker(8, 2);
        assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunker(10, 0).chunk_text("doc", "");
        assert!(chunks.is_empty());
        assert_eq!(reassemble(&chunks), "");
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_chunk() {
        let text = "A".repeat(100) + &"B".repeat(100);
        let chunks = chunker(100, 0).chunk_text("doc", &text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "B".repeat(100));
    }
}
