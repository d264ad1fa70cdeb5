// file: src/extractor/citation.rs
// description: extracts structured citations and their in-text markers
// reference: uses patterns from patterns.rs and segmentation from references.rs

use crate::extractor::patterns::{
    AUTHOR_YEAR_NARRATIVE, AUTHOR_YEAR_PAREN, BRACKET_MARKER, expand_marker_numbers,
};
use crate::extractor::references::{find_references_section, parse_reference, segment_references};
use crate::models::{Chunk, Citation, CitationParseWarning, MarkerPosition};
use crate::parser::reassemble;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationExtraction {
    pub citations: Vec<Citation>,
    pub warnings: Vec<CitationParseWarning>,
}

/// A marker found in body text, before it is attributed to a citation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    Numbered(u32),
    AuthorYear { surname: String, year: u16 },
}

pub struct CitationExtractor;

impl CitationExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, document_id: &str, chunks: &[Chunk]) -> CitationExtraction {
        if chunks.is_empty() {
            return CitationExtraction::default();
        }

        let text = reassemble(chunks);
        let Some(section) = find_references_section(&text) else {
            debug!("Document {}: no references section found", document_id);
            return CitationExtraction::default();
        };

        let mut extraction = CitationExtraction::default();
        for raw in segment_references(section.slice(&text)) {
            let (citation, failure) = parse_reference(document_id, &raw);
            if let Some(reason) = failure {
                warn!("Document {}: unparsed reference: {}", document_id, reason);
                extraction.warnings.push(CitationParseWarning {
                    document_id: document_id.to_string(),
                    raw: citation.raw.clone(),
                    reason,
                });
            }
            extraction.citations.push(citation);
        }

        let locator = OffsetLocator::new(&text, chunks);
        let markers = self.find_markers(&text[..section.body_end]);
        self.attach_markers(&mut extraction.citations, &markers, &locator);

        debug!(
            "Document {}: {} citations, {} markers, {} warnings",
            document_id,
            extraction.citations.len(),
            markers.len(),
            extraction.warnings.len()
        );

        extraction
    }

    /// Markers in body text with their byte offsets, in text order.
    fn find_markers(&self, body: &str) -> Vec<(usize, Marker)> {
        let mut markers = Vec::new();

        for caps in BRACKET_MARKER.captures_iter(body) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            for number in expand_marker_numbers(inner.as_str()) {
                markers.push((whole.start(), Marker::Numbered(number)));
            }
        }

        for pattern in [&*AUTHOR_YEAR_PAREN, &*AUTHOR_YEAR_NARRATIVE] {
            for caps in pattern.captures_iter(body) {
                let (Some(whole), Some(surname), Some(year)) =
                    (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                if let Ok(year) = year.as_str().parse() {
                    markers.push((
                        whole.start(),
                        Marker::AuthorYear {
                            surname: surname.as_str().to_lowercase(),
                            year,
                        },
                    ));
                }
            }
        }

        markers.sort_by_key(|(offset, _)| *offset);
        markers
    }

    fn attach_markers(
        &self,
        citations: &mut [Citation],
        markers: &[(usize, Marker)],
        locator: &OffsetLocator,
    ) {
        let mut by_number: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut by_author_year: HashMap<(String, u16), Vec<usize>> = HashMap::new();

        for (i, citation) in citations.iter().enumerate() {
            if let Some(number) = citation.number {
                by_number.entry(number).or_default().push(i);
            }
            if let (Some(surname), Some(year)) = (citation.first_author_surname(), citation.year) {
                by_author_year.entry((surname, year)).or_default().push(i);
            }
        }

        for (offset, marker) in markers {
            let targets = match marker {
                Marker::Numbered(number) => by_number.get(number),
                Marker::AuthorYear { surname, year } => {
                    by_author_year.get(&(surname.clone(), *year))
                }
            };
            let Some(targets) = targets else { continue };
            let Some(position) = locator.locate(*offset) else {
                continue;
            };

            for &i in targets {
                if !citations[i].markers.contains(&position) {
                    citations[i].markers.push(position);
                }
            }
        }
    }
}

impl Default for CitationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps byte offsets of the reassembled text onto chunk positions.
struct OffsetLocator<'a> {
    char_starts: Vec<usize>,
    chunks: &'a [Chunk],
}

impl<'a> OffsetLocator<'a> {
    fn new(text: &str, chunks: &'a [Chunk]) -> Self {
        Self {
            char_starts: text.char_indices().map(|(i, _)| i).collect(),
            chunks,
        }
    }

    /// First chunk containing the offset, with the offset in characters
    /// relative to that chunk.
    fn locate(&self, byte_offset: usize) -> Option<MarkerPosition> {
        let char_offset = self.char_starts.partition_point(|&start| start < byte_offset);
        self.chunks
            .iter()
            .filter(|chunk| chunk.contains_offset(char_offset))
            .min_by_key(|chunk| chunk.index)
            .map(|chunk| MarkerPosition {
                chunk_index: chunk.index,
                offset: char_offset - chunk.start,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::parser::Chunker;
    use pretty_assertions::assert_eq;

    fn chunks_of(text: &str, max: usize, overlap: usize) -> Vec<Chunk> {
        Chunker::new(ChunkingConfig {
            max_chunk_size: max,
            overlap_size: overlap,
        })
        .unwrap()
        .chunk_text("doc", text)
    }

    const IEEE_PAPER: &str = "Graph Methods for Citation Analysis\n\
        Prior work on summaries [1] and graphs [2, 3] motivates this study.\n\
        Ranges such as [1-2] also occur.\n\
        References\n\
        [1] J. Smith. Neural summaries of scientific text. In Proc. ACL, 2021.\n\
        [2] K. Doe and L. Roe, \"Citation graphs at scale,\" in Proc. KDD, 2019.\n\
        [3] 12-34\n";

    #[test]
    fn test_extracts_ieee_citations() {
        let chunks = chunks_of(IEEE_PAPER, 4000, 200);
        let extraction = CitationExtractor::new().extract("doc", &chunks);

        assert_eq!(extraction.citations.len(), 3);
        let first = &extraction.citations[0];
        assert_eq!(first.number, Some(1));
        assert_eq!(
            first.normalized_title.as_deref(),
            Some("neural summaries of scientific text")
        );
        assert_eq!(first.year, Some(2021));
        assert_eq!(
            extraction.citations[1].title.as_deref(),
            Some("Citation graphs at scale")
        );
    }

    #[test]
    fn test_unparsed_reference_produces_warning() {
        let chunks = chunks_of(IEEE_PAPER, 4000, 200);
        let extraction = CitationExtractor::new().extract("doc", &chunks);

        assert_eq!(extraction.warnings.len(), 1);
        assert_eq!(extraction.warnings[0].raw, "12-34");
        assert!(extraction.citations[2].normalized_title.is_none());
    }

    #[test]
    fn test_bracket_markers_resolve_lists_and_ranges() {
        let chunks = chunks_of(IEEE_PAPER, 4000, 200);
        let extraction = CitationExtractor::new().extract("doc", &chunks);

        // [1] and [1-2]
        assert_eq!(extraction.citations[0].markers.len(), 2);
        // [2, 3] and [1-2]
        assert_eq!(extraction.citations[1].markers.len(), 2);
        // [2, 3] only
        assert_eq!(extraction.citations[2].markers.len(), 1);

        let offset = IEEE_PAPER.find("[1]").unwrap();
        assert_eq!(
            extraction.citations[0].markers[0],
            MarkerPosition {
                chunk_index: 0,
                offset
            }
        );
    }

    #[test]
    fn test_marker_maps_to_first_containing_chunk() {
        let chunks = chunks_of(IEEE_PAPER, 60, 30);
        let extraction = CitationExtractor::new().extract("doc", &chunks);

        let global = IEEE_PAPER[..IEEE_PAPER.find("[1]").unwrap()].chars().count();
        let marker = extraction.citations[0].markers[0];
        let chunk = &chunks[marker.chunk_index];
        assert_eq!(chunk.start + marker.offset, global);
        assert!(chunks[..marker.chunk_index].iter().all(|c| !c.contains_offset(global)));
    }

    #[test]
    fn test_author_year_markers() {
        let text = "A Study of Author Year Styles\n\
            Transformers dominate (Vaswani et al., 2017). Smith et al. (2020) disagree.\n\
            References\n\
            Vaswani, A., Shazeer, N. (2017). Attention is all you need. NeurIPS.\n\
            Smith, J. (2020). Against attention. Journal of Doubts.\n";
        let chunks = chunks_of(text, 4000, 0);
        let extraction = CitationExtractor::new().extract("doc", &chunks);

        assert_eq!(extraction.citations.len(), 2);
        assert_eq!(extraction.citations[0].markers.len(), 1);
        assert_eq!(extraction.citations[1].markers.len(), 1);
        assert_eq!(
            extraction.citations[0].title.as_deref(),
            Some("Attention is all you need")
        );
    }

    #[test]
    fn test_no_references_section() {
        let chunks = chunks_of("Only a body [1] with no list.", 4000, 0);
        let extraction = CitationExtractor::new().extract("doc", &chunks);
        assert!(extraction.citations.is_empty());
        assert!(extraction.warnings.is_empty());
    }
}
