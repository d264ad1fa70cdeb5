// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod chunk;
pub mod citation;
pub mod document;
pub mod gap;
pub mod search_result;
pub mod summary;

pub use chunk::Chunk;
pub use citation::{Citation, CitationKey, CitationParseWarning, MarkerPosition, normalize_title};
pub use document::{Document, Page, PageConfidence, short_id};
pub use gap::ResearchGap;
pub use search_result::SearchResult;
pub use summary::{KeyFinding, Methodology, PartialSummary, Summary, SummaryAccumulator};
