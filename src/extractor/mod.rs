// file: src/extractor/mod.rs
// description: citation extraction module exports
// reference: internal module structure

pub mod citation;
pub mod patterns;
pub mod references;

pub use citation::{CitationExtraction, CitationExtractor};
pub use references::{RawReference, ReferenceSection, find_references_section, segment_references};
