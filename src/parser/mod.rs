// file: src/parser/mod.rs
// description: PDF text extraction and chunking module exports
// reference: internal module structure

pub mod chunker;
pub mod normalizer;
pub mod pdf;

pub use chunker::{Chunker, reassemble};
pub use normalizer::TextNormalizer;
pub use pdf::PdfExtractor;
