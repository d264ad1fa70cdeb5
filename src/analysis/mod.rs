// file: src/analysis/mod.rs
// description: summarization, citation graph and gap analysis module exports
// reference: internal module structure

pub mod gaps;
pub mod graph;
pub mod summarizer;

pub use gaps::GapIdentifier;
pub use graph::{CitationEdge, CitationGraph, GraphSnapshot, Neighbors, NodeId};
pub use summarizer::{ChunkSummarizer, ChunkWarning, SummaryOutcome};
