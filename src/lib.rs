// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod analysis;
pub mod capability;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use analysis::{CitationGraph, GapIdentifier, NodeId};
pub use capability::{
    ArxivSearchClient, CapabilityError, GeminiClient, GoogleSearchClient, LanguageModel,
    SearchCapability,
};
pub use config::{CapabilityConfig, ChunkingConfig, Config, Credentials, GapConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use exporter::{ExportManifest, JsonExporter, ReportWriter};
pub use extractor::{CitationExtraction, CitationExtractor};
pub use models::{Chunk, Citation, Document, ResearchGap, SearchResult, Summary};
pub use parser::{Chunker, PdfExtractor};
pub use pipeline::{
    DocumentResult, DocumentStatus, PipelineOrchestrator, PipelineStage, PipelineStats,
    ProgressTracker, RunSnapshot, StatusEvent, SynthesisReport,
};
pub use utils::{
    HealthCheck, HealthReport, HealthStatus, OperationTimer, PerformanceMetrics, Validator,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert!(Chunker::new(config.chunking).is_ok());
    }
}
