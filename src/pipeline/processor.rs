// file: src/pipeline/processor.rs
// description: per-document stages: pdf extraction, chunking, summarization with citation extraction
// reference: cpu-bound stages run on the blocking pool

use crate::analysis::{ChunkSummarizer, SummaryOutcome};
use crate::capability::{CapabilityLimiter, LanguageModel, RetryPolicy};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::extractor::{CitationExtraction, CitationExtractor};
use crate::models::{Chunk, Document, short_id};
use crate::parser::{Chunker, PdfExtractor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Output of the analysis stage for one document.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub summary: SummaryOutcome,
    pub citations: CitationExtraction,
}

pub struct DocumentProcessor {
    extractor: Arc<PdfExtractor>,
    chunker: Chunker,
    summarizer: ChunkSummarizer,
    citation_extractor: Arc<CitationExtractor>,
}

impl DocumentProcessor {
    pub fn new(
        config: &Config,
        model: Arc<dyn LanguageModel>,
        limiter: Option<CapabilityLimiter>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunking)?;
        let summarizer = ChunkSummarizer::new(
            model,
            RetryPolicy::from_config(&config.capability),
            limiter,
            config.pipeline.max_in_flight_chunks,
        );

        Ok(Self {
            extractor: Arc::new(PdfExtractor::with_max_size_mb(config.pipeline.max_pdf_size_mb)),
            chunker,
            summarizer,
            citation_extractor: Arc::new(CitationExtractor::new()),
        })
    }

    pub async fn extract(&self, bytes: Vec<u8>, document_id: &str) -> Result<Document> {
        info!("Extracting text from {} ({} bytes)", short_id(document_id), bytes.len());

        let extractor = self.extractor.clone();
        let id = document_id.to_string();
        tokio::task::spawn_blocking(move || extractor.extract(&bytes, &id))
            .await
            .map_err(|e| {
                error!("PDF extraction task panicked: {}", e);
                PipelineError::Extraction(format!("PDF parser failed: {}", e))
            })?
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.chunker.chunk(document)
    }

    /// Summarization and citation extraction are independent, so they run
    /// concurrently. Only summarization can fail the document.
    pub async fn analyze(
        &self,
        document_id: &str,
        chunks: Arc<Vec<Chunk>>,
        cancel: &CancellationToken,
    ) -> Result<DocumentAnalysis> {
        let citation_task = {
            let extractor = self.citation_extractor.clone();
            let chunks = chunks.clone();
            let id = document_id.to_string();
            tokio::task::spawn_blocking(move || extractor.extract(&id, &chunks))
        };

        let (summary, citations) = tokio::join!(
            self.summarizer.summarize(document_id, &chunks, cancel),
            citation_task
        );

        let citations = citations.unwrap_or_else(|e| {
            error!("Citation extraction task panicked: {}", e);
            CitationExtraction::default()
        });
        let summary = summary?;

        debug!(
            "Analyzed {}: {} findings, {} citations, {} dropped chunks",
            short_id(document_id),
            summary.summary.key_findings.len(),
            citations.citations.len(),
            summary.warnings.len()
        );

        Ok(DocumentAnalysis { summary, citations })
    }
}
