// file: src/pipeline/orchestrator.rs
// description: coordinates per-document processing, corpus synthesis, and run state
// reference: orchestrates asynchronous review workflow

use crate::analysis::{CitationGraph, GapIdentifier};
use crate::capability::{
    CapabilityLimiter, GeminiClient, LanguageModel, RetryPolicy, SearchCapability, search_sources,
};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::models::{Citation, Document, ResearchGap, Summary};
use crate::pipeline::processor::{DocumentAnalysis, DocumentProcessor};
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::pipeline::run::{
    DocumentEntry, DocumentResult, PipelineRun, RunSnapshot, SynthesisReport,
};
use crate::pipeline::status::{DocumentStatus, PipelineStage, StatusEvent};
use crate::utils::OperationTimer;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, RwLock, Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

type StageResult<T> = std::result::Result<T, (PipelineStage, PipelineError)>;

/// Where a document enters the pipeline.
enum Input {
    Pdf(Vec<u8>),
    Extracted(Document),
}

enum Admission {
    Memoized(Box<DocumentResult>),
    Started(Job),
}

/// One in-flight attempt at a document within a specific run.
struct Job {
    document_id: String,
    label: String,
    run_id: Uuid,
    cancel: CancellationToken,
}

impl Job {
    fn cancelled(&self, stage: PipelineStage) -> (PipelineStage, PipelineError) {
        (stage, PipelineError::Cancelled(self.document_id.clone()))
    }

    fn check(&self, stage: PipelineStage) -> StageResult<()> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled(stage));
        }
        Ok(())
    }
}

pub struct PipelineOrchestrator {
    config: Config,
    processor: Arc<DocumentProcessor>,
    gap_identifier: GapIdentifier,
    run: RwLock<PipelineRun>,
    synthesis_lock: Mutex<()>,
    cancellations: StdMutex<HashMap<String, (Uuid, CancellationToken)>>,
    semaphore: Semaphore,
    events: broadcast::Sender<StatusEvent>,
    progress: Arc<ProgressTracker>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: Config,
        model: Arc<dyn LanguageModel>,
        sources: Vec<Arc<dyn SearchCapability>>,
    ) -> Result<Self> {
        config.validate()?;

        let limiter = CapabilityLimiter::per_minute(config.capability.requests_per_minute);
        let processor = Arc::new(DocumentProcessor::new(&config, model.clone(), limiter.clone())?);
        let gap_identifier = GapIdentifier::new(
            model,
            sources,
            RetryPolicy::from_config(&config.capability),
            limiter,
            config.gaps.clone(),
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let workers = config.pipeline.parallel_workers.max(1);

        Ok(Self {
            config,
            processor,
            gap_identifier,
            run: RwLock::new(PipelineRun::new()),
            synthesis_lock: Mutex::new(()),
            cancellations: StdMutex::new(HashMap::new()),
            semaphore: Semaphore::new(workers),
            events,
            progress: Arc::new(ProgressTracker::hidden()),
        })
    }

    /// Wires the Gemini model and every configured search source.
    pub fn from_config(config: Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> =
            Arc::new(GeminiClient::new(&config.capability, &config.credentials)?);
        let sources = search_sources(&config)?;
        if sources.is_empty() {
            warn!("No search sources configured; research gaps will not be enriched");
        }

        Self::new(config, model, sources)
    }

    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one PDF through extraction, chunking and analysis. Identical
    /// bytes that already reached Ready return the stored result.
    pub async fn process(&self, label: &str, bytes: Vec<u8>) -> Result<DocumentResult> {
        let document_id = Document::compute_id(&bytes);
        self.run_job(&document_id, label, Input::Pdf(bytes)).await
    }

    /// Same pipeline, starting from already extracted text.
    pub async fn process_document(
        &self,
        label: &str,
        document: Document,
    ) -> Result<DocumentResult> {
        let document_id = document.id.clone();
        self.run_job(&document_id, label, Input::Extracted(document))
            .await
    }

    /// Processes many files concurrently and returns their results in input order.
    pub async fn process_corpus(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Vec<(String, Result<DocumentResult>)> {
        let workers = self.config.pipeline.parallel_workers.max(1);
        info!("Processing {} papers with {} workers", files.len(), workers);
        self.progress.expect(files.len());

        let tasks: Vec<_> = files
            .into_iter()
            .enumerate()
            .map(|(position, (label, bytes))| async move {
                let result = self.process(&label, bytes).await;
                (position, label, result)
            })
            .collect();

        let mut results: Vec<_> = stream::iter(tasks).buffer_unordered(workers).collect().await;
        results.sort_by_key(|(position, _, _)| *position);

        results
            .into_iter()
            .map(|(_, label, result)| (label, result))
            .collect()
    }

    async fn run_job(
        &self,
        document_id: &str,
        label: &str,
        input: Input,
    ) -> Result<DocumentResult> {
        let job = match self.admit(document_id, label).await? {
            Admission::Memoized(result) => {
                info!("{} already processed; returning stored result", label);
                return Ok(*result);
            }
            Admission::Started(job) => job,
        };

        let outcome = match self.semaphore.acquire().await {
            Ok(_permit) => self.drive(&job, input).await,
            Err(e) => Err((
                PipelineStage::Extracted,
                PipelineError::Validation(format!("worker pool closed: {}", e)),
            )),
        };

        self.release_token(&job);

        match outcome {
            Ok(result) => {
                self.progress.record_ready(&result);
                info!(
                    "{} ready: {} findings, {} citations",
                    job.label,
                    result.summary.key_findings.len(),
                    result.citations.len()
                );
                Ok(result)
            }
            Err((stage, err)) => {
                self.progress.record_failed(stage);
                self.fail(&job, stage, &err).await;
                Err(err)
            }
        }
    }

    async fn admit(&self, document_id: &str, label: &str) -> Result<Admission> {
        let mut run = self.run.write().await;

        if let Some(entry) = run.entry(document_id) {
            if let Some(result) = entry.result() {
                return Ok(Admission::Memoized(Box::new(result)));
            }
            if !entry.status.is_failed() {
                return Err(PipelineError::Validation(format!(
                    "{} is already being processed",
                    label
                )));
            }
            debug!("Retrying previously failed document {}", label);
        }

        let run_id = run.id;
        let entry = run.start_entry(document_id, label);
        let cancel = CancellationToken::new();
        self.tokens()
            .insert(document_id.to_string(), (run_id, cancel.clone()));
        self.emit(entry);

        Ok(Admission::Started(Job {
            document_id: document_id.to_string(),
            label: label.to_string(),
            run_id,
            cancel,
        }))
    }

    async fn drive(&self, job: &Job, input: Input) -> StageResult<DocumentResult> {
        let document = match input {
            Input::Pdf(bytes) => {
                job.check(PipelineStage::Extracted)?;
                self.progress.record_bytes(bytes.len());
                self.progress.enter(&job.label, PipelineStage::Extracted);

                let timer = OperationTimer::new(&format!("extract {}", job.label));
                let extraction = self.processor.extract(bytes, &job.document_id);
                let document = tokio::select! {
                    biased;
                    _ = job.cancel.cancelled() => {
                        return Err(job.cancelled(PipelineStage::Extracted));
                    }
                    document = extraction => document.map_err(|e| (PipelineStage::Extracted, e))?,
                };
                timer.finish_with_count(document.pages.len());
                document
            }
            Input::Extracted(document) => document,
        };

        let chunks = Arc::new(self.processor.chunk(&document));
        self.commit(job, PipelineStage::Extracted, |entry| {
            entry.document = Some(document);
        })
        .await?;

        job.check(PipelineStage::Chunked)?;
        self.commit(job, PipelineStage::Chunked, |entry| {
            entry.chunks = chunks.as_ref().clone();
        })
        .await?;

        job.check(PipelineStage::Summarized)?;
        self.progress.enter(&job.label, PipelineStage::Summarized);
        let DocumentAnalysis { summary, citations } = self
            .processor
            .analyze(&job.document_id, chunks, &job.cancel)
            .await
            .map_err(|e| (PipelineStage::Summarized, e))?;

        self.commit(job, PipelineStage::Summarized, |entry| {
            entry.summary = Some(summary.summary);
            entry.chunk_warnings = summary.warnings;
            entry.citations = citations.citations;
            entry.citation_warnings = citations.warnings;
        })
        .await?;

        job.check(PipelineStage::Ready)?;
        self.commit(job, PipelineStage::Ready, |entry| entry.result())
            .await?
            .ok_or_else(|| {
                (
                    PipelineStage::Ready,
                    PipelineError::Validation(format!("{} finished without a summary", job.label)),
                )
            })
    }

    /// Moves the entry to `stage` and applies the stage's artifacts. Refused
    /// once the job is cancelled or its run has been reset.
    async fn commit<T>(
        &self,
        job: &Job,
        stage: PipelineStage,
        apply: impl FnOnce(&mut DocumentEntry) -> T,
    ) -> StageResult<T> {
        let mut run = self.run.write().await;
        if run.id != job.run_id || job.cancel.is_cancelled() {
            return Err(job.cancelled(stage));
        }
        if stage == PipelineStage::Ready {
            run.invalidate_synthesis();
        }

        let entry = run
            .entry_mut(&job.document_id)
            .ok_or_else(|| (stage, PipelineError::UnknownDocument(job.document_id.clone())))?;
        entry.status = DocumentStatus::at(stage);
        entry.updated_at = Utc::now();
        let applied = apply(entry);
        self.emit(entry);

        Ok(applied)
    }

    async fn fail(&self, job: &Job, stage: PipelineStage, err: &PipelineError) {
        warn!("{} failed at {}: {}", job.label, stage, err);

        let mut run = self.run.write().await;
        if run.id != job.run_id {
            debug!("Discarding failure of {} from a previous run", job.label);
            return;
        }

        if let Some(entry) = run.entry_mut(&job.document_id) {
            entry.status = DocumentStatus::failed(stage, err.to_string());
            entry.updated_at = Utc::now();
            self.emit(entry);
        }
    }

    /// Builds the citation graph and research gaps over every Ready
    /// document. Concurrent calls run one after another.
    pub async fn synthesize(&self) -> Result<SynthesisReport> {
        let _guard = self.synthesis_lock.lock().await;
        let timer = OperationTimer::new("synthesis");

        let (run_id, version, ready): (Uuid, u64, Vec<(Document, Vec<Citation>, Summary)>) = {
            let run = self.run.read().await;
            let ready = run
                .ready_entries()
                .filter_map(|entry| {
                    Some((
                        entry.document.clone()?,
                        entry.citations.clone(),
                        entry.summary.clone()?,
                    ))
                })
                .collect();
            (run.id, run.corpus_version(), ready)
        };

        info!("Synthesizing across {} ready documents", ready.len());

        let graph = CitationGraph::build(
            ready
                .iter()
                .map(|(document, citations, _)| (document, citations.as_slice())),
        )?;
        let summaries: Vec<Summary> = ready.iter().map(|(_, _, summary)| summary.clone()).collect();
        let gaps = self.gap_identifier.identify(&summaries, &graph).await;
        let generated_at = Utc::now();

        {
            let mut run = self.run.write().await;
            if run.id != run_id {
                return Err(PipelineError::Synthesis(
                    "corpus was reset during synthesis".to_string(),
                ));
            }
            if !run.record_synthesis(version, graph.clone(), gaps.clone(), generated_at) {
                info!("Ready documents changed during synthesis; result not stored");
            }
        }

        info!(
            "Citation graph: {} nodes, {} edges; {} research gaps",
            graph.node_count(),
            graph.edge_count(),
            gaps.len()
        );
        timer.finish_with_count(ready.len());

        Ok(SynthesisReport {
            documents: ready.len(),
            graph,
            gaps,
            generated_at,
        })
    }

    /// Cancels in-flight work for a document. Returns false when nothing
    /// was running.
    pub fn cancel(&self, document_id: &str) -> bool {
        match self.tokens().get(document_id) {
            Some((_, token)) => {
                info!("Cancelling {}", &document_id[..document_id.len().min(12)]);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Starts a new corpus. In-flight work is cancelled and never commits.
    pub async fn reset(&self) {
        let mut run = self.run.write().await;
        for (_, (_, token)) in self.tokens().drain() {
            token.cancel();
        }
        *run = PipelineRun::new();
        info!("Corpus reset; run {}", run.id);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self, document_id: &str) -> Result<DocumentStatus> {
        self.with_entry(document_id, |entry| entry.status.clone()).await
    }

    /// Latest status of every document, in upload order.
    pub async fn statuses(&self) -> Vec<StatusEvent> {
        let run = self.run.read().await;
        run.entries().map(status_event).collect()
    }

    pub async fn document(&self, document_id: &str) -> Result<Option<Document>> {
        self.with_entry(document_id, |entry| entry.document.clone()).await
    }

    pub async fn summary(&self, document_id: &str) -> Result<Option<Summary>> {
        self.with_entry(document_id, |entry| entry.summary.clone()).await
    }

    pub async fn citations(&self, document_id: &str) -> Result<Vec<Citation>> {
        self.with_entry(document_id, |entry| entry.citations.clone()).await
    }

    pub async fn graph(&self) -> Option<CitationGraph> {
        self.run.read().await.graph.clone()
    }

    pub async fn gaps(&self) -> Vec<ResearchGap> {
        self.run.read().await.gaps.clone()
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        self.run.read().await.snapshot()
    }

    pub fn stats(&self) -> PipelineStats {
        self.progress.stats()
    }

    async fn with_entry<T>(
        &self,
        document_id: &str,
        read: impl FnOnce(&DocumentEntry) -> T,
    ) -> Result<T> {
        let run = self.run.read().await;
        run.entry(document_id)
            .map(read)
            .ok_or_else(|| PipelineError::UnknownDocument(document_id.to_string()))
    }

    fn emit(&self, entry: &DocumentEntry) {
        // No subscribers is not an error.
        let _ = self.events.send(status_event(entry));
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<String, (Uuid, CancellationToken)>> {
        self.cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn release_token(&self, job: &Job) {
        let mut tokens = self.tokens();
        if matches!(tokens.get(&job.document_id), Some((run_id, _)) if *run_id == job.run_id) {
            tokens.remove(&job.document_id);
        }
    }
}

fn status_event(entry: &DocumentEntry) -> StatusEvent {
    StatusEvent {
        document_id: entry.document_id.clone(),
        label: entry.label.clone(),
        status: entry.status.clone(),
        timestamp: entry.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NodeId;
    use crate::config::ChunkingConfig;
    use crate::models::PageConfidence;
    use crate::test_support::{MockModel, pdf_with_pages};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const GRAPH_PAPER: &str = "Graph Methods for Citation Analysis\n\
        We build on neural summaries [1].\n\
        References\n\
        [1] J. Smith. Neural summaries of scientific text. In Proc. ACL, 2021.";

    const SUMMARY_PAPER: &str = "Neural Summaries of Scientific Text\n\
        Citation graphs guide what to read [1].\n\
        References\n\
        [1] A. Jones. Graph methods for citation analysis. In Proc. KDD, 2020.";

    fn test_config() -> Config {
        let mut config = Config::default_config();
        config.capability.retry_backoff_ms = 1;
        config.capability.requests_per_minute = 6000;
        config
    }

    fn orchestrator(model: Arc<MockModel>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(test_config(), model, Vec::new()).unwrap()
    }

    fn five_segment_document() -> Document {
        let text: String = ["A", "B", "C", "D", "E"].iter().map(|s| s.repeat(100)).collect();
        Document::from_page_texts(&[text])
    }

    fn five_segment_orchestrator(model: Arc<MockModel>) -> PipelineOrchestrator {
        let mut config = test_config();
        config.chunking = ChunkingConfig {
            max_chunk_size: 100,
            overlap_size: 0,
        };
        PipelineOrchestrator::new(config, model, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn test_pdf_with_empty_last_page_is_ready() {
        let bytes = pdf_with_pages(&[
            &["Sparse Attention for Long Documents", "We study attention."],
            &["Results improve recall."],
            &[],
        ]);
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));

        let result = orchestrator.process("sparse.pdf", bytes).await.unwrap();

        assert_eq!(result.document.pages.len(), 3);
        assert_eq!(result.document.pages[0].confidence, PageConfidence::High);
        assert_eq!(result.document.pages[2].confidence, PageConfidence::Low);
        assert!(orchestrator.status(&result.document_id).await.unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_two_failed_chunks_still_ready() {
        let model = Arc::new(MockModel::failing_when(|text| {
            text.starts_with('B') || text.starts_with('D')
        }));
        let orchestrator = five_segment_orchestrator(model);

        let result = orchestrator
            .process_document("segments", five_segment_document())
            .await
            .unwrap();

        let dropped: Vec<usize> = result.chunk_warnings.iter().map(|w| w.chunk_index).collect();
        assert_eq!(dropped, vec![1, 3]);
        assert_eq!(result.summary.chunks_summarized, 3);

        let stats = orchestrator.stats();
        assert_eq!(stats.chunks_summarized, 3);
        assert_eq!(stats.chunks_dropped, 2);
    }

    #[tokio::test]
    async fn test_all_chunks_failing_fails_at_summarization() {
        let orchestrator = five_segment_orchestrator(Arc::new(MockModel::failing_when(|_| true)));
        let document = five_segment_document();
        let id = document.id.clone();

        let result = orchestrator.process_document("segments", document).await;
        assert!(matches!(result, Err(PipelineError::Summarization { attempted: 5, .. })));

        let status = orchestrator.status(&id).await.unwrap();
        assert!(status.is_failed());
        assert_eq!(status.stage(), PipelineStage::Summarized);
        assert_eq!(orchestrator.summary(&id).await.unwrap(), None);
        assert_eq!(orchestrator.stats().documents_failed, 1);
    }

    #[tokio::test]
    async fn test_failed_extraction_does_not_block_synthesis() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));

        let failed = orchestrator.process("empty.pdf", Vec::new()).await;
        assert!(matches!(failed, Err(PipelineError::Extraction(_))));
        let empty_id = Document::compute_id(&[]);
        assert_eq!(
            orchestrator.status(&empty_id).await.unwrap().stage(),
            PipelineStage::Extracted
        );

        orchestrator
            .process_document("graph.pdf", Document::from_page_texts(&[GRAPH_PAPER]))
            .await
            .unwrap();

        let report = orchestrator.synthesize().await.unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.graph.corpus_documents().len(), 1);
    }

    #[tokio::test]
    async fn test_synthesize_with_no_ready_documents() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        let report = orchestrator.synthesize().await.unwrap();

        assert_eq!(report.documents, 0);
        assert_eq!(report.graph.node_count(), 0);
        assert!(report.gaps.is_empty());
    }

    #[tokio::test]
    async fn test_mutual_citation_produces_two_edges() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        let graph_paper = Document::from_page_texts(&[GRAPH_PAPER]);
        let summary_paper = Document::from_page_texts(&[SUMMARY_PAPER]);
        let (a, b) = (graph_paper.id.clone(), summary_paper.id.clone());

        orchestrator.process_document("graph.pdf", graph_paper).await.unwrap();
        orchestrator.process_document("summaries.pdf", summary_paper).await.unwrap();

        let report = orchestrator.synthesize().await.unwrap();
        assert_eq!(report.graph.edge_count(), 2);

        let from_a = report.graph.neighbors(&NodeId::corpus(&a));
        assert_eq!(from_a.outgoing, vec![NodeId::corpus(&b)]);
        assert_eq!(from_a.incoming, vec![NodeId::corpus(&b)]);

        assert_eq!(orchestrator.graph().await.unwrap().edge_count(), 2);
    }

    #[tokio::test]
    async fn test_identical_bytes_are_memoized() {
        let model = Arc::new(MockModel::echo());
        let orchestrator = orchestrator(model.clone());
        let bytes = pdf_with_pages(&[&["Sparse Attention for Long Documents", "Body."]]);

        let first = orchestrator.process("a.pdf", bytes.clone()).await.unwrap();
        let calls = model.summarize_calls();
        let second = orchestrator.process("copy.pdf", bytes).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(model.summarize_calls(), calls);
        assert_eq!(orchestrator.statuses().await.len(), 1);
    }

    #[tokio::test]
    async fn test_status_events_follow_the_lifecycle() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        let mut events = orchestrator.subscribe();

        orchestrator
            .process_document("graph.pdf", Document::from_page_texts(&[GRAPH_PAPER]))
            .await
            .unwrap();

        let mut stages = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.label, "graph.pdf");
            stages.push(event.status.stage());
        }
        assert_eq!(
            stages,
            vec![
                PipelineStage::Uploaded,
                PipelineStage::Extracted,
                PipelineStage::Chunked,
                PipelineStage::Summarized,
                PipelineStage::Ready,
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_document_never_commits() {
        let model = Arc::new(MockModel::echo().with_delay(Duration::from_secs(30)));
        let orchestrator = Arc::new(orchestrator(model));
        let document = Document::from_page_texts(&[GRAPH_PAPER]);
        let id = document.id.clone();
        let mut events = orchestrator.subscribe();

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.process_document("slow.pdf", document).await })
        };

        loop {
            let event = events.recv().await.unwrap();
            if event.status.stage() == PipelineStage::Chunked {
                break;
            }
        }
        assert!(orchestrator.cancel(&id));

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled(_))));
        assert!(orchestrator.status(&id).await.unwrap().is_failed());
        assert_eq!(orchestrator.summary(&id).await.unwrap(), None);
        assert!(!orchestrator.cancel(&id));
    }

    #[tokio::test]
    async fn test_new_ready_document_clears_previous_synthesis() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        orchestrator
            .process_document("graph.pdf", Document::from_page_texts(&[GRAPH_PAPER]))
            .await
            .unwrap();
        orchestrator.synthesize().await.unwrap();
        assert!(orchestrator.graph().await.is_some());

        orchestrator
            .process_document("summary.pdf", Document::from_page_texts(&[SUMMARY_PAPER]))
            .await
            .unwrap();

        assert!(orchestrator.graph().await.is_none());
        assert!(orchestrator.gaps().await.is_empty());
        assert!(orchestrator.snapshot().await.synthesized_at.is_none());

        let report = orchestrator.synthesize().await.unwrap();
        assert_eq!(report.documents, 2);
        assert_eq!(orchestrator.graph().await.unwrap().corpus_documents().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_document_keeps_current_synthesis() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        orchestrator
            .process_document("graph.pdf", Document::from_page_texts(&[GRAPH_PAPER]))
            .await
            .unwrap();
        orchestrator.synthesize().await.unwrap();

        assert!(orchestrator.process("broken.pdf", b"not a pdf".to_vec()).await.is_err());
        assert!(orchestrator.graph().await.is_some());
    }

    #[tokio::test]
    async fn test_reset_clears_the_corpus() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        let document = Document::from_page_texts(&[GRAPH_PAPER]);
        let id = document.id.clone();

        orchestrator.process_document("graph.pdf", document).await.unwrap();
        orchestrator.synthesize().await.unwrap();
        orchestrator.reset().await;

        assert!(orchestrator.statuses().await.is_empty());
        assert!(orchestrator.graph().await.is_none());
        assert!(matches!(
            orchestrator.status(&id).await,
            Err(PipelineError::UnknownDocument(_))
        ));
    }

    #[tokio::test]
    async fn test_corpus_runs_at_most_parallel_workers_documents() {
        let model = Arc::new(MockModel::echo().with_delay(Duration::from_millis(20)));
        let mut config = test_config();
        config.pipeline.parallel_workers = 2;
        config.pipeline.max_in_flight_chunks = 1;
        let orchestrator = Arc::new(PipelineOrchestrator::new(config, model.clone(), Vec::new()).unwrap());

        let lines: Vec<String> = (1..=5)
            .map(|i| format!("Attention study number {} of five", i))
            .collect();
        let files: Vec<(String, Vec<u8>)> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| (format!("paper{}.pdf", i), pdf_with_pages(&[&[line.as_str()]])))
            .collect();

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.process_corpus(files).await })
        };
        let results = handle.await.unwrap();

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        assert_eq!(model.summarize_calls(), 5);
        // One chunk per document and one chunk call per document at a time.
        assert!(model.peak_in_flight() <= 2, "peak {}", model.peak_in_flight());
    }

    #[tokio::test]
    async fn test_process_corpus_keeps_input_order() {
        let orchestrator = orchestrator(Arc::new(MockModel::echo()));
        let files = vec![
            ("broken.pdf".to_string(), b"not a pdf".to_vec()),
            (
                "good.pdf".to_string(),
                pdf_with_pages(&[&["Sparse Attention for Long Documents", "Body."]]),
            ),
        ];

        let results = orchestrator.process_corpus(files).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "broken.pdf");
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, "good.pdf");
        assert!(results[1].1.is_ok());

        let stats = orchestrator.stats();
        assert_eq!(stats.documents_ready, 1);
        assert_eq!(stats.documents_failed, 1);
    }
}
