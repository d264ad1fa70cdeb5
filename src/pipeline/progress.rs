// file: src/pipeline/progress.rs
// description: progress display and running counters for corpus processing
// reference: uses indicatif for progress bars and tracks processing metrics

use crate::pipeline::run::DocumentResult;
use crate::pipeline::status::PipelineStage;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

const STAGES: [PipelineStage; 5] = [
    PipelineStage::Uploaded,
    PipelineStage::Extracted,
    PipelineStage::Chunked,
    PipelineStage::Summarized,
    PipelineStage::Ready,
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub documents_ready: usize,
    pub documents_failed: usize,
    /// Failures keyed by the stage that was being attempted.
    pub failures_by_stage: BTreeMap<PipelineStage, usize>,
    pub chunks_summarized: usize,
    pub chunks_dropped: usize,
    pub citations_extracted: usize,
    pub bytes_read: u64,
    pub elapsed: Duration,
}

impl PipelineStats {
    pub fn documents_per_second(&self) -> f64 {
        rate(self.documents_ready as f64, self.elapsed)
    }

    pub fn megabytes_per_second(&self) -> f64 {
        rate(self.bytes_read as f64 / 1_048_576.0, self.elapsed)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.documents_ready + self.documents_failed;
        if total == 0 {
            return 0.0;
        }
        self.documents_ready as f64 * 100.0 / total as f64
    }

    pub fn log_summary(&self) {
        info!("=== Review Summary ===");
        info!("Duration: {:.1} seconds", self.elapsed.as_secs_f64());
        info!("Documents ready: {}", self.documents_ready);
        info!("Documents failed: {}", self.documents_failed);
        for (stage, count) in &self.failures_by_stage {
            info!("  while {}: {}", stage, count);
        }
        info!("Success rate: {:.2}%", self.success_rate());
        info!(
            "Chunks summarized: {} ({} dropped)",
            self.chunks_summarized, self.chunks_dropped
        );
        info!("Citations extracted: {}", self.citations_extracted);
        info!(
            "Throughput: {:.2} documents/sec, {:.2} MB/sec",
            self.documents_per_second(),
            self.megabytes_per_second()
        );
        info!("======================");
    }
}

fn rate(amount: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { amount / secs } else { 0.0 }
}

#[derive(Default)]
struct Counters {
    ready: AtomicUsize,
    failed_at: [AtomicUsize; 5],
    chunks_summarized: AtomicUsize,
    chunks_dropped: AtomicUsize,
    citations: AtomicUsize,
    bytes: AtomicU64,
}

/// Shared by every worker of a run; all methods take `&self`.
pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    counters: Counters,
    start_time: Instant,
}

impl ProgressTracker {
    /// Draws to stderr. The bar length grows with [`expect`](Self::expect).
    pub fn new(colored: bool) -> Self {
        Self::build(MultiProgress::new(), colored)
    }

    /// Counts without drawing; used by library callers and tests.
    pub fn hidden() -> Self {
        Self::build(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            false,
        )
    }

    fn build(multi_progress: MultiProgress, colored: bool) -> Self {
        Self {
            main_bar: create_progress_bar(&multi_progress, colored),
            detail_bar: create_detail_bar(&multi_progress),
            counters: Counters::default(),
            start_time: Instant::now(),
        }
    }

    pub fn expect(&self, documents: usize) {
        self.main_bar.inc_length(documents as u64);
    }

    pub fn enter(&self, label: &str, stage: PipelineStage) {
        let verb = match stage {
            PipelineStage::Uploaded => "queued",
            PipelineStage::Extracted => "extracting",
            PipelineStage::Chunked => "chunking",
            PipelineStage::Summarized => "summarizing",
            PipelineStage::Ready => "finishing",
        };
        self.main_bar.set_message(format!("{} {}", verb, label));
    }

    pub fn record_bytes(&self, bytes: usize) {
        self.counters.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_ready(&self, result: &DocumentResult) {
        let c = &self.counters;
        c.ready.fetch_add(1, Ordering::Relaxed);
        c.chunks_summarized
            .fetch_add(result.summary.chunks_summarized, Ordering::Relaxed);
        c.chunks_dropped
            .fetch_add(result.chunk_warnings.len(), Ordering::Relaxed);
        c.citations
            .fetch_add(result.citations.len(), Ordering::Relaxed);
        self.advance();
    }

    pub fn record_failed(&self, stage: PipelineStage) {
        if let Some(i) = STAGES.iter().position(|s| *s == stage) {
            self.counters.failed_at[i].fetch_add(1, Ordering::Relaxed);
        }
        self.advance();
    }

    pub fn finish(&self) {
        if !self.main_bar.is_finished() {
            self.main_bar.finish_with_message("done");
            self.detail_bar.finish_and_clear();
        }
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.counters;
        let failures_by_stage: BTreeMap<_, _> = STAGES
            .iter()
            .zip(&c.failed_at)
            .map(|(stage, count)| (*stage, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        PipelineStats {
            documents_ready: c.ready.load(Ordering::Relaxed),
            documents_failed: failures_by_stage.values().sum(),
            failures_by_stage,
            chunks_summarized: c.chunks_summarized.load(Ordering::Relaxed),
            chunks_dropped: c.chunks_dropped.load(Ordering::Relaxed),
            citations_extracted: c.citations.load(Ordering::Relaxed),
            bytes_read: c.bytes.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }

    fn advance(&self) {
        self.main_bar.inc(1);

        let stats = self.stats();
        self.detail_bar.set_message(format!(
            "Ready: {} | Failed: {} | Citations: {}",
            stats.documents_ready.to_string().green(),
            stats.documents_failed.to_string().red(),
            stats.citations_extracted
        ));
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, colored: bool) -> ProgressBar {
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} papers {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} papers {msg}",
            "=>-",
        )
    };

    let bar = multi_progress.add(ProgressBar::new(0));
    bar.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .expect("Failed to create progress bar template")
            .progress_chars(chars),
    );
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg}")
            .expect("Failed to create detail bar template"),
    );
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pipeline_stats_rates() {
        let stats = PipelineStats {
            documents_ready: 30,
            documents_failed: 10,
            bytes_read: 5 * 1_048_576,
            elapsed: Duration::from_secs(10),
            ..Default::default()
        };

        assert_eq!(stats.documents_per_second(), 3.0);
        assert_eq!(stats.megabytes_per_second(), 0.5);
        assert!((stats.success_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_pipeline_stats_empty() {
        let stats = PipelineStats::default();
        assert_eq!(stats.documents_per_second(), 0.0);
        assert_eq!(stats.megabytes_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_failures_grouped_by_stage() {
        let tracker = ProgressTracker::hidden();
        tracker.expect(3);
        tracker.record_failed(PipelineStage::Extracted);
        tracker.record_failed(PipelineStage::Summarized);
        tracker.record_failed(PipelineStage::Extracted);
        tracker.record_bytes(2048);

        let stats = tracker.stats();
        assert_eq!(stats.documents_failed, 3);
        assert_eq!(stats.failures_by_stage[&PipelineStage::Extracted], 2);
        assert_eq!(stats.failures_by_stage[&PipelineStage::Summarized], 1);
        assert!(!stats.failures_by_stage.contains_key(&PipelineStage::Chunked));
        assert_eq!(stats.bytes_read, 2048);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let tracker = ProgressTracker::hidden();
        tracker.enter("a.pdf", PipelineStage::Extracted);
        tracker.finish();
        tracker.finish();
        assert_eq!(tracker.stats().documents_ready, 0);
    }
}
