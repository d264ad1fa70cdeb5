// file: src/analysis/summarizer.rs
// description: bounded-concurrency chunk summarization folded into one document summary
// reference: https://docs.rs/futures/latest/futures/stream/trait.StreamExt.html#method.buffered

use crate::capability::{CapabilityLimiter, LanguageModel, RetryPolicy, call_with_retry};
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Summary, SummaryAccumulator};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A chunk that was dropped from the summary after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkWarning {
    pub chunk_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: Summary,
    pub warnings: Vec<ChunkWarning>,
}

pub struct ChunkSummarizer {
    model: Arc<dyn LanguageModel>,
    policy: RetryPolicy,
    limiter: Option<CapabilityLimiter>,
    max_in_flight: usize,
}

impl ChunkSummarizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        policy: RetryPolicy,
        limiter: Option<CapabilityLimiter>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            model,
            policy,
            limiter,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Summarizes every chunk, at most `max_in_flight` at a time, and merges
    /// the partials in chunk order. Fails only when no chunk succeeds or the
    /// token is cancelled.
    pub async fn summarize(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome> {
        if chunks.is_empty() {
            return Err(PipelineError::Summarization {
                attempted: 0,
                last_error: "document produced no chunks".to_string(),
            });
        }

        let total = chunks.len();
        // Collected up front so the returned future stays `Send` for `tokio::spawn`.
        let calls: Vec<_> = chunks
            .iter()
            .map(|chunk| async move {
                let label = format!("summarize chunk {}/{}", chunk.index + 1, total);
                let result = call_with_retry(&self.policy, self.limiter.as_ref(), &label, || {
                    self.model.summarize_chunk(&chunk.text)
                })
                .await;
                (chunk.index, result)
            })
            .collect();
        let work = stream::iter(calls)
            .buffered(self.max_in_flight)
            .collect::<Vec<_>>();

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Summarization of {} cancelled", document_id);
                return Err(PipelineError::Cancelled(document_id.to_string()));
            }
            results = work => results,
        };

        let mut accumulator = SummaryAccumulator::new();
        let mut warnings = Vec::new();
        let mut last_error = String::new();

        for (chunk_index, result) in results {
            match result {
                Ok(partial) => {
                    debug!(
                        "Chunk {} of {}: {} findings",
                        chunk_index,
                        document_id,
                        partial.findings.len()
                    );
                    accumulator =
                        accumulator.combine(SummaryAccumulator::from_partial(chunk_index, partial));
                }
                Err(err) => {
                    warn!("Dropping chunk {} of {}: {}", chunk_index, document_id, err);
                    last_error = err.to_string();
                    warnings.push(ChunkWarning {
                        chunk_index,
                        reason: last_error.clone(),
                    });
                }
            }
        }

        if accumulator.chunks() == 0 {
            return Err(PipelineError::Summarization {
                attempted: total,
                last_error,
            });
        }

        Ok(SummaryOutcome {
            summary: accumulator.finish(document_id),
            warnings,
        })
    }
}
