// file: src/capability/mod.rs
// description: narrow traits for the external summarization and search services
// reference: https://docs.rs/async-trait

pub mod arxiv;
pub mod gemini;
pub mod google_search;
pub mod rate_limit;
pub mod retry;

use crate::config::Config;
use crate::models::{PartialSummary, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use arxiv::ArxivSearchClient;
pub use gemini::GeminiClient;
pub use google_search::GoogleSearchClient;
pub use rate_limit::CapabilityLimiter;
pub use retry::{RetryPolicy, call_with_retry};

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("rate limited (429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

impl CapabilityError {
    /// Client errors other than 429 and missing capabilities are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            CapabilityError::Timeout(_)
            | CapabilityError::Malformed(_)
            | CapabilityError::Http(_)
            | CapabilityError::RateLimited { .. } => true,
            CapabilityError::Api { status, .. } => *status >= 500,
            CapabilityError::Unavailable(_) => false,
        }
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CapabilityError::Malformed(err.to_string())
        } else {
            CapabilityError::Http(err.to_string())
        }
    }
}

/// A group of related findings proposed by the language model. `members`
/// index into the list of findings that was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCluster {
    pub topic: String,
    #[serde(default)]
    pub members: Vec<usize>,
    #[serde(default)]
    pub gap: Option<String>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Summarizes one chunk of a paper.
    async fn summarize_chunk(&self, text: &str) -> Result<PartialSummary, CapabilityError>;

    /// Groups findings by topic and suggests what each group leaves open.
    async fn cluster_findings(
        &self,
        findings: &[String],
    ) -> Result<Vec<FindingCluster>, CapabilityError>;
}

#[async_trait]
pub trait SearchCapability: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, CapabilityError>;
}

/// Search sources used for gap enrichment, in query order: Custom Search
/// when both credentials are set, then arXiv unless disabled.
pub fn search_sources(config: &Config) -> crate::error::Result<Vec<Arc<dyn SearchCapability>>> {
    let mut sources: Vec<Arc<dyn SearchCapability>> = Vec::new();

    if config.credentials.has_search() {
        sources.push(Arc::new(GoogleSearchClient::new(
            &config.capability,
            &config.credentials,
            config.gaps.search_results,
        )?));
    } else {
        warn!("Search credentials not configured; skipping Custom Search enrichment");
    }

    if config.gaps.use_arxiv {
        sources.push(Arc::new(ArxivSearchClient::new(
            &config.capability,
            config.gaps.search_results,
        )?));
    }

    Ok(sources)
}
