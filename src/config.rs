// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const SEARCH_ENGINE_VAR: &str = "GOOGLE_SEARCH_ENGINE_ID";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub capability: CapabilityConfig,
    pub chunking: ChunkingConfig,
    pub pipeline: PipelineConfig,
    pub gaps: GapConfig,
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapabilityConfig {
    pub model: String,
    pub generation_url: String,
    pub search_url: String,
    #[serde(default = "default_arxiv_url")]
    pub arxiv_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// 0 disables pacing.
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChunkingConfig {
    pub max_chunk_size: usize,
    pub overlap_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub parallel_workers: usize,
    pub max_in_flight_chunks: usize,
    pub max_pdf_size_mb: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GapConfig {
    pub max_gaps: usize,
    pub min_external_citations: usize,
    pub enrich_top_n: usize,
    /// Results kept per search source for each enriched gap.
    pub search_results: usize,
    #[serde(default = "default_use_arxiv")]
    pub use_arxiv: bool,
}

fn default_arxiv_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_use_arxiv() -> bool {
    true
}

/// Secrets resolved once at process start.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            google_api_key: read(API_KEY_VAR),
            google_search_engine_id: read(SEARCH_ENGINE_VAR),
        }
    }

    pub fn has_search(&self) -> bool {
        self.google_api_key.is_some() && self.google_search_engine_id.is_some()
    }
}

impl CapabilityConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
            overlap_size: 200,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LIT_REVIEW")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.credentials = Credentials::from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        dotenv().ok();

        Self {
            capability: CapabilityConfig {
                model: "gemini-1.5-flash".to_string(),
                generation_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                search_url: "https://www.googleapis.com/customsearch/v1".to_string(),
                arxiv_url: default_arxiv_url(),
                request_timeout_secs: 60,
                max_retries: 2,
                retry_backoff_ms: 500,
                requests_per_minute: 60,
            },
            chunking: ChunkingConfig::default(),
            pipeline: PipelineConfig {
                parallel_workers: 4,
                max_in_flight_chunks: 4,
                max_pdf_size_mb: 50,
            },
            gaps: GapConfig {
                max_gaps: 10,
                min_external_citations: 2,
                enrich_top_n: 3,
                search_results: 2,
                use_arxiv: true,
            },
            credentials: Credentials::from_env(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.parallel_workers == 0 {
            return Err(PipelineError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_in_flight_chunks == 0 {
            return Err(PipelineError::Config(
                "max_in_flight_chunks must be greater than 0".to_string(),
            ));
        }

        if self.chunking.max_chunk_size == 0 {
            return Err(PipelineError::Config(
                "max_chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.chunking.overlap_size >= self.chunking.max_chunk_size {
            return Err(PipelineError::Config(format!(
                "overlap_size ({}) must be smaller than max_chunk_size ({})",
                self.chunking.overlap_size, self.chunking.max_chunk_size
            )));
        }

        if self.capability.request_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (key, url) in [
            ("generation_url", &self.capability.generation_url),
            ("search_url", &self.capability.search_url),
            ("arxiv_url", &self.capability.arxiv_url),
        ] {
            Validator::validate_url(url)
                .map_err(|e| PipelineError::Config(format!("{}: {}", key, e)))?;
        }

        Ok(())
    }
}
