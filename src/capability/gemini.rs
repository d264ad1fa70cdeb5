// file: src/capability/gemini.rs
// description: Google Generative Language API client for chunk summaries and topic clustering
// reference: https://ai.google.dev/api/generate-content

use crate::capability::rate_limit::check_rate_limit_response;
use crate::capability::{CapabilityError, FindingCluster, LanguageModel};
use crate::config::{API_KEY_VAR, CapabilityConfig, Credentials};
use crate::error::{PipelineError, Result};
use crate::models::{Methodology, PartialSummary};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const SUMMARY_INSTRUCTION: &str = "You summarize excerpts of academic papers. \
Reply with a JSON object with the fields \"synopsis\" (two or three sentences), \
\"findings\" (a list of concise, self-contained claims made in the excerpt) and \
\"methodology\" (one of \"empirical\", \"theoretical\", \"review\" or \"unknown\"). \
Only report what the excerpt states.";

const CLUSTER_INSTRUCTION: &str = "You group research findings from several papers by topic. \
Each finding is given with its index. Reply with a JSON object {\"clusters\": [...]} where \
every cluster has \"topic\" (a short label), \"members\" (the indices of its findings) and \
\"gap\" (one sentence naming what the findings leave unexplored, or null).";

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    #[serde(default, alias = "summary")]
    synopsis: String,
    #[serde(default, alias = "key_findings")]
    findings: Vec<String>,
    #[serde(default)]
    methodology: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClusterPayload {
    Wrapped { clusters: Vec<FindingCluster> },
    Bare(Vec<FindingCluster>),
}

impl GeminiClient {
    /// Fails with a configuration error when no API key was resolved.
    pub fn new(config: &CapabilityConfig, credentials: &Credentials) -> Result<Self> {
        let api_key = credentials.google_api_key.clone().ok_or_else(|| {
            PipelineError::Config(format!(
                "{} is not set; the summarization capability is unavailable",
                API_KEY_VAR
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.generation_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate_json(
        &self,
        instruction: &str,
        prompt: String,
    ) -> std::result::Result<String, CapabilityError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.2,
                "responseMimeType": "application/json",
            }
        });

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        check_rate_limit_response(&resp)?;

        let status = resp.status().as_u16();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        if status >= 400 {
            let message = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error")
                .to_string();
            return Err(CapabilityError::Api { status, message });
        }

        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| CapabilityError::Malformed("response has no candidate text".to_string()))?;

        debug!("{}: {} chars of model output", self.model, text.len());
        Ok(text.to_string())
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn summarize_chunk(
        &self,
        text: &str,
    ) -> std::result::Result<PartialSummary, CapabilityError> {
        let output = self
            .generate_json(SUMMARY_INSTRUCTION, format!("Excerpt:\n\n{}", text))
            .await?;
        parse_partial_summary(&output)
    }

    async fn cluster_findings(
        &self,
        findings: &[String],
    ) -> std::result::Result<Vec<FindingCluster>, CapabilityError> {
        let listing = findings
            .iter()
            .enumerate()
            .map(|(i, finding)| format!("{}. {}", i, finding))
            .collect::<Vec<_>>()
            .join("\n");

        let output = self
            .generate_json(CLUSTER_INSTRUCTION, format!("Findings:\n{}", listing))
            .await?;
        parse_clusters(&output)
    }
}

/// Removes a surrounding markdown code fence, if the model added one.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_partial_summary(output: &str) -> std::result::Result<PartialSummary, CapabilityError> {
    let payload: SummaryPayload = serde_json::from_str(strip_code_fences(output))
        .map_err(|e| CapabilityError::Malformed(format!("summary JSON: {}", e)))?;

    if payload.synopsis.trim().is_empty() && payload.findings.is_empty() {
        return Err(CapabilityError::Malformed(
            "summary has neither synopsis nor findings".to_string(),
        ));
    }

    Ok(PartialSummary {
        synopsis: payload.synopsis.trim().to_string(),
        findings: payload
            .findings
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
        methodology: payload
            .methodology
            .as_deref()
            .map(Methodology::from_label)
            .unwrap_or_default(),
    })
}

pub fn parse_clusters(output: &str) -> std::result::Result<Vec<FindingCluster>, CapabilityError> {
    let payload: ClusterPayload = serde_json::from_str(strip_code_fences(output))
        .map_err(|e| CapabilityError::Malformed(format!("cluster JSON: {}", e)))?;

    Ok(match payload {
        ClusterPayload::Wrapped { clusters } => clusters,
        ClusterPayload::Bare(clusters) => clusters,
    })
}
