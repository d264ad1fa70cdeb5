// file: src/capability/google_search.rs
// description: Google Custom Search JSON API client used to enrich research gaps
// reference: https://developers.google.com/custom-search/v1/reference/rest/v1/cse/list

use crate::capability::rate_limit::check_rate_limit_response;
use crate::capability::{CapabilityError, SearchCapability};
use crate::config::{API_KEY_VAR, CapabilityConfig, Credentials, SEARCH_ENGINE_VAR};
use crate::error::{PipelineError, Result};
use crate::models::SearchResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// The API returns at most ten results per request.
const MAX_RESULTS_PER_QUERY: usize = 10;

pub struct GoogleSearchClient {
    client: reqwest::Client,
    search_url: String,
    api_key: String,
    engine_id: String,
    num_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearchClient {
    pub fn new(
        config: &CapabilityConfig,
        credentials: &Credentials,
        num_results: usize,
    ) -> Result<Self> {
        let (Some(api_key), Some(engine_id)) = (
            credentials.google_api_key.clone(),
            credentials.google_search_engine_id.clone(),
        ) else {
            return Err(PipelineError::Config(format!(
                "{} and {} must both be set to use search",
                API_KEY_VAR, SEARCH_ENGINE_VAR
            )));
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            api_key,
            engine_id,
            num_results: num_results.clamp(1, MAX_RESULTS_PER_QUERY),
        })
    }
}

#[async_trait]
impl SearchCapability for GoogleSearchClient {
    fn name(&self) -> &str {
        "google-custom-search"
    }

    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchResult>, CapabilityError> {
        let num = self.num_results.to_string();
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        check_rate_limit_response(&resp)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message: message.chars().take(300).collect(),
            });
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        debug!("Search '{}': {} results", query, body.items.len());
        Ok(into_results(body))
    }
}

fn into_results(body: SearchResponse) -> Vec<SearchResult> {
    body.items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .map(|item| SearchResult::new(item.title, item.link, item.snippet))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_requires_both_credentials() {
        let config = Config::default_config();
        let only_key = Credentials {
            google_api_key: Some("k".to_string()),
            google_search_engine_id: None,
        };
        assert!(GoogleSearchClient::new(&config.capability, &only_key, 3).is_err());
    }

    #[test]
    fn test_num_results_is_clamped() {
        let config = Config::default_config();
        let credentials = Credentials {
            google_api_key: Some("k".to_string()),
            google_search_engine_id: Some("cx".to_string()),
        };
        let client = GoogleSearchClient::new(&config.capability, &credentials, 50).unwrap();
        assert_eq!(client.num_results, MAX_RESULTS_PER_QUERY);
        let client = GoogleSearchClient::new(&config.capability, &credentials, 0).unwrap();
        assert_eq!(client.num_results, 1);
    }

    #[test]
    fn test_response_parsing_skips_items_without_link() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"items": [
                {"title": "Paper", "link": "https://example.org/p", "snippet": "About it"},
                {"title": "No link"}
            ]}"#,
        )
        .unwrap();
        let results = into_results(body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Paper");

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(into_results(empty).is_empty());
    }
}
