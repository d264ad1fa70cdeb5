// file: src/capability/arxiv.rs
// description: arXiv query API client used as a keyless search source for research gaps
// reference: https://info.arxiv.org/help/api/user-manual.html

use crate::capability::rate_limit::check_rate_limit_response;
use crate::capability::{CapabilityError, SearchCapability};
use crate::config::CapabilityConfig;
use crate::error::{PipelineError, Result};
use crate::models::SearchResult;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

/// Keeps queries polite; the API allows far more but pages slowly.
const MAX_RESULTS_PER_QUERY: usize = 10;

pub struct ArxivSearchClient {
    client: reqwest::Client,
    query_url: String,
    max_results: usize,
}

impl ArxivSearchClient {
    pub fn new(config: &CapabilityConfig, max_results: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            query_url: config.arxiv_url.clone(),
            max_results: max_results.clamp(1, MAX_RESULTS_PER_QUERY),
        })
    }
}

#[async_trait]
impl SearchCapability for ArxivSearchClient {
    fn name(&self) -> &str {
        "arxiv"
    }

    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchResult>, CapabilityError> {
        let search_query = format!("all:{}", query);
        let max_results = self.max_results.to_string();
        let resp = self
            .client
            .get(&self.query_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
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

        let body = resp.text().await?;
        let results = parse_feed(&body)?;
        debug!("arXiv '{}': {} results", query, results.len());
        Ok(results)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Name,
}

#[derive(Default)]
struct Entry {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    name: String,
}

impl Entry {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Published => self.published.push_str(text),
            Field::Name => self.name.push_str(text),
        }
    }

    fn into_result(self) -> Option<SearchResult> {
        let id = self.id.trim();
        if id.is_empty() {
            return None;
        }
        let link = match id.strip_prefix("http://") {
            Some(rest) => format!("https://{}", rest),
            None => id.to_string(),
        };
        let published = self
            .published
            .trim()
            .get(..10)
            .map(str::to_string);

        Some(
            SearchResult::new(collapse(&self.title), link, collapse(&self.summary))
                .with_authors(self.authors)
                .with_published(published),
        )
    }
}

/// Titles and abstracts arrive hard-wrapped.
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads the Atom feed returned by the query API. Entries without an id are
/// skipped; a feed that is not well-formed XML is `Malformed`.
pub fn parse_feed(xml: &str) -> std::result::Result<Vec<SearchResult>, CapabilityError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut results = Vec::new();
    let mut entry: Option<Entry> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match (e.local_name().as_ref(), entry.is_some()) {
                (b"entry", _) => entry = Some(Entry::default()),
                (b"id", true) => field = Some(Field::Id),
                (b"title", true) => field = Some(Field::Title),
                (b"summary", true) => field = Some(Field::Summary),
                (b"published", true) => field = Some(Field::Published),
                (b"author", true) => in_author = true,
                (b"name", true) if in_author => field = Some(Field::Name),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = e
                        .unescape()
                        .map_err(|err| CapabilityError::Malformed(err.to_string()))?;
                    current.push(f, &text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(result) = entry.take().and_then(Entry::into_result) {
                        results.push(result);
                    }
                    in_author = false;
                    field = None;
                }
                b"author" => {
                    if let Some(current) = entry.as_mut() {
                        let name = collapse(&std::mem::take(&mut current.name));
                        if !name.is_empty() {
                            current.authors.push(name);
                        }
                    }
                    in_author = false;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CapabilityError::Malformed(format!(
                    "arXiv feed at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(results)
}
