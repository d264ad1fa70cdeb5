// file: src/test_support.rs
// description: in-memory PDF fixtures and scripted capability mocks for tests
// reference: https://docs.rs/lopdf

use crate::capability::{CapabilityError, FindingCluster, LanguageModel, SearchCapability};
use crate::models::{Methodology, PartialSummary, SearchResult};
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Builds a PDF with one page per entry; each string becomes one text line.
/// A page with no lines has an empty content stream.
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
            operations.push(Operation::new(
                "Td",
                vec![50.into(), (750 - 14 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content stream encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serializes");
    bytes
}

type SummaryFn = dyn Fn(&str) -> Result<PartialSummary, CapabilityError> + Send + Sync;

/// Scripted language model. Summaries are produced by a closure over the
/// chunk text; clustering returns a fixed response.
pub struct MockModel {
    summarize: Box<SummaryFn>,
    clusters: Mutex<Result<Vec<FindingCluster>, CapabilityError>>,
    delay: Option<Duration>,
    summarize_calls: AtomicUsize,
    cluster_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockModel {
    /// Every chunk summarizes to one finding naming its first word.
    pub fn echo() -> Self {
        Self::with_summarizer(|text| Ok(echo_summary(text)))
    }

    /// Chunks for which `fails` returns true always fail with an HTTP error.
    pub fn failing_when<F>(fails: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::with_summarizer(move |text| {
            if fails(text) {
                Err(CapabilityError::Http("scripted failure".to_string()))
            } else {
                Ok(echo_summary(text))
            }
        })
    }

    pub fn with_summarizer<F>(summarize: F) -> Self
    where
        F: Fn(&str) -> Result<PartialSummary, CapabilityError> + Send + Sync + 'static,
    {
        Self {
            summarize: Box::new(summarize),
            clusters: Mutex::new(Ok(Vec::new())),
            delay: None,
            summarize_calls: AtomicUsize::new(0),
            cluster_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_clusters(self, clusters: Result<Vec<FindingCluster>, CapabilityError>) -> Self {
        *self.clusters.lock().unwrap() = clusters;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn cluster_calls(&self) -> usize {
        self.cluster_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `summarize_chunk` calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

pub fn echo_summary(text: &str) -> PartialSummary {
    let first_word = text.split_whitespace().next().unwrap_or("nothing");
    PartialSummary {
        synopsis: format!("Covers {}.", first_word),
        findings: vec![format!("Finding about {}", first_word)],
        methodology: Methodology::Empirical,
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    async fn summarize_chunk(&self, text: &str) -> Result<PartialSummary, CapabilityError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.summarize)(text)
    }

    async fn cluster_findings(
        &self,
        _findings: &[String],
    ) -> Result<Vec<FindingCluster>, CapabilityError> {
        self.cluster_calls.fetch_add(1, Ordering::SeqCst);
        self.clusters.lock().unwrap().clone()
    }
}

/// Search mock returning a fixed response and counting calls.
pub struct MockSearch {
    response: Result<Vec<SearchResult>, CapabilityError>,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            response: Ok(results),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(CapabilityError::Unavailable("search offline".to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchCapability for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}
