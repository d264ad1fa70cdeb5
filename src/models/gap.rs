// file: src/models/gap.rs
// description: derived research gap suggestions
// reference: corpus-level synthesis output

use crate::models::SearchResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchGap {
    pub description: String,
    pub topic: Option<String>,
    /// Supporting document ids in corpus order.
    pub supporting_documents: Vec<String>,
    /// Always within [0.0, 1.0].
    pub confidence: f64,
    #[serde(default)]
    pub related_sources: Vec<SearchResult>,
}

impl ResearchGap {
    pub fn new(description: String, supporting_documents: Vec<String>, confidence: f64) -> Self {
        Self {
            description,
            topic: None,
            supporting_documents,
            confidence: confidence.clamp(0.0, 1.0),
            related_sources: Vec::new(),
        }
    }

    pub fn with_topic(mut self, topic: String) -> Self {
        self.topic = Some(topic);
        self
    }
}
