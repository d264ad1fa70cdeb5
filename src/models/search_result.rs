// file: src/models/search_result.rs
// description: Search result model returned by the search capability
// reference: Used to enrich research gaps with outside context

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page or paper title
    pub title: String,

    /// Link to the source
    pub link: String,

    /// Short excerpt supplied by the search engine, or a paper abstract
    #[serde(default)]
    pub snippet: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    /// Publication date as `YYYY-MM-DD` when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl SearchResult {
    /// Create a new search result
    pub fn new(title: String, link: String, snippet: String) -> Self {
        Self {
            title,
            link,
            snippet,
            authors: Vec::new(),
            published: None,
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_published(mut self, published: Option<String>) -> Self {
        self.published = published;
        self
    }

    /// Format as a summary string for display
    pub fn format_summary(&self, max_snippet_len: usize) -> String {
        let snippet_preview = if self.snippet.chars().count() > max_snippet_len {
            let cut: String = self.snippet.chars().take(max_snippet_len).collect();
            format!("{}...", cut)
        } else {
            self.snippet.clone()
        };

        let mut byline = self.authors.join(", ");
        if let Some(published) = &self.published {
            if !byline.is_empty() {
                byline.push_str(", ");
            }
            byline.push_str(published);
        }

        if byline.is_empty() {
            format!("{} ({})\n{}\n", self.title, self.link, snippet_preview)
        } else {
            format!(
                "{} ({})\n{}\n{}\n",
                self.title, self.link, byline, snippet_preview
            )
        }
    }
}
