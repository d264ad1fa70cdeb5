// file: src/pipeline/run.rs
// description: session aggregate holding every document entry and the derived corpus artifacts
// reference: replaces the database layer; everything lives in memory for one session

use crate::analysis::{ChunkWarning, CitationGraph, GraphSnapshot};
use crate::models::{Chunk, Citation, CitationParseWarning, Document, ResearchGap, Summary};
use crate::pipeline::status::{DocumentStatus, PipelineStage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    pub document_id: String,
    pub label: String,
    pub status: DocumentStatus,
    pub document: Option<Document>,
    #[serde(skip)]
    pub chunks: Vec<Chunk>,
    pub summary: Option<Summary>,
    pub citations: Vec<Citation>,
    pub chunk_warnings: Vec<ChunkWarning>,
    pub citation_warnings: Vec<CitationParseWarning>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentEntry {
    fn new(document_id: &str, label: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            label: label.to_string(),
            status: DocumentStatus::at(PipelineStage::Uploaded),
            document: None,
            chunks: Vec::new(),
            summary: None,
            citations: Vec::new(),
            chunk_warnings: Vec::new(),
            citation_warnings: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// The finished result, available once the entry is Ready.
    pub fn result(&self) -> Option<DocumentResult> {
        if !self.status.is_ready() {
            return None;
        }

        Some(DocumentResult {
            document_id: self.document_id.clone(),
            label: self.label.clone(),
            document: self.document.clone()?,
            summary: self.summary.clone()?,
            citations: self.citations.clone(),
            chunk_warnings: self.chunk_warnings.clone(),
            citation_warnings: self.citation_warnings.clone(),
        })
    }
}

/// Output of a successfully processed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentResult {
    pub document_id: String,
    pub label: String,
    pub document: Document,
    pub summary: Summary,
    pub citations: Vec<Citation>,
    pub chunk_warnings: Vec<ChunkWarning>,
    pub citation_warnings: Vec<CitationParseWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub documents: usize,
    pub graph: CitationGraph,
    pub gaps: Vec<ResearchGap>,
    pub generated_at: DateTime<Utc>,
}

/// Serializable copy of a run, used by the exporters.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub documents: Vec<DocumentEntry>,
    pub graph: Option<GraphSnapshot>,
    pub gaps: Vec<ResearchGap>,
    pub synthesized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    order: Vec<String>,
    entries: HashMap<String, DocumentEntry>,
    pub graph: Option<CitationGraph>,
    pub gaps: Vec<ResearchGap>,
    pub synthesized_at: Option<DateTime<Utc>>,
    /// Bumped whenever the set of Ready entries changes.
    corpus_version: u64,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            order: Vec::new(),
            entries: HashMap::new(),
            graph: None,
            gaps: Vec::new(),
            synthesized_at: None,
            corpus_version: 0,
        }
    }

    /// Creates the entry, or resets a failed one for another attempt. The
    /// upload position of an existing entry is kept.
    pub fn start_entry(&mut self, document_id: &str, label: &str) -> &mut DocumentEntry {
        let fresh = DocumentEntry::new(document_id, label);
        let was_ready = self
            .entries
            .get(document_id)
            .is_some_and(|entry| entry.status.is_ready());
        if was_ready {
            self.invalidate_synthesis();
        }

        match self.entries.entry(document_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                self.order.push(document_id.to_string());
                vacant.insert(fresh)
            }
        }
    }

    pub fn entry(&self, document_id: &str) -> Option<&DocumentEntry> {
        self.entries.get(document_id)
    }

    pub fn entry_mut(&mut self, document_id: &str) -> Option<&mut DocumentEntry> {
        self.entries.get_mut(document_id)
    }

    /// Entries in upload order.
    pub fn entries(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn ready_entries(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries().filter(|entry| entry.status.is_ready())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn corpus_version(&self) -> u64 {
        self.corpus_version
    }

    /// Drops the graph and gaps derived from an older Ready set. Called when
    /// an entry becomes Ready or stops being Ready.
    pub fn invalidate_synthesis(&mut self) {
        self.corpus_version += 1;
        self.graph = None;
        self.gaps.clear();
        self.synthesized_at = None;
    }

    /// Stores synthesis output computed from the Ready set at `version`.
    /// Returns false, storing nothing, when the Ready set has changed since.
    pub fn record_synthesis(
        &mut self,
        version: u64,
        graph: CitationGraph,
        gaps: Vec<ResearchGap>,
        at: DateTime<Utc>,
    ) -> bool {
        if version != self.corpus_version {
            return false;
        }
        self.graph = Some(graph);
        self.gaps = gaps;
        self.synthesized_at = Some(at);
        true
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.id,
            started_at: self.started_at,
            documents: self.entries().cloned().collect(),
            graph: self.graph.as_ref().map(CitationGraph::snapshot),
            gaps: self.gaps.clone(),
            synthesized_at: self.synthesized_at,
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}
