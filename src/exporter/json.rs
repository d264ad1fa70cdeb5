// file: src/exporter/json.rs
// description: json export of per-document results, the citation graph, and research gaps
// reference: https://docs.rs/serde_json

use crate::error::{PipelineError, Result};
use crate::models::short_id;
use crate::pipeline::{DocumentEntry, RunSnapshot};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const GRAPH_FILE: &str = "citation_graph.json";
pub const GAPS_FILE: &str = "research_gaps.json";
pub const MANIFEST_FILE: &str = "manifest.json";
const DOCUMENTS_DIR: &str = "documents";

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub run_id: String,
    pub total_documents: usize,
    pub ready_documents: usize,
    pub failed_documents: usize,
    pub research_gaps: usize,
    pub files: Vec<String>,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        create_dir(&output_dir)?;
        create_dir(&output_dir.join(DOCUMENTS_DIR))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every document, the graph (when synthesized), the gaps, and a
    /// manifest listing the written files relative to the output directory.
    pub fn export_run(&self, snapshot: &RunSnapshot, pretty: bool) -> Result<ExportManifest> {
        info!("Starting JSON export to {:?}", self.output_dir);

        let mut files = Vec::new();
        for entry in &snapshot.documents {
            files.push(self.export_single(entry, pretty)?);
        }

        if let Some(graph) = &snapshot.graph {
            self.write_json(GRAPH_FILE, graph, pretty)?;
            files.push(GRAPH_FILE.to_string());
        }

        self.write_json(GAPS_FILE, &snapshot.gaps, pretty)?;
        files.push(GAPS_FILE.to_string());

        let manifest = ExportManifest {
            exported_at: Utc::now().to_rfc3339(),
            run_id: snapshot.run_id.to_string(),
            total_documents: snapshot.documents.len(),
            ready_documents: snapshot
                .documents
                .iter()
                .filter(|e| e.status.is_ready())
                .count(),
            failed_documents: snapshot
                .documents
                .iter()
                .filter(|e| e.status.is_failed())
                .count(),
            research_gaps: snapshot.gaps.len(),
            files,
        };
        self.write_json(MANIFEST_FILE, &manifest, pretty)?;

        info!(
            "Export complete: {} documents, {} files",
            manifest.total_documents,
            manifest.files.len()
        );
        Ok(manifest)
    }

    /// Returns the path of the written file relative to the output directory.
    pub fn export_single(&self, entry: &DocumentEntry, pretty: bool) -> Result<String> {
        let relative = format!("{}/{}.json", DOCUMENTS_DIR, short_id(&entry.document_id));
        self.write_json(&relative, entry, pretty)?;
        debug!("Exported {} to {}", entry.label, relative);
        Ok(relative)
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        relative: &str,
        value: &T,
        pretty: bool,
    ) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        let path = self.output_dir.join(relative);
        fs::write(&path, json).map_err(|source| PipelineError::FileOperation { path, source })
    }
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| PipelineError::FileOperation {
        path: path.to_path_buf(),
        source,
    })
}
