// file: src/exporter/report.rs
// description: markdown literature-review report over a synthesized run
// reference: synthesis of findings, research directions, and links to related work

use crate::error::{PipelineError, Result};
use crate::models::ResearchGap;
use crate::pipeline::{DocumentEntry, RunSnapshot};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

const MOST_CITED: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    title: Option<String>,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn write(&self, path: &Path, snapshot: &RunSnapshot) -> Result<()> {
        let report = self.render(snapshot);
        fs::write(path, report).map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Report written to {:?}", path);
        Ok(())
    }

    pub fn render(&self, snapshot: &RunSnapshot) -> String {
        let labels: HashMap<&str, &str> = snapshot
            .documents
            .iter()
            .map(|e| (e.document_id.as_str(), display_name(e)))
            .collect();

        let mut out = String::new();
        let title = self.title.as_deref().unwrap_or("Literature Review");
        let _ = writeln!(out, "# {}\n", title);
        let _ = writeln!(
            out,
            "Run `{}`, started {}.\n",
            snapshot.run_id,
            snapshot.started_at.format("%Y-%m-%d %H:%M UTC")
        );

        self.render_findings(&mut out, snapshot);
        self.render_graph(&mut out, snapshot);
        self.render_directions(&mut out, &snapshot.gaps, &labels);
        self.render_issues(&mut out, snapshot);

        out
    }

    fn render_findings(&self, out: &mut String, snapshot: &RunSnapshot) {
        let _ = writeln!(out, "## Synthesis of Findings\n");

        let ready: Vec<&DocumentEntry> = snapshot
            .documents
            .iter()
            .filter(|e| e.status.is_ready())
            .collect();
        if ready.is_empty() {
            let _ = writeln!(out, "No documents were summarized.\n");
            return;
        }

        for entry in ready {
            let _ = writeln!(out, "### {}\n", display_name(entry));
            let Some(summary) = &entry.summary else {
                continue;
            };

            let _ = writeln!(out, "*Methodology: {}*\n", summary.methodology.as_str());
            if !summary.synopsis.is_empty() {
                let _ = writeln!(out, "{}\n", summary.synopsis);
            }
            for finding in &summary.key_findings {
                let _ = writeln!(out, "- {}", finding.claim);
            }
            if !summary.key_findings.is_empty() {
                out.push('\n');
            }
        }
    }

    fn render_graph(&self, out: &mut String, snapshot: &RunSnapshot) {
        let Some(graph) = &snapshot.graph else {
            return;
        };

        let _ = writeln!(out, "## Citation Graph\n");
        let _ = writeln!(
            out,
            "{} works, {} citation links.\n",
            graph.nodes.len(),
            graph.edges.len()
        );

        let mut cited: Vec<_> = graph.nodes.iter().filter(|n| n.in_degree > 0).collect();
        cited.sort_by(|a, b| b.in_degree.cmp(&a.in_degree).then_with(|| a.label.cmp(&b.label)));
        if cited.is_empty() {
            return;
        }

        let _ = writeln!(out, "Most cited:\n");
        for node in cited.into_iter().take(MOST_CITED) {
            let _ = writeln!(out, "- {} ({} citing papers)", node.label, node.in_degree);
        }
        out.push('\n');
    }

    fn render_directions(
        &self,
        out: &mut String,
        gaps: &[ResearchGap],
        labels: &HashMap<&str, &str>,
    ) {
        let _ = writeln!(out, "## Research Directions\n");
        if gaps.is_empty() {
            let _ = writeln!(out, "No research gaps were identified.\n");
            return;
        }

        for (i, gap) in gaps.iter().enumerate() {
            let heading = gap.topic.as_deref().unwrap_or(&gap.description);
            let _ = writeln!(out, "{}. **{}** (confidence {:.2})", i + 1, heading, gap.confidence);
            if gap.topic.is_some() {
                let _ = writeln!(out, "   {}", gap.description);
            }

            let supporting: Vec<&str> = gap
                .supporting_documents
                .iter()
                .map(|id| labels.get(id.as_str()).copied().unwrap_or(id.as_str()))
                .collect();
            if !supporting.is_empty() {
                let _ = writeln!(out, "   Supported by: {}", supporting.join(", "));
            }

            for source in &gap.related_sources {
                let _ = write!(out, "   - [{}]({})", source.title, source.link);
                if let Some(published) = &source.published {
                    let _ = write!(out, ", {}", published);
                }
                out.push('\n');
            }
        }
        out.push('\n');
    }

    fn render_issues(&self, out: &mut String, snapshot: &RunSnapshot) {
        let mut lines = Vec::new();
        for entry in &snapshot.documents {
            if entry.status.is_failed() {
                lines.push(format!("- {}: {}", entry.label, entry.status));
            }
            if !entry.chunk_warnings.is_empty() {
                lines.push(format!(
                    "- {}: {} chunks could not be summarized",
                    entry.label,
                    entry.chunk_warnings.len()
                ));
            }
            if !entry.citation_warnings.is_empty() {
                lines.push(format!(
                    "- {}: {} references could not be parsed",
                    entry.label,
                    entry.citation_warnings.len()
                ));
            }
        }

        if lines.is_empty() {
            return;
        }
        let _ = writeln!(out, "## Processing Issues\n");
        for line in lines {
            let _ = writeln!(out, "{}", line);
        }
    }
}

fn display_name(entry: &DocumentEntry) -> &str {
    entry
        .document
        .as_ref()
        .and_then(|d| d.title.as_deref())
        .unwrap_or(&entry.label)
}
