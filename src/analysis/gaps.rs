// file: src/analysis/gaps.rs
// description: derives ranked research gaps from topic clusters and the citation graph
// reference: under-covered topics and uncited foundational works

use crate::analysis::graph::{CitationGraph, NodeId};
use crate::capability::{
    CapabilityLimiter, FindingCluster, LanguageModel, RetryPolicy, SearchCapability,
    call_with_retry,
};
use crate::config::GapConfig;
use crate::models::{ResearchGap, Summary};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOPIC_WEIGHT: f64 = 0.6;
const GRAPH_WEIGHT: f64 = 0.4;

pub struct GapIdentifier {
    model: Arc<dyn LanguageModel>,
    sources: Vec<Arc<dyn SearchCapability>>,
    policy: RetryPolicy,
    limiter: Option<CapabilityLimiter>,
    config: GapConfig,
}

/// A foundational external work and its graph signal.
struct Foundation {
    node: NodeId,
    label: String,
    citing: Vec<String>,
    signal: f64,
}

impl GapIdentifier {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        sources: Vec<Arc<dyn SearchCapability>>,
        policy: RetryPolicy,
        limiter: Option<CapabilityLimiter>,
        config: GapConfig,
    ) -> Self {
        Self {
            model,
            sources,
            policy,
            limiter,
            config,
        }
    }

    /// `summaries` must be in corpus order. A capability failure yields an
    /// empty list, never an error.
    ///
    /// The model is only consulted when there are findings to cluster. A
    /// corpus without findings still gets the graph-only gaps for its
    /// foundational works, since those need no capability call.
    pub async fn identify(&self, summaries: &[Summary], graph: &CitationGraph) -> Vec<ResearchGap> {
        let total_docs = summaries.len();
        if total_docs == 0 {
            return Vec::new();
        }

        let position: HashMap<&str, usize> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.document_id.as_str(), i))
            .collect();

        let findings: Vec<(usize, String)> = summaries
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.key_findings.iter().map(move |f| (i, f.claim.clone())))
            .collect();

        let clusters = if findings.is_empty() {
            Vec::new()
        } else {
            let claims: Vec<String> = findings.iter().map(|(_, claim)| claim.clone()).collect();
            let result = call_with_retry(&self.policy, self.limiter.as_ref(), "cluster findings", || {
                self.model.cluster_findings(&claims)
            })
            .await;

            match result {
                Ok(clusters) => clusters,
                Err(err) => {
                    warn!("Gap identification skipped, clustering failed: {}", err);
                    return Vec::new();
                }
            }
        };

        let foundations = self.foundations(graph, total_docs);
        let mut linked = vec![false; foundations.len()];
        let mut gaps = Vec::new();

        for cluster in &clusters {
            if let Some(gap) =
                self.cluster_gap(cluster, &findings, summaries, &foundations, &mut linked)
            {
                gaps.push(gap);
            }
        }

        for (foundation, _) in foundations.iter().zip(&linked).filter(|(_, linked)| !**linked) {
            let supporting: Vec<String> = foundation
                .citing
                .iter()
                .filter(|id| position.contains_key(id.as_str()))
                .cloned()
                .collect();
            gaps.push(ResearchGap::new(
                format!(
                    "\"{}\" is cited by {} corpus documents but none of their findings build on it",
                    foundation.label,
                    foundation.citing.len()
                ),
                supporting,
                GRAPH_WEIGHT * foundation.signal,
            ));
        }

        rank(&mut gaps, &position);
        gaps.truncate(self.config.max_gaps);

        self.enrich(&mut gaps).await;

        info!(
            "Identified {} research gaps from {} clusters and {} foundational works",
            gaps.len(),
            clusters.len(),
            foundations.len()
        );
        gaps
    }

    fn foundations(&self, graph: &CitationGraph, total_docs: usize) -> Vec<Foundation> {
        graph
            .foundational_candidates(self.config.min_external_citations)
            .into_iter()
            .map(|node| {
                let citing = graph.co_citing(&node);
                let signal = (citing.len() as f64 / total_docs as f64).clamp(0.0, 1.0);
                let label = graph.label(&node).unwrap_or_default().to_string();
                Foundation {
                    node,
                    label,
                    citing,
                    signal,
                }
            })
            .collect()
    }

    fn cluster_gap(
        &self,
        cluster: &FindingCluster,
        findings: &[(usize, String)],
        summaries: &[Summary],
        foundations: &[Foundation],
        linked: &mut [bool],
    ) -> Option<ResearchGap> {
        let support: BTreeSet<usize> = cluster
            .members
            .iter()
            .filter_map(|&m| findings.get(m).map(|(doc, _)| *doc))
            .collect();

        if support.is_empty() {
            debug!("Skipping cluster '{}' with no valid members", cluster.topic);
            return None;
        }

        let total_docs = summaries.len();
        let supporting: Vec<String> = support
            .iter()
            .map(|&i| summaries[i].document_id.clone())
            .collect();

        let topic_signal = 1.0 - support.len() as f64 / total_docs as f64;

        let mut graph_signal: f64 = 0.0;
        for (i, foundation) in foundations.iter().enumerate() {
            if foundation.citing.iter().any(|id| supporting.contains(id)) {
                linked[i] = true;
                graph_signal = graph_signal.max(foundation.signal);
                debug!("Cluster '{}' linked to {:?}", cluster.topic, foundation.node);
            }
        }

        let description = cluster
            .gap
            .as_deref()
            .map(str::trim)
            .filter(|gap| !gap.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "\"{}\" is addressed by only {} of {} documents",
                    cluster.topic,
                    support.len(),
                    total_docs
                )
            });

        Some(
            ResearchGap::new(
                description,
                supporting,
                TOPIC_WEIGHT * topic_signal + GRAPH_WEIGHT * graph_signal,
            )
            .with_topic(cluster.topic.clone()),
        )
    }

    /// Queries every source for the top gaps. Each source contributes at
    /// most `search_results` entries, in source order; a failing source is
    /// skipped without affecting the others.
    async fn enrich(&self, gaps: &mut [ResearchGap]) {
        if self.sources.is_empty() {
            return;
        }

        for gap in gaps.iter_mut().take(self.config.enrich_top_n) {
            let query = gap.topic.clone().unwrap_or_else(|| gap.description.clone());

            for source in &self.sources {
                let label = format!("{} search", source.name());
                let result = call_with_retry(&self.policy, self.limiter.as_ref(), &label, || {
                    source.search(&query)
                })
                .await;

                match result {
                    Ok(results) => gap
                        .related_sources
                        .extend(results.into_iter().take(self.config.search_results)),
                    Err(err) => debug!(
                        "{} enrichment for '{}' failed: {}",
                        source.name(),
                        query,
                        err
                    ),
                }
            }
        }
    }
}

/// Confidence descending, then earliest supporting document, then description.
fn rank(gaps: &mut [ResearchGap], position: &HashMap<&str, usize>) {
    let earliest = |gap: &ResearchGap| {
        gap.supporting_documents
            .iter()
            .filter_map(|id| position.get(id.as_str()).copied())
            .min()
            .unwrap_or(usize::MAX)
    };

    gaps.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| earliest(a).cmp(&earliest(b)))
            .then_with(|| a.description.cmp(&b.description))
    });
}
