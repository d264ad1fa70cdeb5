// file: src/analysis/graph.rs
// description: directed citation graph over corpus documents and external works
// reference: adjacency lists with explicit visited-set traversal

use crate::error::{PipelineError, Result};
use crate::models::{Citation, CitationKey, Document, normalize_title};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeId {
    Corpus { document_id: String },
    External { title: String, year: Option<u16> },
}

impl NodeId {
    pub fn corpus(document_id: &str) -> Self {
        NodeId::Corpus {
            document_id: document_id.to_string(),
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            NodeId::Corpus { document_id } => Some(document_id),
            NodeId::External { .. } => None,
        }
    }

    pub fn is_corpus(&self) -> bool {
        matches!(self, NodeId::Corpus { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub key: CitationKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub outgoing: Vec<NodeId>,
    pub incoming: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub in_degree: usize,
}

/// Serializable view of the graph with nodes in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<CitationEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    /// Corpus document ids in registration order.
    corpus: Vec<String>,
    /// Normalized title -> corpus document id.
    corpus_titles: HashMap<String, String>,
    /// Node -> display label.
    nodes: BTreeMap<NodeId, String>,
    edges: Vec<CitationEdge>,
    edge_keys: HashSet<CitationKey>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for a set of documents and their citations. All
    /// documents are registered before any citation is resolved.
    pub fn build<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a Document, &'a [Citation])>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut graph = Self::new();

        for (document, _) in &entries {
            graph.add_document(&document.id, document.title.as_deref());
        }
        for (_, citations) in &entries {
            for citation in citations.iter() {
                graph.insert(citation)?;
            }
        }

        Ok(graph)
    }

    pub fn add_document(&mut self, document_id: &str, title: Option<&str>) {
        let node = NodeId::corpus(document_id);
        if self.nodes.contains_key(&node) {
            return;
        }

        self.corpus.push(document_id.to_string());
        if let Some(title) = title {
            let normalized = normalize_title(title);
            if !normalized.is_empty() {
                self.corpus_titles
                    .entry(normalized)
                    .or_insert_with(|| document_id.to_string());
            }
        }
        self.nodes
            .insert(node, title.unwrap_or(document_id).to_string());
    }

    /// Adds the edge for one citation. Returns `Ok(false)` when an edge with
    /// the same citation key already exists.
    pub fn insert(&mut self, citation: &Citation) -> Result<bool> {
        let from = NodeId::corpus(&citation.document_id);
        if !self.nodes.contains_key(&from) {
            return Err(PipelineError::Synthesis(format!(
                "citation from unregistered document {}",
                citation.document_id
            )));
        }

        let key = citation.key();
        if self.edge_keys.contains(&key) {
            return Ok(false);
        }

        let to = self.resolve(citation);
        self.nodes.entry(to.clone()).or_insert_with(|| {
            citation
                .title
                .clone()
                .unwrap_or_else(|| citation.raw.clone())
        });

        let index = self.edges.len();
        self.outgoing.entry(from.clone()).or_default().push(index);
        self.incoming.entry(to.clone()).or_default().push(index);
        self.edges.push(CitationEdge {
            from,
            to,
            key: key.clone(),
        });
        self.edge_keys.insert(key);

        Ok(true)
    }

    /// A citation whose normalized title equals a corpus document's title
    /// points at that document; anything else is an external work keyed by
    /// title and year.
    pub fn resolve(&self, citation: &Citation) -> NodeId {
        let title = citation.match_title();
        match self.corpus_titles.get(&title) {
            Some(document_id) => NodeId::corpus(document_id),
            None => NodeId::External {
                title,
                year: citation.year,
            },
        }
    }

    pub fn neighbors(&self, node: &NodeId) -> Neighbors {
        Neighbors {
            outgoing: self.collect_unique(self.outgoing.get(node), |e| &e.to),
            incoming: self.collect_unique(self.incoming.get(node), |e| &e.from),
        }
    }

    /// Corpus documents citing `node`, in corpus order.
    pub fn co_citing(&self, node: &NodeId) -> Vec<String> {
        let citing: HashSet<&str> = self
            .incoming
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.edges[i].from.document_id())
            .collect();

        self.corpus
            .iter()
            .filter(|id| citing.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Every node reachable from `start` along outgoing edges, in BFS order.
    /// `start` itself is only listed when a cycle leads back to it.
    pub fn reachable(&self, start: &NodeId) -> Vec<NodeId> {
        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::new();
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for &i in self.outgoing.get(node).into_iter().flatten() {
                let next = &self.edges[i].to;
                if visited.insert(next) {
                    order.push(next.clone());
                    queue.push_back(next);
                }
            }
        }

        order
    }

    /// Distinct corpus documents citing `node`.
    pub fn corpus_in_degree(&self, node: &NodeId) -> usize {
        self.co_citing(node).len()
    }

    /// Distinct corpus documents `node` cites.
    pub fn corpus_out_degree(&self, node: &NodeId) -> usize {
        self.outgoing
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.edges[i].to.document_id())
            .collect::<HashSet<_>>()
            .len()
    }

    /// External works cited by at least `min_citing` corpus documents, most
    /// cited first.
    pub fn foundational_candidates(&self, min_citing: usize) -> Vec<NodeId> {
        let mut candidates: Vec<(usize, &NodeId)> = self
            .nodes
            .keys()
            .filter(|node| !node.is_corpus())
            .map(|node| (self.corpus_in_degree(node), node))
            .filter(|(in_degree, node)| {
                *in_degree >= min_citing.max(1) && self.corpus_out_degree(node) == 0
            })
            .collect();

        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        candidates.into_iter().map(|(_, node)| node.clone()).collect()
    }

    pub fn label(&self, node: &NodeId) -> Option<&str> {
        self.nodes.get(node).map(String::as_str)
    }

    pub fn corpus_documents(&self) -> &[String] {
        &self.corpus
    }

    pub fn edges(&self) -> &[CitationEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let in_degrees: HashMap<&NodeId, usize> =
            self.incoming.iter().map(|(node, edges)| (node, edges.len())).collect();

        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, label)| GraphNode {
                    id: id.clone(),
                    label: label.clone(),
                    in_degree: in_degrees.get(id).copied().unwrap_or(0),
                })
                .collect(),
            edges: self.edges.clone(),
        }
    }

    fn collect_unique<'a>(
        &'a self,
        edges: Option<&'a Vec<usize>>,
        endpoint: impl Fn(&'a CitationEdge) -> &'a NodeId,
    ) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        edges
            .into_iter()
            .flatten()
            .map(|&i| endpoint(&self.edges[i]))
            .filter(|node| seen.insert(*node))
            .cloned()
            .collect()
    }
}

impl Serialize for CitationGraph {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn citation(from: &str, title: &str, year: Option<u16>) -> Citation {
        let mut c = Citation::new(from, format!("{}. {}", title, year.unwrap_or_default()));
        c.title = Some(title.to_string());
        c.normalized_title = Some(normalize_title(title));
        c.year = year;
        c
    }

    fn two_docs() -> CitationGraph {
        let mut graph = CitationGraph::new();
        graph.add_document("a", Some("Graph Methods for Citation Analysis"));
        graph.add_document("b", Some("Neural Summaries of Scientific Text"));
        graph
    }

    #[test]
    fn test_mutual_citation_has_two_edges() {
        let mut graph = two_docs();
        graph
            .insert(&citation("a", "Neural summaries of scientific text", Some(2021)))
            .unwrap();
        graph
            .insert(&citation("b", "Graph methods for citation analysis.", Some(2020)))
            .unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 2);

        let a = NodeId::corpus("a");
        let b = NodeId::corpus("b");
        assert_eq!(graph.neighbors(&a).outgoing, vec![b.clone()]);
        assert_eq!(graph.neighbors(&a).incoming, vec![b.clone()]);

        let reachable = graph.reachable(&a);
        assert_eq!(reachable, vec![b, a]);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut graph = two_docs();
        let c = citation("a", "Attention is all you need", Some(2017));

        assert!(graph.insert(&c).unwrap());
        assert!(!graph.insert(&c).unwrap());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unregistered_citing_document_is_rejected() {
        let mut graph = two_docs();
        let result = graph.insert(&citation("zzz", "Anything", None));
        assert!(matches!(result, Err(PipelineError::Synthesis(_))));
    }

    #[test]
    fn test_self_citation_terminates() {
        let mut graph = two_docs();
        graph
            .insert(&citation("a", "Graph Methods for Citation Analysis", None))
            .unwrap();
        let a = NodeId::corpus("a");
        assert_eq!(graph.reachable(&a), vec![a.clone()]);
        assert_eq!(graph.corpus_out_degree(&a), 1);
    }

    #[test]
    fn test_external_works_keyed_by_title_and_year() {
        let mut graph = two_docs();
        graph.insert(&citation("a", "Attention Is All You Need", Some(2017))).unwrap();
        graph.insert(&citation("b", "attention is all you need", Some(2017))).unwrap();
        graph.insert(&citation("b", "Attention is all you need", Some(2018))).unwrap();

        let external = NodeId::External {
            title: "attention is all you need".to_string(),
            year: Some(2017),
        };
        assert_eq!(graph.co_citing(&external), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(graph.corpus_in_degree(&external), 2);
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_foundational_candidates() {
        let mut graph = two_docs();
        graph.add_document("c", Some("Third Paper on Something"));
        for doc in ["a", "b", "c"] {
            graph.insert(&citation(doc, "Foundations of Retrieval", Some(1999))).unwrap();
        }
        graph.insert(&citation("a", "Obscure Note", Some(2001))).unwrap();

        let candidates = graph.foundational_candidates(2);
        assert_eq!(candidates.len(), 1);
        assert_eq!(graph.label(&candidates[0]), Some("Foundations of Retrieval"));
    }

    #[test]
    fn test_build_resolves_forward_references() {
        let a = Document::from_page_texts(&["Graph Methods for Citation Analysis\nbody"]);
        let b = Document::from_page_texts(&["Neural Summaries of Scientific Text\nbody"]);
        let a_cites = vec![citation(&a.id, "Neural summaries of scientific text", Some(2021))];
        let b_cites: Vec<Citation> = Vec::new();

        let graph =
            CitationGraph::build([(&a, a_cites.as_slice()), (&b, b_cites.as_slice())]).unwrap();

        assert_eq!(graph.edges()[0].to, NodeId::corpus(&b.id));
        assert_eq!(graph.corpus_documents().len(), 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut graph = two_docs();
        graph.insert(&citation("a", "Neural summaries of scientific text", None)).unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["edges"].as_array().unwrap().len(), 1);
        assert_eq!(json["nodes"][0]["id"]["kind"], "corpus");
    }
}
