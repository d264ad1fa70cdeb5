// file: src/models/summary.rs
// description: per-document summary, key findings, and the partial-summary merge
// reference: ordered fold over chunk results

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Methodology {
    Empirical,
    Theoretical,
    Review,
    #[default]
    Unknown,
}

impl Methodology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::Empirical => "empirical",
            Methodology::Theoretical => "theoretical",
            Methodology::Review => "review",
            Methodology::Unknown => "unknown",
        }
    }

    /// Lenient parse of a model-produced label.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.starts_with("empiric") || label.starts_with("experiment") {
            Methodology::Empirical
        } else if label.starts_with("theor") || label.starts_with("analytic") {
            Methodology::Theoretical
        } else if label.starts_with("review") || label.starts_with("survey") {
            Methodology::Review
        } else {
            Methodology::Unknown
        }
    }
}

/// Summary of a single chunk as returned by the summarization capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartialSummary {
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub methodology: Methodology,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFinding {
    pub claim: String,
    pub supporting_chunk: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub document_id: String,
    pub synopsis: String,
    pub key_findings: Vec<KeyFinding>,
    pub methodology: Methodology,
    pub chunks_summarized: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MethodologyVotes {
    empirical: usize,
    theoretical: usize,
    review: usize,
    unknown: usize,
}

impl MethodologyVotes {
    fn record(&mut self, methodology: Methodology) {
        match methodology {
            Methodology::Empirical => self.empirical += 1,
            Methodology::Theoretical => self.theoretical += 1,
            Methodology::Review => self.review += 1,
            Methodology::Unknown => self.unknown += 1,
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            empirical: self.empirical + other.empirical,
            theoretical: self.theoretical + other.theoretical,
            review: self.review + other.review,
            unknown: self.unknown + other.unknown,
        }
    }

    // Ties between the leaders resolve to Unknown.
    fn winner(&self) -> Methodology {
        let tally = [
            (Methodology::Empirical, self.empirical),
            (Methodology::Theoretical, self.theoretical),
            (Methodology::Review, self.review),
            (Methodology::Unknown, self.unknown),
        ];
        let best = tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
        if best == 0 {
            return Methodology::Unknown;
        }

        let mut leaders = tally.iter().filter(|(_, n)| *n == best);
        match (leaders.next(), leaders.next()) {
            (Some((m, _)), None) => *m,
            _ => Methodology::Unknown,
        }
    }
}

/// Accumulated merge state over an ordered run of chunk summaries.
///
/// `combine` is associative: folding chunks `[1, 2, 3]` in one pass equals
/// merging `[1, 2]` first and then `[3]`, so chunks may be summarized in any
/// order as long as they are combined in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryAccumulator {
    synopses: Vec<String>,
    findings: Vec<KeyFinding>,
    seen_claims: HashSet<String>,
    votes: MethodologyVotes,
    chunks: usize,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_partial(chunk_index: usize, partial: PartialSummary) -> Self {
        let mut acc = Self::new();
        acc.chunks = 1;
        acc.votes.record(partial.methodology);

        let synopsis = partial.synopsis.trim();
        if !synopsis.is_empty() {
            acc.synopses.push(synopsis.to_string());
        }

        for claim in partial.findings {
            let claim = claim.trim();
            if claim.is_empty() {
                continue;
            }
            if acc.seen_claims.insert(claim_key(claim)) {
                acc.findings.push(KeyFinding {
                    claim: claim.to_string(),
                    supporting_chunk: Some(chunk_index),
                });
            }
        }

        acc
    }

    pub fn combine(mut self, other: Self) -> Self {
        self.synopses.extend(other.synopses);

        for finding in other.findings {
            if self.seen_claims.insert(claim_key(&finding.claim)) {
                self.findings.push(finding);
            }
        }

        self.votes = self.votes.add(other.votes);
        self.chunks += other.chunks;
        self
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn finish(self, document_id: &str) -> Summary {
        Summary {
            document_id: document_id.to_string(),
            synopsis: self.synopses.join(" "),
            key_findings: self.findings,
            methodology: self.votes.winner(),
            chunks_summarized: self.chunks,
        }
    }
}

/// Case-insensitive, whitespace-collapsed duplicate key for a claim.
pub fn claim_key(claim: &str) -> String {
    claim
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
