// file: src/pipeline/status.rs
// description: per-document lifecycle states and the events broadcast on each transition
// reference: Uploaded -> Extracted -> Chunked -> Summarized -> Ready, or Failed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Uploaded,
    Extracted,
    Chunked,
    Summarized,
    Ready,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Uploaded => "uploaded",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Chunked => "chunked",
            PipelineStage::Summarized => "summarized",
            PipelineStage::Ready => "ready",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Failed::stage` is the stage that was being attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DocumentStatus {
    Active { stage: PipelineStage },
    Failed { stage: PipelineStage, reason: String },
}

impl DocumentStatus {
    pub fn at(stage: PipelineStage) -> Self {
        DocumentStatus::Active { stage }
    }

    pub fn failed(stage: PipelineStage, reason: impl Into<String>) -> Self {
        DocumentStatus::Failed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Active {
                stage: PipelineStage::Ready
            }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DocumentStatus::Failed { .. })
    }

    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.is_failed()
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            DocumentStatus::Active { stage } | DocumentStatus::Failed { stage, .. } => *stage,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Active { stage } => write!(f, "{}", stage),
            DocumentStatus::Failed { stage, reason } => write!(f, "failed at {}: {}", stage, reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub document_id: String,
    pub label: String,
    pub status: DocumentStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    pub fn new(document_id: &str, label: &str, status: DocumentStatus) -> Self {
        Self {
            document_id: document_id.to_string(),
            label: label.to_string(),
            status,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(DocumentStatus::at(PipelineStage::Ready).is_ready());
        assert!(!DocumentStatus::at(PipelineStage::Chunked).is_terminal());

        let failed = DocumentStatus::failed(PipelineStage::Summarized, "all chunks failed");
        assert!(failed.is_terminal());
        assert_eq!(failed.stage(), PipelineStage::Summarized);
        assert_eq!(failed.to_string(), "failed at summarized: all chunks failed");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(DocumentStatus::failed(PipelineStage::Extracted, "empty")).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stage"], "extracted");
        assert_eq!(json["reason"], "empty");
    }
}
