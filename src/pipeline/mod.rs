// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
mod processor;
mod progress;
mod run;
mod status;

pub use orchestrator::PipelineOrchestrator;
pub use processor::{DocumentAnalysis, DocumentProcessor};
pub use progress::{PipelineStats, ProgressTracker};
pub use run::{DocumentEntry, DocumentResult, PipelineRun, RunSnapshot, SynthesisReport};
pub use status::{DocumentStatus, PipelineStage, StatusEvent};
