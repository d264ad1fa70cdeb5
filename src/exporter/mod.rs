// file: src/exporter/mod.rs
// description: export module exports
// reference: internal module structure

pub mod json;
pub mod report;

pub use json::{ExportManifest, JsonExporter};
pub use report::ReportWriter;
