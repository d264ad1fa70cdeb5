// file: src/utils/validation.rs
// description: input validation for uploaded papers and configured endpoints
// reference: input validation patterns

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF-";
// Readers accept the header anywhere in the first KiB.
const HEADER_WINDOW: usize = 1024;

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            PipelineError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(PipelineError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_pdf_extension(path: &Path) -> Result<()> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => Ok(()),
            _ => Err(PipelineError::Validation(format!(
                "File is not a PDF: {}",
                path.display()
            ))),
        }
    }

    pub fn validate_pdf_header(bytes: &[u8]) -> Result<()> {
        let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
        if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
            Ok(())
        } else {
            Err(PipelineError::Validation(
                "Missing %PDF- header".to_string(),
            ))
        }
    }

    /// `max_mb == 0` disables the limit.
    pub fn validate_file_size(len: u64, max_mb: usize) -> Result<()> {
        let max_bytes = max_mb as u64 * 1_048_576;
        if max_bytes > 0 && len > max_bytes {
            return Err(PipelineError::Validation(format!(
                "File too large: {} bytes (limit {} MB)",
                len, max_mb
            )));
        }
        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    /// Truncates to at most `max_chars` characters, never splitting one.
    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            None => text.to_string(),
            Some((cut, _)) => format!("{}...", &text[..cut]),
        }
    }
}
