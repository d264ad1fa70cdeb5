// file: src/parser/pdf.rs
// description: converts PDF bytes into cleaned, paginated text
// reference: https://docs.rs/lopdf

use crate::error::{PipelineError, Result};
use crate::models::{Document, Page};
use crate::parser::normalizer::TextNormalizer;
use crate::utils::Validator;
use lopdf::Document as PdfDocument;
use tracing::{debug, warn};

pub struct PdfExtractor {
    normalizer: TextNormalizer,
    /// 0 disables the limit.
    max_size_mb: usize,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            max_size_mb: 0,
        }
    }

    pub fn with_max_size_mb(max_size_mb: usize) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            max_size_mb,
        }
    }

    /// Extracts every page of `bytes`. Unreadable or empty pages are kept as
    /// low-confidence pages; the call fails only when the input is not a PDF
    /// or no page carries a text layer.
    pub fn extract(&self, bytes: &[u8], document_id: &str) -> Result<Document> {
        if bytes.is_empty() {
            return Err(PipelineError::Extraction("input is empty (0 bytes)".to_string()));
        }

        Validator::validate_file_size(bytes.len() as u64, self.max_size_mb)
            .and_then(|()| Validator::validate_pdf_header(bytes))
            .map_err(|e| PipelineError::Extraction(e.to_string()))?;

        let pdf = PdfDocument::load_mem(bytes)
            .map_err(|e| PipelineError::Extraction(format!("not a valid PDF: {}", e)))?;

        if pdf.trailer.get(b"Encrypt").is_ok() {
            return Err(PipelineError::Extraction(
                "PDF is encrypted; no text layer is accessible".to_string(),
            ));
        }

        let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(PipelineError::Extraction("PDF has no pages".to_string()));
        }

        let pages: Vec<Page> = page_numbers
            .iter()
            .map(|&number| self.extract_page(&pdf, number))
            .collect();

        let document = Document::new(document_id.to_string(), bytes.len() as u64, pages);

        if !document.has_text() {
            return Err(PipelineError::Extraction(format!(
                "no extractable text in {} page(s); the file may be a scanned image",
                document.pages.len()
            )));
        }

        let low = document.low_confidence_pages();
        if !low.is_empty() {
            warn!(
                "Document {}: {} of {} pages have no readable text: {:?}",
                document.short_id(),
                low.len(),
                document.pages.len(),
                low
            );
        }

        Ok(document)
    }

    fn extract_page(&self, pdf: &PdfDocument, number: u32) -> Page {
        match pdf.extract_text(&[number]) {
            Ok(raw) => {
                let text = self.normalizer.normalize(&raw);
                debug!("Page {}: extracted {} chars", number, text.chars().count());
                Page::new(number, text)
            }
            Err(e) => {
                warn!("Page {}: text extraction failed: {}", number, e);
                Page::unreadable(number)
            }
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}
