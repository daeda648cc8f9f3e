/// Document text extraction — the boundary to the PDF library.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document unreadable: {0}")]
    Unreadable(String),

    #[error("Unsupported document format: {0}")]
    Unsupported(String),
}

/// Formats the screener can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detects the format from the PDF magic bytes, then from the file extension.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Result<Self, ExtractionError> {
        if bytes.starts_with(b"%PDF") {
            return Ok(DocumentFormat::Pdf);
        }
        Self::from_extension(Path::new(file_name))
            .ok_or_else(|| ExtractionError::Unsupported(file_name.to_string()))
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" | "md" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }
}

/// Turns document bytes into page text. Implementations must be side-effect free.
pub trait TextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;

    /// All pages joined by newlines, surrounding whitespace trimmed.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = self.extract_pages(bytes)?;
        debug!("Extracted {} page(s)", pages.len());
        Ok(pages
            .iter()
            .map(|p| p.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string())
    }
}

/// PDF extractor backed by the pdf-extract crate.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed files; treat that as unreadable.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match outcome {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ExtractionError::Unreadable(e.to_string())),
            Err(_) => Err(ExtractionError::Unreadable(
                "PDF parser aborted on malformed input".to_string(),
            )),
        }
    }
}

/// UTF-8 text files, one "page".
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::Unreadable(format!("not valid UTF-8: {e}")))?;
        Ok(vec![text.to_string()])
    }
}
