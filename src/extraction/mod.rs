//! Text extraction from uploaded PDFs and images.
//!
//! PDFs are handed to `pdf-extract`; images go through the `tesseract` executable. Uploaded
//! bytes live in a [`TempUpload`] for the duration of the extraction and are removed on every
//! exit path.

mod ocr;
mod pdf;
mod temp;

pub use ocr::OcrEngine;
pub use temp::TempUpload;
pub(crate) use temp::extension_of;

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

/// Errors raised while pulling text out of an uploaded file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Declared media type is neither PDF nor image.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    /// Temporary file could not be written or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// PDF parser rejected the document.
    #[error("PDF parsing failed: {0}")]
    Pdf(String),
    /// OCR engine failed to run or exited unsuccessfully.
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// Blocking worker panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Kind of document, derived from the declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `application/pdf` and friends.
    Pdf,
    /// Any `image/*` type.
    Image,
}

impl MediaKind {
    /// Classify a declared media type.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractionError> {
        let normalized = mime.trim().to_ascii_lowercase();
        if normalized.contains("pdf") {
            Ok(MediaKind::Pdf)
        } else if normalized.starts_with("image/") {
            Ok(MediaKind::Image)
        } else {
            Err(ExtractionError::UnsupportedMediaType(mime.to_string()))
        }
    }
}

/// Receives extraction progress as a percentage in `[0, 100]`.
///
/// Called synchronously from the extraction task.
pub trait ProgressObserver: Send + Sync {
    /// Report the current completion percentage.
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// Observer that discards all notifications.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _percent: u8) {}
}

/// Clamps reported values to 100 and drops any value lower than the last one forwarded.
pub struct MonotonicProgress<'a> {
    inner: &'a dyn ProgressObserver,
    last: AtomicU8,
}

impl<'a> MonotonicProgress<'a> {
    /// Wrap an observer.
    pub fn new(inner: &'a dyn ProgressObserver) -> Self {
        Self {
            inner,
            last: AtomicU8::new(0),
        }
    }
}

impl ProgressObserver for MonotonicProgress<'_> {
    fn on_progress(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if percent >= previous {
            self.inner.on_progress(percent);
        }
    }
}

/// Produces raw text from a file on disk.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `path`. The result may be empty; callers decide what that means.
    async fn extract(
        &self,
        path: &Path,
        kind: MediaKind,
        progress: &dyn ProgressObserver,
    ) -> Result<String, ExtractionError>;
}

/// Production extractor: `pdf-extract` for PDFs, tesseract for images.
pub struct DocumentExtractor {
    ocr: OcrEngine,
}

impl DocumentExtractor {
    /// Build an extractor that runs OCR through `ocr`.
    pub fn new(ocr: OcrEngine) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(
        &self,
        path: &Path,
        kind: MediaKind,
        progress: &dyn ProgressObserver,
    ) -> Result<String, ExtractionError> {
        let progress = MonotonicProgress::new(progress);
        progress.on_progress(0);
        let text = match kind {
            MediaKind::Pdf => pdf::extract_pdf_text(path).await?,
            MediaKind::Image => self.ocr.recognize(path, &progress).await?,
        };
        progress.on_progress(100);
        tracing::debug!(kind = ?kind, chars = text.len(), "Extracted text");
        Ok(text)
    }
}
