use super::ExtractionError;
use std::path::Path;

/// Read a PDF from disk and return its text layer.
///
/// Parsing runs on the blocking pool. `pdf-extract` can panic on malformed input; the panic is
/// contained by the join handle and reported as [`ExtractionError::Task`].
pub(super) async fn extract_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)?;
        pdf_extract::extract_text_from_mem(&bytes).map_err(|error| {
            tracing::warn!(path = %path.display(), error = %error, "PDF parsing failed");
            ExtractionError::Pdf(error.to_string())
        })
    })
    .await
    .map_err(|error| ExtractionError::Task(error.to_string()))?
}
