use super::{ExtractionError, ProgressObserver};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Progress reported once the OCR process is running.
///
/// The tesseract CLI prints nothing until recognition is done, so a run reports 0, this value,
/// and 100 with nothing in between.
const OCR_STARTED_PERCENT: u8 = 10;

/// Runs the `tesseract` executable against an image file.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    binary: String,
    language: String,
}

impl OcrEngine {
    /// Use `binary` with the given language model (e.g. `eng`).
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Recognize text in the image at `path`.
    ///
    /// The child process is killed if the returned future is dropped, so request deadlines
    /// also bound OCR time.
    pub(super) async fn recognize(
        &self,
        path: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<String, ExtractionError> {
        tracing::info!(path = %path.display(), language = %self.language, "Running OCR");
        let child = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                ExtractionError::Ocr(format!("failed to start {}: {error}", self.binary))
            })?;
        progress.on_progress(OCR_STARTED_PERCENT);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::info!(chars = text.len(), "OCR finished");
        Ok(text)
    }
}
