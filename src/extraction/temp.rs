use super::ExtractionError;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Uploaded bytes staged on disk for the extractor.
///
/// The file is deleted when the value is released or dropped, including on early returns and
/// cancelled futures.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
    size: usize,
}

impl TempUpload {
    /// Write `bytes` to a fresh file under `dir`, keeping the original extension so tools that
    /// sniff by suffix (tesseract) see the right format.
    pub async fn create(
        dir: &Path,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, ExtractionError> {
        let dir = dir.to_path_buf();
        let suffix = extension_of(filename)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        tokio::task::spawn_blocking(move || write_temp(&dir, &suffix, &bytes))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))?
    }

    /// Location of the staged file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes staged.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Delete the file now, logging rather than failing if removal goes wrong.
    pub fn release(self) {
        let path: PathBuf = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary upload"),
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Failed to remove temporary upload")
            }
        }
    }
}

fn write_temp(dir: &Path, suffix: &str, bytes: &[u8]) -> Result<TempUpload, ExtractionError> {
    use std::io::Write;

    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(TempUpload {
        file,
        size: bytes.len(),
    })
}

/// Lowercase extension of `filename`, if it has a plausible one.
pub(crate) fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
