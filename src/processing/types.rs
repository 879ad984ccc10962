//! Core data types and error definitions for the summary pipeline.

use crate::extraction::ExtractionError;
use crate::store::StoreError;
use crate::summarization::SummarizationClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced while turning extracted text into word chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Caller requested chunks of zero words.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Requested summary length. Each tier has its own chunk size and prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthTier {
    /// A few sentences per chunk.
    Short,
    /// Concise summary; used when the caller does not pick a tier.
    #[default]
    Medium,
    /// Detailed points per chunk.
    Long,
}

impl LengthTier {
    /// Number of words sent to the model per request for this tier.
    pub const fn words_per_chunk(self) -> usize {
        match self {
            LengthTier::Short => 300,
            LengthTier::Medium => 500,
            LengthTier::Long => 800,
        }
    }

    /// Instruction fragment inserted into the summarization prompt.
    pub const fn instruction(self) -> &'static str {
        match self {
            LengthTier::Short => "in 2-3 sentences",
            LengthTier::Medium => "concisely",
            LengthTier::Long => "with detailed points",
        }
    }

    /// Lowercase name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            LengthTier::Short => "short",
            LengthTier::Medium => "medium",
            LengthTier::Long => "long",
        }
    }

    /// Parse a client-supplied selector; missing or unknown values select `Medium`.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("short") => LengthTier::Short,
            Some("long") => LengthTier::Long,
            _ => LengthTier::Medium,
        }
    }
}

impl fmt::Display for LengthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse progress state of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Persisting the original file and creating the document row.
    Uploading,
    /// Pulling text out of the PDF or image.
    Extracting,
    /// Calling the model for every tier.
    Summarizing,
    /// Results persisted and returned.
    Complete,
    /// Terminal failure.
    Failed,
}

impl Stage {
    /// Lowercase name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Uploading => "uploading",
            Stage::Extracting => "extracting",
            Stage::Summarizing => "summarizing",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors emitted by the summary pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Original file could not be stored or the document row could not be created.
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] StoreError),
    /// Declared media type is neither PDF nor image.
    #[error("Unsupported media type '{0}'; only PDF or image files are supported")]
    UnsupportedMediaType(String),
    /// PDF parsing or OCR failed outright.
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),
    /// Extraction succeeded but produced no readable text.
    #[error("Could not extract readable text from file")]
    NoTextExtracted,
    /// Remote model call failed for one chunk.
    #[error("Summary generation failed for chunk {chunk}: {message}")]
    SummaryGenerationFailed {
        /// Zero-based chunk position.
        chunk: usize,
        /// Provider error description.
        message: String,
    },
    /// Request exceeded its overall deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Summary record or status update could not be written.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[source] StoreError),
    /// Text could not be split into chunks.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
}

impl From<ExtractionError> for ProcessingError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::UnsupportedMediaType(mime) => Self::UnsupportedMediaType(mime),
            other => Self::ExtractionFailed(other.to_string()),
        }
    }
}

/// Failure of a pipeline run, with the stage that was active when it happened.
///
/// The stage is never reset so callers can report which step failed.
#[derive(Debug, Error)]
#[error("{error} (stage: {stage})")]
pub struct PipelineError {
    /// Stage that was active when the run failed.
    pub stage: Stage,
    /// Underlying failure.
    #[source]
    pub error: ProcessingError,
}

impl PipelineError {
    pub(crate) fn new(stage: Stage, error: ProcessingError) -> Self {
        Self { stage, error }
    }
}

/// Errors raised while assembling the production pipeline.
#[derive(Debug, Error)]
pub enum InitError {
    /// Summarization client could not be built.
    #[error("Failed to initialize summarization client: {0}")]
    Summarization(#[from] SummarizationClientError),
    /// Persistence backend could not be built.
    #[error("Failed to initialize store: {0}")]
    Store(#[from] StoreError),
}

/// Result of the single-tier quick path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    /// Tier that was generated.
    pub tier: LengthTier,
    /// Final summary text (model output or fallback excerpt).
    pub summary: String,
    /// Number of chunks sent to the model.
    pub chunk_count: usize,
    /// Whether the excerpt fallback was used.
    pub used_fallback: bool,
}
