//! Summary pipeline: word chunking, per-tier summarization, and the orchestrating service.

pub mod chunking;
pub mod progress;
mod service;
pub mod types;

pub use progress::{LoggingObserver, NoopObserver, PipelineObserver};
pub use service::{
    FALLBACK_EXCERPT_CHARS, SummaryApi, SummaryService, TRUNCATION_MARKER, Upload,
    fallback_excerpt,
};
pub use types::{
    ChunkingError, InitError, LengthTier, PipelineError, ProcessingError, Stage, TierSummary,
};
