use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_completed: AtomicU64,
    documents_failed: AtomicU64,
    chunks_summarized: AtomicU64,
    chunks_failed: AtomicU64,
    fallbacks_used: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document that reached `complete`.
    pub fn record_completed(&self) {
        self.documents_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document that ended in `failed`.
    pub fn record_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one chunk's summarization call.
    pub fn record_chunk(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.chunks_summarized
        } else {
            &self.chunks_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tier that fell back to the extracted-text excerpt.
    pub fn record_fallback(&self) {
        self.fallbacks_used.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_completed: self.documents_completed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            fallbacks_used: self.fallbacks_used.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that completed successfully.
    pub documents_completed: u64,
    /// Documents whose pipeline aborted.
    pub documents_failed: u64,
    /// Chunk summarization calls that returned text.
    pub chunks_summarized: u64,
    /// Chunk summarization calls that failed or returned nothing.
    pub chunks_failed: u64,
    /// Tiers that used the extracted-text fallback.
    pub fallbacks_used: u64,
}
