//! Orchestrates upload → extraction → per-tier chunked summarization → persistence.

use crate::{
    config::Config,
    extraction::{DocumentExtractor, MediaKind, OcrEngine, TempUpload, TextExtractor},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::{chunk_words, normalize_whitespace},
        progress::{ExtractionProgress, NoopObserver, PipelineObserver, StageTracker},
        types::{InitError, LengthTier, PipelineError, ProcessingError, Stage, TierSummary},
    },
    store::{
        DocumentStatus, DocumentStore, DocumentWithSummary, MemoryStore, NewDocument,
        SummaryRecord, SupabaseStore,
    },
    summarization::{GeminiSummarizationClient, SummarizationClient, SummarizationRequest},
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use time::OffsetDateTime;

/// Characters of extracted text used when a tier produced no summary at all.
pub const FALLBACK_EXCERPT_CHARS: usize = 500;

/// Marker appended to the fallback excerpt.
pub const TRUNCATION_MARKER: &str = "...";

/// Words of extracted text sent along with the key-points request.
const KEY_POINTS_MAX_WORDS: usize = 4000;

/// An uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original filename.
    pub filename: String,
    /// Declared media type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Abstraction over the summary pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Extract and summarize one upload at a single tier, without persisting anything.
    async fn summarize_upload(
        &self,
        upload: Upload,
        tier: LengthTier,
    ) -> Result<TierSummary, PipelineError>;

    /// Run the full pipeline: store the original, generate all tiers and key points, persist.
    async fn process_document(
        &self,
        upload: Upload,
        observer: &dyn PipelineObserver,
    ) -> Result<SummaryRecord, PipelineError>;

    /// Recently completed documents with their summaries, newest first.
    async fn recent_documents(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentWithSummary>, ProcessingError>;

    /// Summary record of one document.
    async fn summary_for(&self, document_id: &str)
    -> Result<Option<SummaryRecord>, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates extraction, chunking, summarization and persistence.
///
/// Construct once near process start and share through an `Arc`; every request runs as a single
/// sequential flow with no state shared between requests apart from the store and metrics.
pub struct SummaryService {
    config: Arc<Config>,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn SummarizationClient>,
    store: Arc<dyn DocumentStore>,
    metrics: Arc<PipelineMetrics>,
}

impl SummaryService {
    /// Assemble a service from explicit components.
    pub fn new(
        config: Arc<Config>,
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn SummarizationClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            extractor,
            summarizer,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build production components from configuration.
    ///
    /// Uses Supabase when configured and the in-memory store otherwise.
    pub fn from_config(config: Arc<Config>) -> Result<Self, InitError> {
        let extractor = DocumentExtractor::new(OcrEngine::new(
            config.tesseract_bin.clone(),
            config.ocr_language.clone(),
        ));
        let summarizer = GeminiSummarizationClient::from_config(&config)?;
        let store: Arc<dyn DocumentStore> = match &config.supabase {
            Some(supabase) => {
                tracing::info!("Using Supabase persistence");
                Arc::new(SupabaseStore::new(supabase)?)
            }
            None => {
                tracing::warn!("SUPABASE_URL not set; history is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(
            config,
            Arc::new(extractor),
            Arc::new(summarizer),
            store,
        ))
    }

    async fn with_deadline<T>(
        &self,
        work: impl Future<Output = Result<T, ProcessingError>>,
    ) -> Result<T, ProcessingError> {
        let deadline = self.config.request_deadline;
        tokio::time::timeout(deadline, work)
            .await
            .unwrap_or_else(|_| Err(ProcessingError::Timeout(deadline)))
    }

    async fn run_pipeline(
        &self,
        upload: Upload,
        tracker: &StageTracker<'_>,
        document_id: &OnceLock<String>,
    ) -> Result<SummaryRecord, ProcessingError> {
        tracker.enter(Stage::Uploading);
        let kind = MediaKind::from_mime(&upload.content_type)?;
        let storage_path = storage_path_for(&upload.filename);
        self.store
            .upload_blob(&storage_path, &upload.content_type, upload.bytes.clone())
            .await
            .map_err(ProcessingError::UploadFailed)?;
        let document = self
            .store
            .insert_document(NewDocument {
                filename: upload.filename.clone(),
                file_type: upload.content_type.clone(),
                file_size: upload.bytes.len() as u64,
                storage_path,
                status: DocumentStatus::Processing,
            })
            .await
            .map_err(ProcessingError::UploadFailed)?;
        let _ = document_id.set(document.id.clone());
        tracing::info!(document_id = %document.id, filename = %document.filename, "Document created");

        tracker.enter(Stage::Extracting);
        let text = self
            .extract_text(&upload.filename, upload.bytes, kind, tracker.observer())
            .await?;

        tracker.enter(Stage::Summarizing);
        let short = self.summarize_tier(&text, LengthTier::Short).await?;
        let medium = self.summarize_tier(&text, LengthTier::Medium).await?;
        let long = self.summarize_tier(&text, LengthTier::Long).await?;
        let key_points = self.key_points(&text).await;

        let record = SummaryRecord {
            document_id: document.id.clone(),
            extracted_text: text,
            summary_short: short.summary,
            summary_medium: medium.summary,
            summary_long: long.summary,
            key_points,
        };
        self.store
            .insert_summary(&record)
            .await
            .map_err(ProcessingError::PersistenceFailed)?;
        self.store
            .update_document_status(&document.id, DocumentStatus::Completed)
            .await
            .map_err(ProcessingError::PersistenceFailed)?;
        Ok(record)
    }

    /// Stage the bytes on disk, extract, remove the staged file, and normalize the result.
    async fn extract_text(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        kind: MediaKind,
        observer: &dyn PipelineObserver,
    ) -> Result<String, ProcessingError> {
        let staged = TempUpload::create(&self.config.upload_dir, filename, bytes).await?;
        tracing::debug!(path = %staged.path().display(), size = staged.size(), "Staged upload");
        let progress = ExtractionProgress(observer);
        let extracted = self.extractor.extract(staged.path(), kind, &progress).await;
        staged.release();

        let raw = extracted.map_err(|error| {
            tracing::warn!(filename, error = %error, "Text extraction failed");
            ProcessingError::NoTextExtracted
        })?;
        let text = normalize_whitespace(&raw);
        if text.is_empty() {
            tracing::warn!(filename, "Extraction produced no text");
            return Err(ProcessingError::NoTextExtracted);
        }
        Ok(text)
    }

    /// Summarize `text` chunk by chunk at `tier`, skipping chunks whose call failed.
    async fn summarize_tier(
        &self,
        text: &str,
        tier: LengthTier,
    ) -> Result<TierSummary, ProcessingError> {
        let chunks = chunk_words(text, tier.words_per_chunk())?;
        let chunk_count = chunks.len();
        tracing::debug!(tier = %tier, chunk_count, "Summarizing tier");

        let mut parts = Vec::with_capacity(chunk_count);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let outcome = self
                .summarizer
                .generate_summary(SummarizationRequest { chunk, tier })
                .await;
            match outcome {
                Ok(summary) if !summary.trim().is_empty() => {
                    self.metrics.record_chunk(true);
                    parts.push(summary.trim().to_string());
                }
                Ok(_) => {
                    self.metrics.record_chunk(false);
                    tracing::debug!(tier = %tier, chunk = index, "Model returned an empty summary");
                }
                Err(error) => {
                    self.metrics.record_chunk(false);
                    let failure = ProcessingError::SummaryGenerationFailed {
                        chunk: index,
                        message: error.to_string(),
                    };
                    tracing::warn!(tier = %tier, error = %failure, "Skipping chunk");
                }
            }
        }

        let joined = parts.join(" ");
        let used_fallback = joined.is_empty();
        let summary = if used_fallback {
            self.metrics.record_fallback();
            tracing::warn!(tier = %tier, "No chunk summaries; using extracted text excerpt");
            fallback_excerpt(text)
        } else {
            joined
        };

        Ok(TierSummary {
            tier,
            summary,
            chunk_count,
            used_fallback,
        })
    }

    async fn key_points(&self, text: &str) -> Vec<String> {
        let excerpt = text
            .split(' ')
            .take(KEY_POINTS_MAX_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        match self.summarizer.generate_key_points(&excerpt).await {
            Ok(points) => points,
            Err(error) => {
                tracing::warn!(error = %error, "Key point generation failed; storing none");
                Vec::new()
            }
        }
    }

    async fn mark_failed(&self, document_id: &str) {
        if let Err(error) = self
            .store
            .update_document_status(document_id, DocumentStatus::Failed)
            .await
        {
            tracing::warn!(document_id, error = %error, "Failed to mark document as failed");
        }
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize_upload(
        &self,
        upload: Upload,
        tier: LengthTier,
    ) -> Result<TierSummary, PipelineError> {
        let observer = NoopObserver;
        let tracker = StageTracker::new(&observer);
        let filename = upload.filename.clone();
        let work = async {
            tracker.enter(Stage::Uploading);
            let kind = MediaKind::from_mime(&upload.content_type)?;
            tracker.enter(Stage::Extracting);
            let text = self
                .extract_text(&upload.filename, upload.bytes, kind, &observer)
                .await?;
            tracker.enter(Stage::Summarizing);
            self.summarize_tier(&text, tier).await
        };

        match self.with_deadline(work).await {
            Ok(summary) => {
                tracker.enter(Stage::Complete);
                tracing::info!(
                    filename = %filename,
                    tier = %tier,
                    chunks = summary.chunk_count,
                    fallback = summary.used_fallback,
                    "Summary generated"
                );
                Ok(summary)
            }
            Err(error) => {
                let failure = tracker.fail(error);
                tracing::error!(filename = %filename, error = %failure, "Summary request failed");
                Err(failure)
            }
        }
    }

    async fn process_document(
        &self,
        upload: Upload,
        observer: &dyn PipelineObserver,
    ) -> Result<SummaryRecord, PipelineError> {
        let tracker = StageTracker::new(observer);
        let document_id = OnceLock::new();
        let filename = upload.filename.clone();

        match self
            .with_deadline(self.run_pipeline(upload, &tracker, &document_id))
            .await
        {
            Ok(record) => {
                tracker.enter(Stage::Complete);
                self.metrics.record_completed();
                tracing::info!(document_id = %record.document_id, filename = %filename, "Document completed");
                Ok(record)
            }
            Err(error) => {
                let failure = tracker.fail(error);
                self.metrics.record_failed();
                if let Some(id) = document_id.get() {
                    self.mark_failed(id).await;
                }
                tracing::error!(filename = %filename, error = %failure, "Document processing failed");
                Err(failure)
            }
        }
    }

    async fn recent_documents(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentWithSummary>, ProcessingError> {
        self.store
            .list_recent_completed(limit)
            .await
            .map_err(ProcessingError::PersistenceFailed)
    }

    async fn summary_for(
        &self,
        document_id: &str,
    ) -> Result<Option<SummaryRecord>, ProcessingError> {
        self.store
            .get_summary(document_id)
            .await
            .map_err(ProcessingError::PersistenceFailed)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// First [`FALLBACK_EXCERPT_CHARS`] characters of `text` followed by [`TRUNCATION_MARKER`].
pub fn fallback_excerpt(text: &str) -> String {
    let mut excerpt: String = text.chars().take(FALLBACK_EXCERPT_CHARS).collect();
    excerpt.push_str(TRUNCATION_MARKER);
    excerpt
}

/// Object key for a stored original: creation time in milliseconds plus a short random suffix.
fn storage_path_for(filename: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let ext = crate::extraction::extension_of(filename).unwrap_or_else(|| "bin".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}.{ext}", &suffix[..8])
}
