//! Stage and progress notifications for a single pipeline run.

use super::types::{PipelineError, ProcessingError, Stage};
use crate::extraction::ProgressObserver;
use std::sync::Mutex;

/// Receives stage transitions and extraction progress for one upload.
///
/// Notifications are delivered synchronously from the task running the pipeline.
pub trait PipelineObserver: Send + Sync {
    /// The pipeline entered `stage`.
    fn on_stage(&self, stage: Stage);

    /// Extraction progress in `[0, 100]`, never decreasing within one run.
    fn on_progress(&self, _percent: u8) {}
}

/// Observer that ignores every notification.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_stage(&self, _stage: Stage) {}
}

/// Observer that writes transitions to the tracing log.
pub struct LoggingObserver {
    label: String,
}

impl LoggingObserver {
    /// Tag every log line with `label` (usually the filename).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl PipelineObserver for LoggingObserver {
    fn on_stage(&self, stage: Stage) {
        tracing::info!(file = %self.label, stage = stage.as_str(), "Pipeline stage");
    }

    fn on_progress(&self, percent: u8) {
        tracing::debug!(file = %self.label, percent, "Extraction progress");
    }
}

/// Remembers the active stage so a failure can be reported against it.
pub(crate) struct StageTracker<'a> {
    current: Mutex<Stage>,
    observer: &'a dyn PipelineObserver,
}

impl<'a> StageTracker<'a> {
    pub(crate) fn new(observer: &'a dyn PipelineObserver) -> Self {
        Self {
            current: Mutex::new(Stage::Uploading),
            observer,
        }
    }

    pub(crate) fn enter(&self, stage: Stage) {
        if let Ok(mut current) = self.current.lock() {
            *current = stage;
        }
        self.observer.on_stage(stage);
    }

    pub(crate) fn current(&self) -> Stage {
        self.current
            .lock()
            .map(|stage| *stage)
            .unwrap_or(Stage::Failed)
    }

    /// Notify `failed` and wrap `error` with the stage that was active.
    ///
    /// The recorded stage is left untouched.
    pub(crate) fn fail(&self, error: ProcessingError) -> PipelineError {
        let stage = self.current();
        self.observer.on_stage(Stage::Failed);
        PipelineError::new(stage, error)
    }

    pub(crate) fn observer(&self) -> &'a dyn PipelineObserver {
        self.observer
    }
}

/// Adapts a pipeline observer to the extractor's progress hook.
pub(crate) struct ExtractionProgress<'a>(pub(crate) &'a dyn PipelineObserver);

impl ProgressObserver for ExtractionProgress<'_> {
    fn on_progress(&self, percent: u8) {
        self.0.on_progress(percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Stage>>);

    impl PipelineObserver for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    #[test]
    fn failure_keeps_the_active_stage() {
        let recorder = Recorder::default();
        let tracker = StageTracker::new(&recorder);
        tracker.enter(Stage::Uploading);
        tracker.enter(Stage::Extracting);

        let error = tracker.fail(ProcessingError::NoTextExtracted);

        assert_eq!(error.stage, Stage::Extracting);
        assert_eq!(tracker.current(), Stage::Extracting);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![Stage::Uploading, Stage::Extracting, Stage::Failed]
        );
    }
}
