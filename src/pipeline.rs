use anyhow::Result;
use std::cmp::Ordering as CmpOrdering;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

use crate::coords::{ScreenRect, pixel_to_logical};
use crate::error::OverlayError;
use crate::fit::{FitMode, FitStrategy, FontSizeRange, TextMeasure};
use crate::ocr::{RecognitionOutcome, RecognizedFragment, merge_fragments};
use crate::overlay::TextBlockPlacement;
use crate::translate::{
    CancellationToken, FragmentTranslator, LanguageDetector, TranslateOptions, translate_all,
};

/// A captured screen region and where it sits on screen.
#[derive(Debug, Clone)]
pub struct CapturedRegion {
    pub image: Vec<u8>,
    pub screen_bounds: ScreenRect,
    pub dpi_x: f64,
    pub dpi_y: f64,
}

pub type CaptureFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<CapturedRegion>>> + Send + 'a>>;
pub type RecognitionFuture<'a> = Pin<Box<dyn Future<Output = Result<RecognitionOutcome>> + Send + 'a>>;

pub trait ScreenCapture: Send + Sync {
    /// `Ok(None)` when the user aborted the selection.
    fn capture_region(&self) -> CaptureFuture<'_>;
}

pub trait TextRecognizer: Send + Sync {
    fn recognize<'a>(&'a self, image: &'a [u8], language: &'a str) -> RecognitionFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fit: FitMode,
    pub font_range: FontSizeRange,
    pub translate: TranslateOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fit: FitMode::Live,
            font_range: FontSizeRange::default(),
            translate: TranslateOptions::default(),
        }
    }
}

/// Recognized text in, placements out: merge, translate, map, fit.
pub struct OverlayPipeline {
    detector: Arc<dyn LanguageDetector>,
    translator: Option<Arc<dyn FragmentTranslator>>,
    measure: Arc<dyn TextMeasure + Send + Sync>,
    config: PipelineConfig,
}

impl OverlayPipeline {
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        translator: Option<Arc<dyn FragmentTranslator>>,
        measure: Arc<dyn TextMeasure + Send + Sync>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            translator,
            measure,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn place(
        &self,
        outcome: RecognitionOutcome,
        dpi_x: f64,
        dpi_y: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<TextBlockPlacement>, OverlayError> {
        let fragments = self.translate_outcome(outcome, cancel).await?;
        Ok(self.placements(&fragments, dpi_x, dpi_y))
    }

    /// Validates, merges and translates a recognition result. The returned
    /// fragments are still in image pixel space.
    pub async fn translate_outcome(
        &self,
        outcome: RecognitionOutcome,
        cancel: &CancellationToken,
    ) -> Result<Vec<RecognizedFragment>, OverlayError> {
        if !outcome.success || outcome.text.trim().is_empty() {
            return Err(OverlayError::RecognitionFailed(
                "recognizer returned no text".to_string(),
            ));
        }
        if !outcome.has_geometry() {
            return Err(OverlayError::NoGeometry);
        }

        let mut fragments = merge_fragments(outcome.fragments);
        let translator = self
            .translator
            .clone()
            .ok_or(OverlayError::TranslationUnavailable)?;

        let report = translate_all(
            &mut fragments,
            Arc::clone(&self.detector),
            translator,
            &self.config.translate,
            cancel,
        )
        .await?;
        debug!(
            translated = report.translated,
            failed = report.failures.len(),
            "fragments translated"
        );
        Ok(fragments)
    }

    pub fn placements(
        &self,
        fragments: &[RecognizedFragment],
        dpi_x: f64,
        dpi_y: f64,
    ) -> Vec<TextBlockPlacement> {
        let placements = build_placements(
            fragments,
            dpi_x,
            dpi_y,
            self.config.fit.strategy(),
            self.config.font_range,
            self.measure.as_ref(),
        );
        debug!(placements = placements.len(), "placements built");
        placements
    }
}

/// Converts pixel-space fragments into logical placements, ordered by
/// position (top, then left).
pub fn build_placements(
    fragments: &[RecognizedFragment],
    dpi_x: f64,
    dpi_y: f64,
    strategy: &dyn FitStrategy,
    range: FontSizeRange,
    measure: &dyn TextMeasure,
) -> Vec<TextBlockPlacement> {
    let mut placements = fragments
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .filter_map(|fragment| {
            let bounds = pixel_to_logical(fragment.bounds()?, dpi_x, dpi_y);
            let fitted = strategy.fit(&fragment.text, &bounds, range, measure);
            Some(TextBlockPlacement {
                text: fitted.text,
                bounds,
                font_size: fitted.font_size,
            })
        })
        .collect::<Vec<_>>();
    placements.sort_by(|a, b| {
        a.bounds
            .top
            .partial_cmp(&b.bounds.top)
            .unwrap_or(CmpOrdering::Equal)
            .then(
                a.bounds
                    .left
                    .partial_cmp(&b.bounds.left)
                    .unwrap_or(CmpOrdering::Equal),
            )
    });
    placements
}

#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub screen_bounds: ScreenRect,
    pub placements: Vec<TextBlockPlacement>,
}

/// One overlay surface's run loop: capture, recognize, place. Only one run
/// may be in flight at a time.
pub struct OverlaySession {
    pipeline: OverlayPipeline,
    capture: Arc<dyn ScreenCapture>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    ocr_language: String,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OverlaySession {
    pub fn new(
        pipeline: OverlayPipeline,
        capture: Arc<dyn ScreenCapture>,
        recognizer: Option<Arc<dyn TextRecognizer>>,
        ocr_language: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            capture,
            recognizer,
            ocr_language: ocr_language.into(),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn execute(&self, cancel: &CancellationToken) -> Result<SessionOutput, OverlayError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OverlayError::Busy);
        }
        let _guard = RunGuard(&self.running);

        let result = self.run(cancel).await;
        if let Err(err) = &result {
            report_failure(err);
        }
        result
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<SessionOutput, OverlayError> {
        let captured = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OverlayError::OperationCancelled),
            captured = self.capture.capture_region() => captured,
        };
        let region = captured
            .map_err(|err| OverlayError::RecognitionFailed(format!("capture failed: {err}")))?
            .ok_or(OverlayError::AcquisitionCancelled)?;

        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(OverlayError::RecognitionUnavailable)?;
        let recognized = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OverlayError::OperationCancelled),
            recognized = recognizer.recognize(&region.image, &self.ocr_language) => recognized,
        };
        let outcome =
            recognized.map_err(|err| OverlayError::RecognitionFailed(err.to_string()))?;

        let placements = self
            .pipeline
            .place(outcome, region.dpi_x, region.dpi_y, cancel)
            .await?;
        info!(placements = placements.len(), "overlay ready");
        Ok(SessionOutput {
            screen_bounds: region.screen_bounds,
            placements,
        })
    }
}

fn report_failure(err: &OverlayError) {
    match err.user_notice() {
        Some(notice) => error!("overlay translation failed: {}", notice),
        None => debug!(error = %err, "overlay run ended quietly"),
    }
}
