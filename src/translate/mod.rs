mod cancel;

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::OverlayError;
use crate::ocr::RecognizedFragment;

pub use cancel::CancellationToken;

pub type DetectionFuture<'a> = Pin<Box<dyn Future<Output = Result<LanguagePair>> + Send + 'a>>;
pub type TranslationFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

pub trait LanguageDetector: Send + Sync {
    fn detect<'a>(&'a self, text: &'a str) -> DetectionFuture<'a>;
}

pub trait FragmentTranslator: Send + Sync {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source: &'a str,
        target: &'a str,
    ) -> TranslationFuture<'a>;
}

/// Always answers with the same pairing.
#[derive(Debug, Clone)]
pub struct StaticDetector {
    pair: LanguagePair,
}

impl StaticDetector {
    pub fn new(pair: LanguagePair) -> Self {
        Self { pair }
    }
}

impl LanguageDetector for StaticDetector {
    fn detect<'a>(&'a self, _text: &'a str) -> DetectionFuture<'a> {
        let pair = self.pair.clone();
        Box::pin(async move { Ok(pair) })
    }
}

/// Hands the source text back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl FragmentTranslator for PassthroughTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        _source: &'a str,
        _target: &'a str,
    ) -> TranslationFuture<'a> {
        Box::pin(async move { Ok(text.to_string()) })
    }
}

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_lang: String,
    pub target_lang: String,
    /// Worker limit; `None` or 0 means the host's available parallelism.
    pub concurrency: Option<usize>,
}

impl TranslateOptions {
    pub fn default_pair(&self) -> LanguagePair {
        LanguagePair::new(self.source_lang.clone(), self.target_lang.clone())
    }

    pub fn concurrency(&self) -> usize {
        match self.concurrency {
            Some(limit) if limit > 0 => limit,
            _ => num_cpus::get().max(1),
        }
    }
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            source_lang: "auto".to_string(),
            target_lang: "en".to_string(),
            concurrency: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TranslationReport {
    pub translated: usize,
    pub detection_failures: usize,
    /// Per-fragment failures; those fragments kept their source text.
    pub failures: Vec<OverlayError>,
}

enum FragmentOutcome {
    Translated(String),
    Failed(String),
    Cancelled,
}

struct FragmentResult {
    outcome: FragmentOutcome,
    detection_failed: bool,
}

/// Translates every fragment in place with bounded parallelism.
///
/// Returns once all fragment tasks have settled. A failed fragment keeps its
/// text. Cancellation returns `OperationCancelled`; fragments that finished
/// before the signal keep their translation.
pub async fn translate_all(
    fragments: &mut [RecognizedFragment],
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn FragmentTranslator>,
    options: &TranslateOptions,
    cancel: &CancellationToken,
) -> Result<TranslationReport, OverlayError> {
    if cancel.is_cancelled() {
        return Err(OverlayError::OperationCancelled);
    }

    let concurrency = options.concurrency();
    let defaults = options.default_pair();
    let jobs = fragments
        .iter()
        .enumerate()
        .map(|(index, fragment)| (index, fragment.text.clone()))
        .collect::<Vec<_>>();
    debug!(fragments = jobs.len(), concurrency, "translation fan-out");

    let mut pending = stream::iter(jobs)
        .map(|(index, text)| {
            let detector = Arc::clone(&detector);
            let translator = Arc::clone(&translator);
            let defaults = defaults.clone();
            let token = cancel.clone();
            let handle = tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => FragmentResult {
                        outcome: FragmentOutcome::Cancelled,
                        detection_failed: false,
                    },
                    result = translate_fragment(
                        index,
                        &text,
                        detector.as_ref(),
                        translator.as_ref(),
                        defaults,
                    ) => result,
                }
            });
            async move { (index, handle.await) }
        })
        .buffer_unordered(concurrency);

    let mut report = TranslationReport::default();
    let mut cancelled = false;
    loop {
        // After cancellation keep draining so every spawned task has settled
        // before returning.
        let next = if cancelled {
            pending.next().await
        } else {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = pending.next() => Some(next),
            };
            let Some(next) = polled else {
                cancelled = true;
                continue;
            };
            next
        };
        let Some((index, joined)) = next else {
            break;
        };
        let result = match joined {
            Ok(result) => result,
            Err(err) => {
                warn!(index, error = %err, "translation task aborted");
                report.failures.push(OverlayError::TranslationFailed {
                    index,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        if result.detection_failed {
            report.detection_failures += 1;
        }
        match result.outcome {
            FragmentOutcome::Translated(text) => {
                fragments[index].text = text;
                report.translated += 1;
            }
            FragmentOutcome::Failed(reason) => {
                report
                    .failures
                    .push(OverlayError::TranslationFailed { index, reason });
            }
            FragmentOutcome::Cancelled => {}
        }
    }

    if cancelled {
        info!(
            translated = report.translated,
            "overlay translation cancelled"
        );
        return Err(OverlayError::OperationCancelled);
    }
    Ok(report)
}

async fn translate_fragment(
    index: usize,
    text: &str,
    detector: &dyn LanguageDetector,
    translator: &dyn FragmentTranslator,
    defaults: LanguagePair,
) -> FragmentResult {
    let (pair, detection_failed) = match detector.detect(text).await {
        Ok(pair) => (pair, false),
        Err(err) => {
            warn!(index, text, error = %err, "language detection failed");
            (defaults, true)
        }
    };

    let outcome = match translator.translate(text, &pair.source, &pair.target).await {
        Ok(translated) if !translated.trim().is_empty() => FragmentOutcome::Translated(translated),
        Ok(_) => {
            warn!(index, "translation came back empty; keeping source text");
            FragmentOutcome::Failed("empty translation".to_string())
        }
        Err(err) => {
            warn!(index, error = %err, "translation failed; keeping source text");
            FragmentOutcome::Failed(err.to_string())
        }
    };
    FragmentResult {
        outcome,
        detection_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingDetector;

    impl LanguageDetector for FailingDetector {
        fn detect<'a>(&'a self, _text: &'a str) -> DetectionFuture<'a> {
            Box::pin(async { Err(anyhow!("detector offline")) })
        }
    }

    /// Upper-cases text after a per-text delay; fails on "boom".
    #[derive(Default)]
    struct TestTranslator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        pairs: Mutex<Vec<(String, String)>>,
    }

    impl FragmentTranslator for TestTranslator {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            source: &'a str,
            target: &'a str,
        ) -> TranslationFuture<'a> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                if let Ok(mut pairs) = self.pairs.lock() {
                    pairs.push((source.to_string(), target.to_string()));
                }
                let delay = if text.starts_with("slow") { 400 } else { 10 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                if text == "boom" {
                    return Err(anyhow!("engine refused"));
                }
                Ok(text.to_uppercase())
            })
        }
    }

    fn fragments(texts: &[&str]) -> Vec<RecognizedFragment> {
        texts
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let y = idx as i32 * 40;
                RecognizedFragment::from_corners(*text, 0, y, 50, y + 20)
            })
            .collect()
    }

    fn detector() -> Arc<dyn LanguageDetector> {
        Arc::new(StaticDetector::new(LanguagePair::new("de", "en")))
    }

    #[tokio::test]
    async fn failed_fragment_keeps_source_text() {
        let mut items = fragments(&["eins", "boom", "drei"]);
        let translator = Arc::new(TestTranslator::default());
        let report = translate_all(
            &mut items,
            detector(),
            translator,
            &TranslateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("translated");

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].text, "EINS");
        assert_eq!(items[1].text, "boom");
        assert_eq!(items[2].text, "DREI");
        assert_eq!(report.translated, 2);
        assert!(matches!(
            report.failures.as_slice(),
            [OverlayError::TranslationFailed { index: 1, .. }]
        ));
    }

    #[tokio::test]
    async fn detection_failure_uses_default_pairing() {
        let mut items = fragments(&["hallo"]);
        let translator = Arc::new(TestTranslator::default());
        let options = TranslateOptions {
            source_lang: "auto".to_string(),
            target_lang: "ja".to_string(),
            concurrency: Some(1),
        };
        let report = translate_all(
            &mut items,
            Arc::new(FailingDetector),
            translator.clone(),
            &options,
            &CancellationToken::new(),
        )
        .await
        .expect("translated");

        assert_eq!(report.detection_failures, 1);
        assert_eq!(items[0].text, "HALLO");
        let pairs = translator.pairs.lock().expect("pairs");
        assert_eq!(pairs.as_slice(), &[("auto".to_string(), "ja".to_string())]);
    }

    #[tokio::test]
    async fn completion_order_does_not_move_results() {
        let mut items = fragments(&["slow first", "quick", "also quick"]);
        translate_all(
            &mut items,
            detector(),
            Arc::new(TestTranslator::default()),
            &TranslateOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("translated");
        let texts = items.iter().map(|f| f.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["SLOW FIRST", "QUICK", "ALSO QUICK"]);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let mut items = fragments(&["a", "b", "c", "d", "e", "f"]);
        let translator = Arc::new(TestTranslator::default());
        let options = TranslateOptions {
            concurrency: Some(2),
            ..TranslateOptions::default()
        };
        translate_all(
            &mut items,
            detector(),
            translator.clone(),
            &options,
            &CancellationToken::new(),
        )
        .await
        .expect("translated");
        assert!(translator.peak.load(Ordering::SeqCst) <= 2);
        assert!(items.iter().all(|f| f.text == f.text.to_uppercase()));
    }

    #[tokio::test]
    async fn cancellation_keeps_finished_fragments() {
        let mut items = fragments(&["quick", "slow tail"]);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });
        let result = translate_all(
            &mut items,
            detector(),
            Arc::new(TestTranslator::default()),
            &TranslateOptions::default(),
            &token,
        )
        .await;

        assert!(matches!(result, Err(OverlayError::OperationCancelled)));
        assert_eq!(items[0].text, "QUICK");
        assert_eq!(items[1].text, "slow tail");
    }

    /// Never finishes on its own; counts how many of its futures are alive.
    #[derive(Default)]
    struct HangingTranslator {
        alive: Arc<AtomicUsize>,
    }

    struct AliveGuard(Arc<AtomicUsize>);

    impl Drop for AliveGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl FragmentTranslator for HangingTranslator {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            _source: &'a str,
            _target: &'a str,
        ) -> TranslationFuture<'a> {
            self.alive.fetch_add(1, Ordering::SeqCst);
            let guard = AliveGuard(Arc::clone(&self.alive));
            Box::pin(async move {
                let _guard = guard;
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(text.to_uppercase())
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancellation_waits_for_every_task_to_settle() {
        let mut items = fragments(&["a", "b", "c", "d"]);
        let translator = Arc::new(HangingTranslator::default());
        let alive = Arc::clone(&translator.alive);
        let options = TranslateOptions {
            concurrency: Some(4),
            ..TranslateOptions::default()
        };
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = translate_all(&mut items, detector(), translator, &options, &token).await;

        assert!(matches!(result, Err(OverlayError::OperationCancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(alive.load(Ordering::SeqCst), 0);
        assert!(items.iter().all(|f| f.text == f.text.to_lowercase()));
    }

    #[tokio::test]
    async fn cancelled_before_start_does_nothing() {
        let mut items = fragments(&["x"]);
        let token = CancellationToken::new();
        token.cancel();
        let result = translate_all(
            &mut items,
            detector(),
            Arc::new(PassthroughTranslator),
            &TranslateOptions::default(),
            &token,
        )
        .await;
        assert!(matches!(result, Err(OverlayError::OperationCancelled)));
        assert_eq!(items[0].text, "x");
    }

    #[test]
    fn zero_concurrency_means_host_parallelism() {
        let options = TranslateOptions {
            concurrency: Some(0),
            ..TranslateOptions::default()
        };
        assert_eq!(options.concurrency(), num_cpus::get().max(1));
    }
}
