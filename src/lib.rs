use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub mod coords;
pub mod error;
pub mod fit;
pub mod logging;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod render;
pub mod settings;
pub mod translate;

#[cfg(test)]
mod test_util;

pub use error::OverlayError;
pub use fit::{FitMode, FitOutcome, FitStrategy, FontSizeRange, TextMeasure};
pub use ocr::{BoxPoint, RecognitionOutcome, RecognizedFragment, Rect};
pub use overlay::{OverlayController, OverlayElement, TextBlockPlacement};
pub use pipeline::{OverlayPipeline, OverlaySession, PipelineConfig};
pub use translate::{CancellationToken, TranslateOptions};

use fit::{EstimatedMeasure, FALLBACK_FAMILIES, FontMeasure, resolve_overlay_font};
use render::OverlayStyle;
use translate::{PassthroughTranslator, StaticDetector};

#[derive(Debug, Clone)]
pub struct Config {
    pub dpi_x: f64,
    pub dpi_y: f64,
    pub fit: Option<FitMode>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub concurrency: Option<usize>,
    pub render_svg: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub settings_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dpi_x: coords::DEFAULT_DPI,
            dpi_y: coords::DEFAULT_DPI,
            fit: None,
            source_lang: None,
            target_lang: None,
            concurrency: None,
            render_svg: None,
            image: None,
            settings_path: None,
        }
    }
}

/// Runs a recognition result (JSON) through merge, translation and fitting
/// and returns the placements as pretty JSON. Text passes through unchanged
/// since no translation engine is wired into the command line.
pub async fn run(config: Config, input: &str) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config);

    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("recognition input is empty"));
    }
    let outcome: RecognitionOutcome =
        serde_json::from_str(input).with_context(|| "failed to parse recognition result JSON")?;

    let options = settings.translate_options();
    let measure = build_measure(&settings)?;
    let pipeline = OverlayPipeline::new(
        Arc::new(StaticDetector::new(options.default_pair())),
        Some(Arc::new(PassthroughTranslator)),
        Arc::clone(&measure),
        settings.pipeline_config(),
    );
    let fragments = pipeline
        .translate_outcome(outcome, &CancellationToken::new())
        .await?;
    let placements = pipeline.placements(&fragments, config.dpi_x, config.dpi_y);

    if let Some(out) = config.render_svg.as_deref() {
        let image_path = config
            .image
            .as_deref()
            .ok_or_else(|| anyhow!("--render-svg requires --image"))?;
        let bytes = std::fs::read(image_path)
            .with_context(|| format!("failed to read image: {}", image_path.display()))?;
        let image = render::inspect_image(&bytes)?;
        let svg = render::render_svg(
            &bytes,
            image.mime,
            image.width,
            image.height,
            &fragments,
            &OverlayStyle::from_settings(&settings),
            measure.as_ref(),
        )?;
        std::fs::write(out, svg)
            .with_context(|| format!("failed to write svg: {}", out.display()))?;
        info!(path = %out.display(), "overlay svg written");
    }

    serde_json::to_string_pretty(&placements).with_context(|| "failed to serialize placements")
}

fn apply_overrides(settings: &mut settings::Settings, config: &Config) {
    if let Some(fit) = config.fit {
        settings.fit = fit;
    }
    if let Some(lang) = config.source_lang.as_deref().filter(|v| !v.trim().is_empty()) {
        settings.source_lang = lang.trim().to_string();
    }
    if let Some(lang) = config.target_lang.as_deref().filter(|v| !v.trim().is_empty()) {
        settings.target_lang = lang.trim().to_string();
    }
    if let Some(concurrency) = config.concurrency {
        settings.concurrency = concurrency;
    }
}

fn build_measure(settings: &settings::Settings) -> Result<Arc<dyn TextMeasure + Send + Sync>> {
    if let Some(path) = settings.overlay_font_path.as_deref() {
        let resolved = resolve_overlay_font(
            Some(Path::new(path)),
            settings.overlay_font_family.as_deref(),
            &[],
        )?;
        info!(family = %resolved.family, "measuring with overlay font file");
        return Ok(Arc::new(FontMeasure::new(resolved.metrics)));
    }
    let Some(family) = settings.overlay_font_family.as_deref() else {
        return Ok(Arc::new(EstimatedMeasure));
    };
    match resolve_overlay_font(None, Some(family), FALLBACK_FAMILIES) {
        Ok(resolved) => {
            info!(family = %resolved.family, "measuring with system font");
            Ok(Arc::new(FontMeasure::new(resolved.metrics)))
        }
        Err(err) => {
            warn!(family, error = %err, "no system font found; estimating text width");
            Ok(Arc::new(EstimatedMeasure))
        }
    }
}
