use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::fit::{FitMode, FontSizeRange};
use crate::pipeline::PipelineConfig;
use crate::translate::TranslateOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const HOME_DIR_NAME: &str = ".overlay-translator-rust";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub min_font_size: f64,
    pub max_font_size: f64,
    pub fit: FitMode,
    pub source_lang: String,
    pub target_lang: String,
    pub concurrency: usize,
    pub overlay_text_color: String,
    pub overlay_fill_color: String,
    pub overlay_font_family: Option<String>,
    pub overlay_font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_font_size: 8.0,
            max_font_size: 72.0,
            fit: FitMode::Live,
            source_lang: "auto".to_string(),
            target_lang: "en".to_string(),
            concurrency: 0,
            overlay_text_color: "#000000".to_string(),
            overlay_fill_color: "#ffffff".to_string(),
            overlay_font_family: None,
            overlay_font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    layout: Option<LayoutSettings>,
    translate: Option<TranslateSettings>,
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSettings {
    min_font_size: Option<f64>,
    max_font_size: Option<f64>,
    fit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    source_lang: Option<String>,
    target_lang: Option<String>,
    concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    text_color: Option<String>,
    fill_color: Option<String>,
    font_family: Option<String>,
    font_path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).context("failed to parse embedded settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn font_range(&self) -> FontSizeRange {
        FontSizeRange::new(self.min_font_size, self.max_font_size)
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            concurrency: Some(self.concurrency),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fit: self.fit,
            font_range: self.font_range(),
            translate: self.translate_options(),
        }
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(layout) = incoming.layout {
            let min = layout
                .min_font_size
                .filter(|size| size.is_finite() && *size > 0.0)
                .unwrap_or(self.min_font_size);
            let max = layout
                .max_font_size
                .filter(|size| size.is_finite() && *size > 0.0)
                .unwrap_or(self.max_font_size);
            if min <= max {
                self.min_font_size = min;
                self.max_font_size = max;
            } else {
                warn!(min, max, "ignoring font size range with min above max");
            }
            if let Some(fit) = layout.fit {
                match FitMode::parse(&fit) {
                    Some(mode) => self.fit = mode,
                    None => warn!(value = %fit, "ignoring unknown fit mode"),
                }
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(lang) = translate.source_lang
                && !lang.trim().is_empty()
            {
                self.source_lang = lang.trim().to_string();
            }
            if let Some(lang) = translate.target_lang
                && !lang.trim().is_empty()
            {
                self.target_lang = lang.trim().to_string();
            }
            if let Some(concurrency) = translate.concurrency {
                self.concurrency = concurrency;
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = overlay.text_color
                && !color.trim().is_empty()
            {
                self.overlay_text_color = color;
            }
            if let Some(color) = overlay.fill_color
                && !color.trim().is_empty()
            {
                self.overlay_fill_color = color;
            }
            if let Some(family) = overlay.font_family
                && !family.trim().is_empty()
            {
                self.overlay_font_family = Some(family);
            }
            if let Some(path) = overlay.font_path
                && !path.trim().is_empty()
            {
                self.overlay_font_path = Some(path);
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(HOME_DIR_NAME))
        }
    })
}
