mod font;
mod measure;

use serde::{Deserialize, Serialize};

use crate::ocr::Rect;

pub use font::{
    FALLBACK_FAMILIES, FontMeasure, FontMetrics, ResolvedOverlayFont, load_font_metrics,
    resolve_overlay_font,
};
pub use measure::EstimatedMeasure;

pub const ELLIPSIS: &str = "...";

/// Rendered extent of a string, in the same unit as the target box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Measures a single run of text at a given font size.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> TextExtent;
}

impl<M: TextMeasure + ?Sized> TextMeasure for &M {
    fn measure(&self, text: &str, font_size: f64) -> TextExtent {
        (**self).measure(text, font_size)
    }
}

/// Inclusive font size bounds; `new` keeps `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizeRange {
    min: f64,
    max: f64,
}

impl FontSizeRange {
    pub fn new(min: f64, max: f64) -> Self {
        let min = if min.is_finite() && min > 0.0 { min } else { 1.0 };
        let max = if max.is_finite() { max.max(min) } else { min };
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn clamp(&self, size: f64) -> f64 {
        if size.is_nan() {
            return self.min;
        }
        size.clamp(self.min, self.max)
    }
}

impl Default for FontSizeRange {
    fn default() -> Self {
        Self::new(8.0, 72.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub text: String,
    pub font_size: f64,
    pub truncated: bool,
}

/// Chooses a font size (and possibly a shortened text) for a fixed box.
pub trait FitStrategy {
    fn fit(
        &self,
        text: &str,
        bounds: &Rect,
        range: FontSizeRange,
        measure: &dyn TextMeasure,
    ) -> FitOutcome;
}

/// Which strategy a caller context wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Cheap single-pass sizing used while the overlay is interactive.
    #[default]
    Live,
    /// Measured binary search with truncation, used for offline renders.
    Precise,
}

impl FitMode {
    pub fn strategy(self) -> &'static dyn FitStrategy {
        match self {
            FitMode::Live => &LiveFit,
            FitMode::Precise => &PreciseFit,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => Some(FitMode::Live),
            "precise" => Some(FitMode::Precise),
            _ => None,
        }
    }
}

/// Binary search for the largest size that fits, then ellipsis truncation
/// when even the smallest size overflows.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreciseFit;

const SEARCH_TOLERANCE: f64 = 0.5;

impl FitStrategy for PreciseFit {
    fn fit(
        &self,
        text: &str,
        bounds: &Rect,
        range: FontSizeRange,
        measure: &dyn TextMeasure,
    ) -> FitOutcome {
        let width = finite_or_zero(bounds.width);
        let height = finite_or_zero(bounds.height);
        let fits = |candidate: &str, size: f64| {
            let extent = measure.measure(candidate, size);
            extent.width <= width && extent.height <= height
        };

        let initial = range.clamp((height * 0.7).min(width * 0.12));
        let font_size = if fits(text, initial) {
            initial
        } else {
            let mut best = range.min();
            let mut low = range.min();
            let mut high = initial;
            while high - low > SEARCH_TOLERANCE {
                let mid = (low + high) / 2.0;
                if fits(text, mid) {
                    best = mid;
                    low = mid;
                } else {
                    high = mid;
                }
            }
            best
        };

        if fits(text, font_size) {
            return FitOutcome {
                text: text.to_string(),
                font_size,
                truncated: false,
            };
        }

        let shortened = truncate_to_fit(text, font_size, width, height, |candidate| {
            fits(candidate, font_size)
        });
        FitOutcome {
            truncated: shortened != text,
            text: shortened,
            font_size,
        }
    }
}

fn truncate_to_fit(
    text: &str,
    font_size: f64,
    width: f64,
    height: f64,
    fits: impl Fn(&str) -> bool,
) -> String {
    let per_line = ((width / (font_size * 0.6)).floor() as usize).max(1);
    let lines = ((height / (font_size * 1.2)).floor() as usize).max(1);
    let capacity = per_line.saturating_mul(lines);

    let mut candidate = if text.chars().count() <= capacity {
        text.to_string()
    } else if capacity > 3 {
        format!("{}{}", take_chars(text, capacity - 3), ELLIPSIS)
    } else {
        take_chars(text, capacity)
    };

    while candidate.chars().count() > 4 && !fits(&candidate) {
        let body = candidate.strip_suffix(ELLIPSIS).unwrap_or(&candidate);
        let keep = body.chars().count().saturating_sub(4);
        candidate = format!("{}{}", take_chars(body, keep), ELLIPSIS);
    }
    candidate
}

/// Snap to 75% of the box height, then shrink once in proportion to any
/// width overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveFit;

const LIVE_MIN_SIZE: f64 = 10.0;
const LIVE_MAX_SIZE: f64 = 48.0;

impl FitStrategy for LiveFit {
    fn fit(
        &self,
        text: &str,
        bounds: &Rect,
        range: FontSizeRange,
        measure: &dyn TextMeasure,
    ) -> FitOutcome {
        let width = finite_or_zero(bounds.width);
        let height = finite_or_zero(bounds.height);
        let mut font_size = (height * 0.75).clamp(LIVE_MIN_SIZE, LIVE_MAX_SIZE);
        let measured = measure.measure(text, font_size).width;
        if measured > width && width > 0.0 {
            font_size *= width / measured;
        }
        FitOutcome {
            text: text.to_string(),
            font_size: range.clamp(font_size),
            truncated: false,
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn take_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is `size * 0.5` wide; one line is `size` tall.
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn measure(&self, text: &str, font_size: f64) -> TextExtent {
            TextExtent {
                width: text.chars().count() as f64 * font_size * 0.5,
                height: font_size,
            }
        }
    }

    fn range() -> FontSizeRange {
        FontSizeRange::new(8.0, 72.0)
    }

    #[test]
    fn precise_uses_initial_candidate_when_it_fits() {
        let bounds = Rect::new(0.0, 0.0, 200.0, 30.0);
        let outcome = PreciseFit.fit("Hi", &bounds, range(), &FixedMeasure);
        // min(30 * 0.7, 200 * 0.12) = 21
        assert!((outcome.font_size - 21.0).abs() < 1e-9);
        assert_eq!(outcome.text, "Hi");
        assert!(!outcome.truncated);
    }

    #[test]
    fn precise_searches_down_for_long_text() {
        let bounds = Rect::new(0.0, 0.0, 200.0, 30.0);
        let text = "abcdefghijklmnopqrstuvwxyz1234";
        let outcome = PreciseFit.fit(text, &bounds, range(), &FixedMeasure);
        // 30 chars * size * 0.5 <= 200 -> size <= 13.33
        assert!(outcome.font_size <= 200.0 / 15.0);
        assert!(outcome.font_size >= 200.0 / 15.0 - SEARCH_TOLERANCE);
        assert_eq!(outcome.text, text);
    }

    #[test]
    fn precise_truncates_when_min_size_overflows() {
        let bounds = Rect::new(0.0, 0.0, 40.0, 10.0);
        let text = "a fairly long sentence that cannot possibly fit";
        let outcome = PreciseFit.fit(text, &bounds, range(), &FixedMeasure);
        assert_eq!(outcome.font_size, 8.0);
        assert!(outcome.truncated);
        assert!(outcome.text.ends_with(ELLIPSIS));
        let extent = FixedMeasure.measure(&outcome.text, outcome.font_size);
        assert!(extent.width <= 40.0);
    }

    #[test]
    fn truncation_stops_at_four_characters() {
        let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        let outcome = PreciseFit.fit("overflowing everywhere", &bounds, range(), &FixedMeasure);
        assert!(outcome.text.chars().count() <= 4);
        assert_eq!(outcome.font_size, 8.0);
    }

    #[test]
    fn precise_terminates_on_degenerate_input() {
        let huge = "x".repeat(50_000);
        for bounds in [
            Rect::new(0.0, 0.0, 0.0, 0.0),
            Rect::new(0.0, 0.0, f64::NAN, f64::INFINITY),
            Rect::new(0.0, 0.0, -5.0, 20.0),
        ] {
            for text in ["", huge.as_str()] {
                let outcome = PreciseFit.fit(text, &bounds, range(), &FixedMeasure);
                assert!((8.0..=72.0).contains(&outcome.font_size));
            }
        }
    }

    #[test]
    fn live_snaps_to_box_height() {
        let bounds = Rect::new(0.0, 0.0, 500.0, 40.0);
        let outcome = LiveFit.fit("ok", &bounds, range(), &FixedMeasure);
        assert_eq!(outcome.font_size, 30.0);
    }

    #[test]
    fn live_clamps_its_own_bounds() {
        let tall = Rect::new(0.0, 0.0, 5000.0, 400.0);
        assert_eq!(LiveFit.fit("x", &tall, range(), &FixedMeasure).font_size, 48.0);
        let tiny = Rect::new(0.0, 0.0, 5000.0, 4.0);
        assert_eq!(LiveFit.fit("x", &tiny, range(), &FixedMeasure).font_size, 10.0);
    }

    #[test]
    fn live_shrinks_once_for_width() {
        let bounds = Rect::new(0.0, 0.0, 60.0, 40.0);
        // at 30: 10 chars -> 150 wide, ratio 0.4 -> 12
        let outcome = LiveFit.fit("abcdefghij", &bounds, range(), &FixedMeasure);
        assert!((outcome.font_size - 12.0).abs() < 1e-9);
    }

    #[test]
    fn live_result_respects_caller_range() {
        let bounds = Rect::new(0.0, 0.0, 2.0, 40.0);
        let outcome = LiveFit.fit("abcdefghij", &bounds, range(), &FixedMeasure);
        assert_eq!(outcome.font_size, 8.0);
    }

    #[test]
    fn range_keeps_order() {
        let range = FontSizeRange::new(20.0, 10.0);
        assert_eq!(range.min(), 20.0);
        assert_eq!(range.max(), 20.0);
        assert_eq!(range.clamp(f64::NAN), 20.0);
    }

    #[test]
    fn fit_mode_parses_and_selects() {
        assert_eq!(FitMode::parse(" Precise "), Some(FitMode::Precise));
        assert_eq!(FitMode::parse("live"), Some(FitMode::Live));
        assert_eq!(FitMode::parse("fast"), None);
        let bounds = Rect::new(0.0, 0.0, 500.0, 40.0);
        let live = FitMode::Live.strategy().fit("ok", &bounds, range(), &FixedMeasure);
        assert_eq!(live.font_size, 30.0);
    }
}
