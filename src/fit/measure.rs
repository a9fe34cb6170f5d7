use super::{TextExtent, TextMeasure};

const LINE_HEIGHT: f64 = 1.2;

/// Font-free measurement from per-character width estimates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMeasure;

impl TextMeasure for EstimatedMeasure {
    fn measure(&self, text: &str, font_size: f64) -> TextExtent {
        let mut lines = 0usize;
        let mut widest = 0.0f64;
        for line in text.split('\n') {
            lines += 1;
            widest = widest.max(estimate_text_width_units(line));
        }
        TextExtent {
            width: widest * font_size,
            height: lines.max(1) as f64 * font_size * LINE_HEIGHT,
        }
    }
}

fn is_cjk(ch: char) -> bool {
    matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0x3400..=0x4DBF
    )
}

fn estimate_char_units(ch: char) -> f64 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if is_cjk(ch) {
        1.0
    } else {
        0.9
    }
}

pub(super) fn estimate_text_width_units(text: &str) -> f64 {
    text.chars().map(estimate_char_units).sum()
}
