//! Conversions between image pixels, logical units and physical screen
//! pixels. Everything here is a pure function of its arguments.

use serde::{Deserialize, Serialize};

use crate::ocr::Rect;

/// Logical units per inch.
pub const DEFAULT_DPI: f64 = 96.0;

/// Integer point in physical screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

/// Rectangle in physical screen pixels; sides are never smaller than 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Falls back to 96 for sources that report no usable DPI.
pub fn normalize_dpi(dpi: f64) -> f64 {
    if dpi.is_finite() && dpi > 0.0 {
        dpi
    } else {
        DEFAULT_DPI
    }
}

/// Falls back to 1.0 for a missing or nonsensical DPI scale.
pub fn normalize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

pub fn pixel_to_logical(rect: Rect, dpi_x: f64, dpi_y: f64) -> Rect {
    let sx = DEFAULT_DPI / normalize_dpi(dpi_x);
    let sy = DEFAULT_DPI / normalize_dpi(dpi_y);
    scale_rect(rect, sx, sy)
}

pub fn logical_to_pixel(rect: Rect, dpi_x: f64, dpi_y: f64) -> Rect {
    let sx = normalize_dpi(dpi_x) / DEFAULT_DPI;
    let sy = normalize_dpi(dpi_y) / DEFAULT_DPI;
    scale_rect(rect, sx, sy)
}

pub fn logical_to_screen(
    rect: Rect,
    window_origin: ScreenPoint,
    dpi_scale_x: f64,
    dpi_scale_y: f64,
) -> ScreenRect {
    let sx = normalize_scale(dpi_scale_x);
    let sy = normalize_scale(dpi_scale_y);
    ScreenRect {
        x: window_origin.x.saturating_add((rect.left * sx).round() as i32),
        y: window_origin.y.saturating_add((rect.top * sy).round() as i32),
        width: screen_extent(rect.width * sx),
        height: screen_extent(rect.height * sy),
    }
}

/// Rounded side length, at least one pixel and saturating at `u32::MAX`.
fn screen_extent(value: f64) -> u32 {
    // float-to-int casts saturate and map NaN to 0
    (value.round() as i64).clamp(1, u32::MAX as i64) as u32
}

fn scale_rect(rect: Rect, sx: f64, sy: f64) -> Rect {
    Rect::new(
        rect.left * sx,
        rect.top * sy,
        rect.width * sx,
        rect.height * sy,
    )
}
