mod controller;
mod element;

use serde::{Deserialize, Serialize};

use crate::ocr::Rect;

pub use controller::{BackgroundAction, OverlayController};
pub use element::{ElementId, ElementState, Highlight, OverlayElement, ZoomDirection};

/// Point in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size in logical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A translated fragment ready to be shown: logical bounds plus the font
/// size chosen for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlockPlacement {
    pub text: String,
    pub bounds: Rect,
    #[serde(rename = "fontSize", alias = "font_size")]
    pub font_size: f64,
}
