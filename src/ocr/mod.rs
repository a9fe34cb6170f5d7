mod geom;
mod merge;
mod text;

use serde::{Deserialize, Serialize};

pub use geom::{horizontal_gap, is_adjacent, vertical_overlap_ratio};
pub use merge::merge_fragments;

/// Integer corner of a recognized shape, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxPoint {
    pub x: i32,
    pub y: i32,
}

impl BoxPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One piece of recognized text and the shape it was found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFragment {
    pub text: String,
    #[serde(default, rename = "boxPoints", alias = "box_points")]
    pub box_points: Vec<BoxPoint>,
}

impl RecognizedFragment {
    pub fn new(text: impl Into<String>, box_points: Vec<BoxPoint>) -> Self {
        Self {
            text: text.into(),
            box_points,
        }
    }

    /// Fragment covering the axis-aligned rectangle `(x1, y1)-(x2, y2)`.
    pub fn from_corners(text: impl Into<String>, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(text, Rect::from_edges(x1, y1, x2, y2).corner_points())
    }

    pub fn has_geometry(&self) -> bool {
        !self.box_points.is_empty()
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.box_points)
    }
}

/// What the recognizer hands back for one captured image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub success: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fragments: Vec<RecognizedFragment>,
}

impl RecognitionOutcome {
    pub fn has_geometry(&self) -> bool {
        self.fragments.iter().any(RecognizedFragment::has_geometry)
    }
}

/// Axis-aligned rectangle. The coordinate space (pixel or logical) is
/// implied by where the value is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_edges(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        Self::new(
            left as f64,
            top as f64,
            (right - left) as f64,
            (bottom - top) as f64,
        )
    }

    /// Bounding rectangle of a point set; `None` for an empty set.
    pub fn bounding(points: &[BoxPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Self::from_edges(min_x, min_y, max_x, max_y))
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Corners in box order: top-left, top-right, bottom-right, bottom-left.
    pub fn corner_points(&self) -> Vec<BoxPoint> {
        let left = self.left as i32;
        let top = self.top as i32;
        let right = self.right() as i32;
        let bottom = self.bottom() as i32;
        vec![
            BoxPoint::new(left, top),
            BoxPoint::new(right, top),
            BoxPoint::new(right, bottom),
            BoxPoint::new(left, bottom),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_covers_rotated_quad() {
        let points = vec![
            BoxPoint::new(12, 8),
            BoxPoint::new(40, 10),
            BoxPoint::new(38, 30),
            BoxPoint::new(10, 28),
        ];
        let rect = Rect::bounding(&points).expect("bounds");
        assert_eq!(rect, Rect::new(10.0, 8.0, 30.0, 22.0));
    }

    #[test]
    fn bounding_of_nothing_is_none() {
        assert!(Rect::bounding(&[]).is_none());
    }

    #[test]
    fn corners_are_in_box_order() {
        let corners = Rect::from_edges(10, 10, 70, 30).corner_points();
        assert_eq!(
            corners,
            vec![
                BoxPoint::new(10, 10),
                BoxPoint::new(70, 10),
                BoxPoint::new(70, 30),
                BoxPoint::new(10, 30),
            ]
        );
    }

    #[test]
    fn fragment_deserializes_with_camel_case_points() {
        let json = r#"{"text":"He","boxPoints":[{"x":10,"y":10},{"x":40,"y":30}]}"#;
        let fragment: RecognizedFragment = serde_json::from_str(json).expect("json");
        assert_eq!(fragment.bounds(), Some(Rect::new(10.0, 10.0, 30.0, 20.0)));
    }

    #[test]
    fn outcome_geometry_requires_any_points() {
        let outcome = RecognitionOutcome {
            success: true,
            text: "a".to_string(),
            fragments: vec![RecognizedFragment::new("a", Vec::new())],
        };
        assert!(!outcome.has_geometry());
    }
}
