use super::Rect;

/// Share of the shorter box's height that both boxes cover vertically.
pub fn vertical_overlap_ratio(a: &Rect, b: &Rect) -> f64 {
    let top = a.top.max(b.top);
    let bottom = a.bottom().min(b.bottom());
    let overlap = (bottom - top).max(0.0);
    let min_h = a.height.min(b.height);
    if min_h > 0.0 { overlap / min_h } else { 0.0 }
}

/// Distance between facing edges, whichever side the boxes sit on.
pub fn horizontal_gap(a: &Rect, b: &Rect) -> f64 {
    (a.right() - b.left).abs().min((b.right() - a.left).abs())
}

/// Same text line and horizontally close enough to read as one run.
pub fn is_adjacent(a: &Rect, b: &Rect) -> bool {
    if vertical_overlap_ratio(a, b) < 0.5 {
        return false;
    }
    horizontal_gap(a, b) <= a.height.max(b.height) * 0.5
}
