use serde::Serialize;

use super::{Point, Size, TextBlockPlacement};
use crate::ocr::Rect;

pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 72.0;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
const SCALE_STEP: f64 = 0.1;
const FONT_STEP: f64 = 2.0;
const SCALE_EPSILON: f64 = 0.01;
const MIN_WIDTH: f64 = 20.0;
const MIN_HEIGHT: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub enum ElementState {
    Idle,
    Dragging {
        pointer_start: Point,
        element_start: Point,
    },
    Editing {
        buffer: String,
        /// Edit surface size, fixed on entry so the box does not re-measure.
        locked_size: Size,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Positive wheel deltas zoom in, anything else zooms out.
    pub fn from_wheel_delta(delta: f64) -> Self {
        if delta > 0.0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }

    fn sign(self) -> f64 {
        match self {
            ZoomDirection::In => 1.0,
            ZoomDirection::Out => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    None,
    Hover,
    Editing,
}

/// One placed, draggable, zoomable and editable block of translated text.
///
/// Entering and leaving `Editing` goes through the owning controller, which
/// keeps at most one editor alive per surface.
#[derive(Debug, Clone)]
pub struct OverlayElement {
    id: ElementId,
    text: String,
    font_size: f64,
    scale_factor: f64,
    original_bounds: Rect,
    position: Point,
    size: Size,
    container: Size,
    state: ElementState,
    hovered: bool,
}

impl OverlayElement {
    pub(crate) fn new(id: ElementId, placement: &TextBlockPlacement, container: Size) -> Self {
        let mut element = Self {
            id,
            text: placement.text.clone(),
            font_size: clamp_font(placement.font_size),
            scale_factor: 1.0,
            original_bounds: placement.bounds,
            position: Point::new(placement.bounds.left, placement.bounds.top),
            size: Size::default(),
            container,
            state: ElementState::Idle,
            hovered: false,
        };
        element.size = element.scaled_size();
        element.clamp_position();
        element
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn original_bounds(&self) -> Rect {
        self.original_bounds
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn container_size(&self) -> Size {
        self.container
    }

    pub fn state(&self) -> &ElementState {
        &self.state
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height,
        )
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, ElementState::Editing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ElementState::Dragging { .. })
    }

    /// Text currently in the edit surface, while editing.
    pub fn edit_text(&self) -> Option<&str> {
        match &self.state {
            ElementState::Editing { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn highlight(&self) -> Highlight {
        if self.is_editing() {
            Highlight::Editing
        } else if self.hovered {
            Highlight::Hover
        } else {
            Highlight::None
        }
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub(crate) fn begin_drag(&mut self, pointer: Point) -> bool {
        if self.state != ElementState::Idle {
            return false;
        }
        self.state = ElementState::Dragging {
            pointer_start: pointer,
            element_start: self.position,
        };
        true
    }

    pub(crate) fn drag_to(&mut self, pointer: Point) -> bool {
        let ElementState::Dragging {
            pointer_start,
            element_start,
        } = self.state
        else {
            return false;
        };
        self.position = Point::new(
            element_start.x + (pointer.x - pointer_start.x),
            element_start.y + (pointer.y - pointer_start.y),
        );
        self.clamp_position();
        true
    }

    pub(crate) fn end_drag(&mut self) -> bool {
        if !self.is_dragging() {
            return false;
        }
        self.state = ElementState::Idle;
        true
    }

    pub(crate) fn begin_edit(&mut self) -> bool {
        if self.state != ElementState::Idle {
            return false;
        }
        self.state = ElementState::Editing {
            buffer: self.text.clone(),
            locked_size: self.size,
        };
        true
    }

    pub(crate) fn set_edit_text(&mut self, text: &str) -> bool {
        match &mut self.state {
            ElementState::Editing { buffer, .. } => {
                buffer.clear();
                buffer.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Leaves editing and keeps the edited text.
    pub(crate) fn commit_edit(&mut self) -> bool {
        match std::mem::replace(&mut self.state, ElementState::Idle) {
            ElementState::Editing { buffer, .. } => {
                self.text = buffer;
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Leaves editing and restores the text shown before the edit.
    pub(crate) fn cancel_edit(&mut self) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.state = ElementState::Idle;
        true
    }

    /// One zoom tick around the element's center. Returns false when the
    /// scale is already pinned at its limit.
    pub fn zoom(&mut self, direction: ZoomDirection) -> bool {
        let next_scale =
            (self.scale_factor + direction.sign() * SCALE_STEP).clamp(MIN_SCALE, MAX_SCALE);
        if (next_scale - self.scale_factor).abs() < SCALE_EPSILON {
            return false;
        }

        let center_x = self.position.x + self.size.width / 2.0;
        let center_y = self.position.y + self.size.height / 2.0;
        self.scale_factor = next_scale;
        self.font_size = clamp_font(self.font_size + direction.sign() * FONT_STEP);
        self.size = self.scaled_size();
        if let ElementState::Editing { locked_size, .. } = &mut self.state {
            *locked_size = self.size;
        }
        self.position = Point::new(
            center_x - self.size.width / 2.0,
            center_y - self.size.height / 2.0,
        );
        self.clamp_position();
        true
    }

    pub(crate) fn set_container_size(&mut self, container: Size) {
        self.container = container;
        self.clamp_position();
    }

    fn scaled_size(&self) -> Size {
        Size::new(
            (self.original_bounds.width * self.scale_factor).max(MIN_WIDTH),
            (self.original_bounds.height * self.scale_factor).max(MIN_HEIGHT),
        )
    }

    fn clamp_position(&mut self) {
        let max_x = (self.container.width - self.size.width).max(0.0);
        let max_y = (self.container.height - self.size.height).max(0.0);
        self.position.x = clamp_or_zero(self.position.x, max_x);
        self.position.y = clamp_or_zero(self.position.y, max_y);
    }
}

fn clamp_font(size: f64) -> f64 {
    if size.is_nan() {
        return MIN_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

fn clamp_or_zero(value: f64, max: f64) -> f64 {
    if value.is_nan() || max.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}
