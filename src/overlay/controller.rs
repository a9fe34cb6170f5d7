use tracing::debug;

use super::element::{ElementId, OverlayElement, ZoomDirection};
use super::{Point, Size, TextBlockPlacement};

/// What a press on empty container space asks of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundAction {
    None,
    CloseRequested,
}

/// Owns every element on one overlay surface.
///
/// All mutation happens through `&mut self` on the UI thread. The controller
/// holds the surface's single editing slot and the pointer capture of the
/// element being dragged.
#[derive(Debug)]
pub struct OverlayController {
    container: Size,
    elements: Vec<OverlayElement>,
    active_editor: Option<ElementId>,
    captured: Option<ElementId>,
    showing_translated: bool,
    next_id: usize,
}

impl OverlayController {
    pub fn new(container: Size) -> Self {
        Self {
            container,
            elements: Vec::new(),
            active_editor: None,
            captured: None,
            showing_translated: true,
            next_id: 0,
        }
    }

    /// Replaces the current elements with one element per placement.
    pub fn populate(&mut self, placements: &[TextBlockPlacement]) -> Vec<ElementId> {
        self.close();
        let mut ids = Vec::with_capacity(placements.len());
        for placement in placements {
            let id = ElementId(self.next_id);
            self.next_id += 1;
            self.elements
                .push(OverlayElement::new(id, placement, self.container));
            ids.push(id);
        }
        debug!(elements = ids.len(), "overlay populated");
        ids
    }

    /// Drops every element and releases the editing slot.
    pub fn close(&mut self) {
        self.elements.clear();
        self.active_editor = None;
        self.captured = None;
        self.showing_translated = true;
    }

    /// Whether the translated blocks are shown (as opposed to the source
    /// capture underneath).
    pub fn is_showing_translated(&self) -> bool {
        self.showing_translated
    }

    /// Flips between translated blocks and the bare source capture. Hiding
    /// commits the open editor and drops any drag. No-op on an empty surface.
    pub fn toggle_translated(&mut self) -> bool {
        if self.elements.is_empty() {
            return false;
        }
        if self.showing_translated {
            self.release_capture();
            self.exit_active_editor();
        }
        self.showing_translated = !self.showing_translated;
        debug!(showing_translated = self.showing_translated, "overlay toggled");
        true
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&OverlayElement> {
        self.elements.iter().find(|element| element.id() == id)
    }

    pub fn active_editor(&self) -> Option<ElementId> {
        self.active_editor
    }

    pub fn container_size(&self) -> Size {
        self.container
    }

    pub fn resize_container(&mut self, container: Size) {
        self.container = container;
        for element in &mut self.elements {
            element.set_container_size(container);
        }
    }

    /// Primary button press on an element. A single click starts dragging
    /// and captures the pointer; a double click opens the editor after
    /// closing any other one. Any drag still holding the capture ends first.
    /// Presses on an element being edited, or while the source capture is
    /// shown, are ignored.
    pub fn pointer_pressed(&mut self, id: ElementId, pointer: Point, click_count: u32) -> bool {
        if !self.showing_translated {
            return false;
        }
        match self.element(id) {
            Some(element) if !element.is_editing() => {}
            _ => return false,
        }
        self.release_capture();

        if click_count >= 2 {
            self.exit_active_editor();
            let Some(element) = self.element_mut(id) else {
                return false;
            };
            if !element.begin_edit() {
                return false;
            }
            self.active_editor = Some(id);
            return true;
        }

        let Some(element) = self.element_mut(id) else {
            return false;
        };
        if element.begin_drag(pointer) {
            self.captured = Some(id);
            return true;
        }
        false
    }

    /// Pointer move, routed to the captured element if any.
    pub fn pointer_moved(&mut self, pointer: Point) -> bool {
        let Some(id) = self.captured else {
            return false;
        };
        self.element_mut(id)
            .is_some_and(|element| element.drag_to(pointer))
    }

    pub fn pointer_released(&mut self) -> bool {
        self.release_capture()
    }

    pub fn pointer_entered(&mut self, id: ElementId) {
        if let Some(element) = self.element_mut(id) {
            element.set_hovered(true);
        }
    }

    pub fn pointer_left(&mut self, id: ElementId) {
        if let Some(element) = self.element_mut(id) {
            element.set_hovered(false);
        }
    }

    /// Replaces the text in the open editor.
    pub fn edit_text(&mut self, id: ElementId, text: &str) -> bool {
        self.element_mut(id)
            .is_some_and(|element| element.set_edit_text(text))
    }

    /// The editor lost focus: keep the edited text.
    pub fn focus_lost(&mut self, id: ElementId) -> bool {
        let committed = self
            .element_mut(id)
            .is_some_and(OverlayElement::commit_edit);
        if committed {
            self.release_editor(id);
        }
        committed
    }

    /// Cancel key in the editor: drop the edit.
    pub fn cancel_key(&mut self, id: ElementId) -> bool {
        let cancelled = self
            .element_mut(id)
            .is_some_and(OverlayElement::cancel_edit);
        if cancelled {
            self.release_editor(id);
        }
        cancelled
    }

    pub fn zoom(&mut self, id: ElementId, direction: ZoomDirection) -> bool {
        self.element_mut(id)
            .is_some_and(|element| element.zoom(direction))
    }

    /// Press on empty container space: closes the open editor, keeping its
    /// text. A double press also asks the host to close the surface.
    pub fn background_pressed(&mut self, click_count: u32) -> BackgroundAction {
        self.exit_active_editor();
        if click_count >= 2 {
            BackgroundAction::CloseRequested
        } else {
            BackgroundAction::None
        }
    }

    fn exit_active_editor(&mut self) {
        let Some(id) = self.active_editor.take() else {
            return;
        };
        if let Some(element) = self.element_mut(id) {
            element.commit_edit();
        }
    }

    fn release_capture(&mut self) -> bool {
        let Some(id) = self.captured.take() else {
            return false;
        };
        self.element_mut(id).is_some_and(OverlayElement::end_drag)
    }

    fn release_editor(&mut self, id: ElementId) {
        if self.active_editor == Some(id) {
            self.active_editor = None;
        }
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut OverlayElement> {
        self.elements.iter_mut().find(|element| element.id() == id)
    }
}
