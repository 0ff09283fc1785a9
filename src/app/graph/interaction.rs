use eframe::egui::{self, Pos2, Rect, Ui};
use genenet::SelectionBox;

use super::super::ViewModel;
use super::super::render_utils::screen_to_world;

/// Screen-space node used for hit testing.
pub(super) struct ScreenNode<'a> {
    pub(super) id: &'a str,
    pub(super) position: Pos2,
    pub(super) radius: f32,
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Primary drag draws a selection box; releasing it selects the visible
    /// nodes inside. Returns the box in screen space while it is being drawn.
    pub(in crate::app) fn handle_box_selection(
        &mut self,
        rect: Rect,
        response: &egui::Response,
    ) -> Option<Rect> {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(start) = response.interact_pointer_pos()
        {
            self.box_drag = Some((start, start));
        }

        let (start, mut current) = self.box_drag?;
        if let Some(pointer) = response.interact_pointer_pos() {
            current = pointer;
            self.box_drag = Some((start, current));
        }

        if response.drag_stopped() {
            self.box_drag = None;
            let area = SelectionBox::new(
                screen_to_world(rect, self.pan, self.zoom, start).to_pos2(),
                screen_to_world(rect, self.pan, self.zoom, current).to_pos2(),
            );
            let count = self.store.select_by_box(&area).len();
            self.focused = self.store.selection().iter().next().cloned();
            self.status = Some(format!("{count} nodes selected"));
            return None;
        }

        Some(Rect::from_two_pos(start, current))
    }

    pub(in crate::app) fn hovered_node<'a>(
        ui: &Ui,
        nodes: &'a [ScreenNode<'a>],
    ) -> Option<&'a ScreenNode<'a>> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        nodes
            .iter()
            .filter_map(|node| {
                let distance = node.position.distance(pointer);
                (distance <= node.radius.max(4.0)).then_some((node, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }

    pub(in crate::app) fn focus_node(&mut self, id: Option<String>) {
        match &id {
            Some(id) => self.store.set_selection([id.as_str()]),
            None => self.store.clear_selection(),
        }
        self.focused = id;
    }
}
