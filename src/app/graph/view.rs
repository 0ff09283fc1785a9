use std::collections::HashMap;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, StrokeKind, Ui, vec2};
use genenet::{LayoutKind, NodeKind, WorkerState};

use super::super::ViewModel;
use super::super::render_utils::{
    HUB_RING_COLOR, MATCH_COLOR, SELECTED_COLOR, blend_color, circle_visible, dim_color,
    draw_background, edge_visible, fit_view, stored_color, world_to_screen,
};
use super::interaction::ScreenNode;

const FALLBACK_NODE_COLOR: Color32 = Color32::from_rgb(111, 143, 181);
const FALLBACK_EDGE_COLOR: Color32 = Color32::from_rgb(154, 164, 174);

impl ViewModel {
    pub(in crate::app) fn fit_to_graph(&mut self, rect: egui::Rect) {
        let points = self
            .store
            .graph()
            .nodes
            .values()
            .filter(|node| !node.hidden)
            .filter_map(|node| node.position());
        if let Some((pan, zoom)) = fit_view(rect, points) {
            self.pan = pan;
            self.zoom = zoom;
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let applied = self.store.pump();
        let layout_running = LayoutKind::ALL
            .into_iter()
            .any(|kind| self.store.layout_state(kind) == WorkerState::Running);
        if applied > 0 || layout_running {
            ui.ctx().request_repaint();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        let drag_box = self.handle_box_selection(rect, &response);

        let pan = self.pan;
        let zoom = self.zoom;
        let node_scale = zoom.powf(0.5);
        let graph = self.store.graph();
        let selection = self.store.selection();
        let matches = self.store.search_matches();
        let hubs = &self.store.radial_analysis().hubs;
        let label_threshold = self.store.config().style.label_size_threshold;
        let search_active = !matches.is_empty();

        let mut screen_positions = HashMap::with_capacity(graph.node_count());
        let mut screen_nodes = Vec::with_capacity(graph.node_count());
        for node in graph.nodes.values() {
            if node.hidden {
                continue;
            }
            let Some(world) = node.position() else {
                continue;
            };
            let position = world_to_screen(rect, pan, zoom, world);
            let radius = (node.size * node_scale).clamp(1.5, 48.0);
            screen_positions.insert(node.id.as_str(), position);
            if circle_visible(rect, position, radius) {
                screen_nodes.push(ScreenNode {
                    id: node.id.as_str(),
                    position,
                    radius,
                });
            }
        }

        let mut visible_edge_count = 0usize;
        for edge in graph.edges.values() {
            let (Some(&start), Some(&end)) = (
                screen_positions.get(edge.source.as_str()),
                screen_positions.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }

            let touches_selection =
                selection.contains(&edge.source) || selection.contains(&edge.target);
            let base = stored_color(&edge.color, FALLBACK_EDGE_COLOR);
            let color = if touches_selection {
                blend_color(base, SELECTED_COLOR, 0.7)
            } else if search_active || !selection.is_empty() {
                dim_color(base, 0.55)
            } else {
                base
            };
            let width = (edge.size * node_scale).clamp(0.4, 6.0);
            painter.line_segment([start, end], Stroke::new(width, color));
            visible_edge_count += 1;
        }

        // Hubs and search hits are drawn last so they stay on top.
        screen_nodes.sort_by_key(|screen| {
            (
                matches.contains(screen.id) || selection.contains(screen.id),
                hubs.contains(screen.id),
            )
        });

        let hovered = Self::hovered_node(ui, &screen_nodes).map(|screen| screen.id);
        for screen in &screen_nodes {
            let Some(node) = graph.nodes.get(screen.id) else {
                continue;
            };
            let is_selected = selection.contains(screen.id);
            let is_match = node.highlighted;
            let is_hub = hubs.contains(screen.id);
            let is_hovered = hovered == Some(screen.id);

            let base = stored_color(&node.color, FALLBACK_NODE_COLOR);
            let color = if is_selected {
                blend_color(base, SELECTED_COLOR, 0.75)
            } else if is_match {
                blend_color(base, MATCH_COLOR, 0.6)
            } else if search_active || !selection.is_empty() {
                dim_color(base, 0.45)
            } else {
                base
            };

            painter.circle_filled(screen.position, screen.radius, color);
            match node.kind {
                NodeKind::Border => {
                    let border = node
                        .border_color
                        .as_deref()
                        .map_or(Color32::from_gray(40), |text| stored_color(text, Color32::from_gray(40)));
                    let width = node.border_size.unwrap_or(1.5) * node_scale;
                    painter.circle_stroke(screen.position, screen.radius, Stroke::new(width, border));
                }
                NodeKind::Circle | NodeKind::Image => {}
            }
            if is_hub {
                painter.circle_stroke(
                    screen.position,
                    screen.radius + 3.0,
                    Stroke::new(1.4, HUB_RING_COLOR),
                );
            }
            if is_hovered {
                painter.circle_stroke(
                    screen.position,
                    screen.radius + 1.5,
                    Stroke::new(1.5, Color32::from_gray(30)),
                );
            }

            let should_draw_label = self.show_labels
                && (is_selected || is_hovered || is_match || screen.radius >= label_threshold);
            if should_draw_label {
                painter.text(
                    screen.position + vec2(screen.radius + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    node.label.as_str(),
                    FontId::proportional(12.0),
                    Color32::from_gray(30),
                );
            }
        }

        if let Some(area) = drag_box {
            painter.rect(
                area,
                0.0,
                Color32::from_rgba_unmultiplied(103, 196, 255, 40),
                Stroke::new(1.0, MATCH_COLOR),
                StrokeKind::Inside,
            );
        }

        let hovered_text = hovered.and_then(|id| graph.nodes.get(id)).map(|node| {
            format!(
                "{}  |  {}  |  degree {}",
                node.label,
                node.id,
                graph.degree(&node.id)
            )
        });
        if let Some(text) = hovered_text {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                text,
                FontId::proportional(13.0),
                Color32::from_gray(20),
            );
        }

        let clicked = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.map(str::to_owned))
        } else {
            None
        };
        let visible_node_count = screen_nodes.len();
        let unplaced = graph.nodes.values().any(|node| node.position().is_none());

        self.visible_node_count = visible_node_count;
        self.visible_edge_count = visible_edge_count;
        if unplaced && visible_node_count == 0 {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No positions yet; start a layout to place the nodes.",
                FontId::proportional(14.0),
                Color32::from_gray(90),
            );
        }
        if response.double_clicked() {
            self.fit_to_graph(rect);
        }
        if let Some(selected) = clicked {
            self.focus_node(selected);
        }
    }

    /// Pans so `id` sits in the middle of the canvas.
    pub(in crate::app) fn center_on(&mut self, id: &str) {
        if let Some(position) = self.store.node(id).ok().and_then(|node| node.position()) {
            self.pan = -position * self.zoom;
        }
    }
}
