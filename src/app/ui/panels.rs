use std::collections::VecDeque;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use genenet::{GraphDocument, Store};
use tracing::warn;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) const INITIAL_HUB_ROWS: usize = 30;
    pub(in crate::app) const HUB_PAGE_ROWS: usize = 30;

    pub(in crate::app) fn new(store: Store, source: String) -> Self {
        let config = store.config();
        let force = config.force.clone();
        let force_atlas2 = config.force_atlas2.clone();
        let radial = store.radial_settings().clone();
        let search_mode = store.search_mode();

        Self {
            store,
            source,
            pan: Vec2::ZERO,
            zoom: 1.0,
            search: String::new(),
            search_mode,
            focused: None,
            box_drag: None,
            force,
            force_atlas2,
            radial,
            radial_filter: false,
            show_labels: true,
            status: None,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
            visible_node_count: 0,
            visible_edge_count: 0,
            hub_rows_visible: Self::INITIAL_HUB_ROWS,
        }
    }

    /// Swaps in a freshly read document without dropping the view state.
    pub(in crate::app) fn replace_graph(&mut self, result: Result<GraphDocument, String>) {
        let outcome = result.and_then(|document| {
            self.store
                .load_document(document)
                .map_err(|error| error.to_string())
        });
        match outcome {
            Ok(generation) => {
                if self
                    .focused
                    .as_deref()
                    .is_some_and(|id| self.store.node(id).is_err())
                {
                    self.focused = None;
                }
                self.status = Some(format!("Reloaded (generation {generation})"));
            }
            Err(message) => {
                warn!(%message, "reload failed; keeping the current graph");
                self.status = Some(format!("Reload failed: {message}"));
            }
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("genenet");
                    ui.separator();
                    ui.label(format!("source: {}", self.source));
                    ui.label(format!("nodes: {}", self.store.graph().node_count()));
                    ui.label(format!("edges: {}", self.store.graph().edge_count()));
                    ui.label(format!("generation: {}", self.store.generation()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if let Some(status) = &self.status {
                        ui.separator();
                        ui.label(status.as_str());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("controls_scroll")
                    .show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}
