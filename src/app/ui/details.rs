use eframe::egui::{self, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        self.draw_focused_node(ui);
        ui.separator();
        self.draw_selection_summary(ui);
        ui.separator();
        self.draw_hub_list(ui);
        ui.separator();

        if ui
            .button("Copy snapshot as JSON")
            .on_hover_text("Nodes, edges, selection, matches and hubs in a stable order.")
            .clicked()
        {
            match serde_json::to_string_pretty(&self.store.snapshot()) {
                Ok(json) => {
                    ui.ctx().copy_text(json);
                    self.status = Some("Snapshot copied".to_owned());
                }
                Err(error) => self.status = Some(format!("Snapshot failed: {error}")),
            }
        }
    }

    fn draw_focused_node(&mut self, ui: &mut Ui) {
        let Some(focused) = self.focused.clone() else {
            ui.label("Click a node, or drag a box to select several.");
            return;
        };
        let Ok(node) = self.store.node(&focused) else {
            ui.label("The focused node is no longer in the graph.");
            return;
        };

        let graph = self.store.graph();
        let analysis = self.store.radial_analysis();
        let label = node.label.clone();
        let description = node.description.clone();
        let community = node.community.clone();
        let attributes = node
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>();
        let neighbors = graph.neighbors(&focused);
        let degree = graph.degree(&focused);
        let filtered_degree = analysis.degree(&focused);
        let is_hub = analysis.is_hub(&focused);

        ui.label(RichText::new(label).strong());
        ui.small(focused.as_str());
        if let Some(description) = &description {
            ui.label(description.as_str());
        }
        ui.add_space(4.0);
        ui.label(format!("Degree: {degree} ({filtered_degree} above the score cut-off)"));
        if is_hub {
            ui.label(RichText::new("Hub gene").strong());
        }
        if let Some(community) = &community {
            ui.label(format!("Community: {community}"));
        }
        for attribute in &attributes {
            ui.small(attribute.as_str());
        }

        if ui.button("Centre view").clicked() {
            self.center_on(&focused);
        }

        ui.add_space(4.0);
        ui.label(RichText::new(format!("Neighbours ({})", neighbors.len())).strong());
        let mut next_focus = None;
        egui::ScrollArea::vertical()
            .id_salt("neighbour_scroll")
            .max_height(180.0)
            .show(ui, |ui| {
                for neighbor in &neighbors {
                    let text = self
                        .store
                        .node(neighbor)
                        .map_or_else(|_| neighbor.clone(), |node| node.label.clone());
                    if ui.link(text).on_hover_text(neighbor.as_str()).clicked() {
                        next_focus = Some(neighbor.clone());
                    }
                }
            });
        if let Some(id) = next_focus {
            self.focus_node(Some(id));
        }
    }

    fn draw_selection_summary(&mut self, ui: &mut Ui) {
        let selection = self.store.selection();
        ui.label(RichText::new(format!("Selection ({})", selection.len())).strong());
        if selection.is_empty() {
            return;
        }

        let ids = selection.iter().cloned().collect::<Vec<_>>();
        let mut next_focus = None;
        egui::ScrollArea::vertical()
            .id_salt("selection_scroll")
            .max_height(140.0)
            .show(ui, |ui| {
                for id in &ids {
                    if ui.link(id.as_str()).clicked() {
                        next_focus = Some(id.clone());
                    }
                }
            });
        if let Some(id) = next_focus {
            self.focused = Some(id);
        }
        if ui.button("Clear selection").clicked() {
            self.focus_node(None);
        }
    }

    fn draw_hub_list(&mut self, ui: &mut Ui) {
        let analysis = self.store.radial_analysis();
        let mut hubs = analysis
            .hubs
            .iter()
            .map(|id| (id.clone(), analysis.degree(id)))
            .collect::<Vec<_>>();
        hubs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        ui.label(RichText::new(format!("Hub genes ({})", hubs.len())).strong());
        if hubs.is_empty() {
            ui.label("No node reaches the hub edge count.");
            return;
        }

        let row_count = hubs.len().min(self.hub_rows_visible);
        let mut next_focus = None;
        let mut load_more = false;
        egui::ScrollArea::vertical()
            .id_salt("hub_scroll")
            .max_height(260.0)
            .auto_shrink([false, true])
            .show_rows(ui, 20.0, row_count, |ui, row_range| {
                if row_range.end >= row_count {
                    load_more = true;
                }
                for (id, degree) in &hubs[row_range] {
                    if ui.link(format!("{id}  ({degree})")).clicked() {
                        next_focus = Some(id.clone());
                    }
                }
            });

        if load_more && row_count < hubs.len() {
            self.hub_rows_visible += Self::HUB_PAGE_ROWS;
        }
        if let Some(id) = next_focus {
            self.focus_node(Some(id));
        }
    }
}
