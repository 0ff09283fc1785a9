use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, RichText, Ui, emath::Numeric};
use genenet::{LayoutKind, SearchMode, WorkerState};

use super::super::ViewModel;

const KEY_BASE_RATE: f32 = 10.0;
const KEY_ACCEL_PER_SEC: f32 = 9.0;
const KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct KeyHold {
    secs: f32,
    carry: f64,
}

/// Holding an arrow key on a focused slider accelerates the change.
fn nudge_with_arrow_keys<N: Numeric>(
    ui: &Ui,
    response: &Response,
    value: &mut N,
    range: &RangeInclusive<N>,
) -> bool {
    let state_id = response.id.with("arrow_key_hold");
    if !response.has_focus() {
        ui.ctx().data_mut(|data| data.remove::<KeyHold>(state_id));
        return false;
    }

    let mut hold = ui
        .ctx()
        .data(|data| data.get_temp::<KeyHold>(state_id).unwrap_or_default());
    let (delta_time, increase, decrease) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    let direction = f64::from((increase as i8) - (decrease as i8));
    if direction == 0.0 {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, KeyHold::default()));
        return false;
    }

    hold.secs += delta_time;
    let ramp = hold.secs * KEY_ACCEL_PER_SEC;
    let speed = KEY_BASE_RATE * (1.0 + ramp + ramp * ramp * 0.15).min(KEY_ACCEL_MAX);

    let (min, max) = (range.start().to_f64(), range.end().to_f64());
    let step = if N::INTEGRAL {
        1.0
    } else {
        ((max - min) / 200.0).max(0.0005)
    };
    hold.carry += direction * step * f64::from(speed) * f64::from(delta_time);
    let delta = if N::INTEGRAL { hold.carry.trunc() } else { hold.carry };
    hold.carry -= delta;

    let old = value.to_f64();
    let next = (old + delta).clamp(min, max);
    *value = N::from_f64(next);

    ui.ctx().request_repaint();
    ui.ctx().data_mut(|data| data.insert_temp(state_id, hold));
    (next - old).abs() > f64::EPSILON
}

fn tuning_slider<N: Numeric>(
    ui: &mut Ui,
    value: &mut N,
    range: RangeInclusive<N>,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.clone())
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    let nudged = nudge_with_arrow_keys(ui, &response, value, &range);
    response.changed() || nudged
}

fn state_text(state: WorkerState) -> RichText {
    match state {
        WorkerState::Idle => RichText::new("idle").weak(),
        WorkerState::Running => RichText::new("running").color(egui::Color32::from_rgb(60, 150, 90)),
        WorkerState::Paused => RichText::new("paused").color(egui::Color32::from_rgb(200, 140, 40)),
        WorkerState::Terminated => RichText::new("terminated").weak(),
    }
}

/// Edits an optional attribute name; the value is committed when the field loses focus.
fn optional_name_field(ui: &mut Ui, label: &str, value: &mut Option<String>) -> bool {
    let mut text = value.clone().unwrap_or_default();
    let response = ui
        .horizontal(|ui| {
            ui.label(label);
            ui.text_edit_singleline(&mut text)
        })
        .inner;
    if !response.lost_focus() {
        return false;
    }

    let trimmed = text.trim();
    let next = (!trimmed.is_empty()).then(|| trimmed.to_owned());
    if next == *value {
        return false;
    }
    *value = next;
    true
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Controls");
        ui.separator();

        self.draw_search_controls(ui);
        ui.separator();
        self.draw_layout_controls(ui);
        ui.separator();
        self.draw_radial_controls(ui);
        ui.separator();

        ui.checkbox(&mut self.show_labels, "Show labels")
            .on_hover_text("Label selected, matched and large nodes.");
        ui.checkbox(&mut self.show_fps_bar, "FPS display");
    }

    fn draw_search_controls(&mut self, ui: &mut Ui) {
        ui.label("Search (label, gene id or description)");
        let response = ui.text_edit_singleline(&mut self.search);

        let mut mode_changed = false;
        ui.horizontal(|ui| {
            mode_changed |= ui
                .selectable_value(&mut self.search_mode, SearchMode::Substring, "Substring")
                .changed();
            mode_changed |= ui
                .selectable_value(&mut self.search_mode, SearchMode::Fuzzy, "Fuzzy")
                .on_hover_text("Characters may be spread out, e.g. \"fgn\" finds FTD-gene1.")
                .changed();
        });

        if mode_changed {
            self.store.set_search_mode(self.search_mode);
        }
        if response.changed() {
            self.store.set_search_query(&self.search);
        }

        if self.search.trim().is_empty() {
            return;
        }
        let matches = self.store.search_matches();
        ui.label(format!("{} matching nodes", matches.len()));
        if !matches.is_empty() && ui.button("Select matches").clicked() {
            let ids = matches.iter().cloned().collect::<Vec<_>>();
            self.focused = ids.first().cloned();
            self.store.set_selection(ids);
        }
    }

    fn start_layout(&mut self, kind: LayoutKind) -> WorkerState {
        match kind {
            LayoutKind::Force => self.store.start_layout(self.force.clone()),
            LayoutKind::ForceAtlas2 => self.store.start_layout(self.force_atlas2.clone()),
        }
    }

    /// New settings only reach a running layout through a restart.
    fn restart_if_running(&mut self, kind: LayoutKind) {
        if self.store.layout_state(kind) == WorkerState::Running {
            self.start_layout(kind);
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Layout").strong());

        for kind in LayoutKind::ALL {
            let state = self.store.layout_state(kind);
            ui.horizontal(|ui| {
                ui.label(kind.label());
                ui.label(state_text(state));
                if ui
                    .add_enabled(state != WorkerState::Running, egui::Button::new("Start"))
                    .on_hover_text("Start, or resume a paused run.")
                    .clicked()
                {
                    self.start_layout(kind);
                }
                if ui
                    .add_enabled(state == WorkerState::Running, egui::Button::new("Stop"))
                    .on_hover_text("Pause; the run keeps its velocities.")
                    .clicked()
                {
                    self.store.stop_layout(kind);
                }
                if ui
                    .add_enabled(
                        matches!(state, WorkerState::Running | WorkerState::Paused),
                        egui::Button::new("Kill"),
                    )
                    .clicked()
                {
                    self.store.kill_layout(kind);
                }
            });
        }

        if ui
            .button("Reset positions")
            .on_hover_text("Forget every position; running layouts start again from a ring.")
            .clicked()
        {
            self.store.reset_positions();
        }

        ui.collapsing("Force settings", |ui| {
            let mut changed = false;
            changed |= tuning_slider(
                ui,
                &mut self.force.repulsion,
                5_000.0..=250_000.0,
                "Repulsion",
                "How strongly every pair of nodes pushes apart.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.force.attraction,
                0.001..=0.1,
                "Attraction",
                "Spring stiffness along edges, scaled by edge score.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.force.gravity,
                0.0..=0.01,
                "Gravity",
                "Pull toward the centre of the layout.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.force.damping,
                0.5..=0.98,
                "Damping",
                "Fraction of velocity kept each tick.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.force.collision,
                0.0..=4.0,
                "Collision",
                "Separation applied to overlapping nodes.",
            );
            if changed {
                self.restart_if_running(LayoutKind::Force);
            }
        });

        ui.collapsing("ForceAtlas2 settings", |ui| {
            let settings = &mut self.force_atlas2;
            let mut changed = false;
            changed |= tuning_slider(
                ui,
                &mut settings.slow_down,
                1.0..=50.0,
                "Slow down",
                "Divides every step; higher values animate more smoothly.",
            );
            changed |= tuning_slider(
                ui,
                &mut settings.gravity,
                0.0..=10.0,
                "Gravity",
                "Keeps disconnected components from drifting away.",
            );
            changed |= tuning_slider(
                ui,
                &mut settings.scaling_ratio,
                0.5..=50.0,
                "Scaling ratio",
                "Repulsion strength; larger values spread the graph out.",
            );
            changed |= tuning_slider(
                ui,
                &mut settings.edge_weight_influence,
                0.0..=2.0,
                "Edge weight influence",
                "0 ignores weights, 1 uses them as is.",
            );
            changed |= ui.checkbox(&mut settings.lin_log_mode, "LinLog mode").changed();
            changed |= ui
                .checkbox(&mut settings.barnes_hut_optimize, "Barnes-Hut approximation")
                .changed();
            changed |= ui
                .checkbox(&mut settings.strong_gravity_mode, "Strong gravity")
                .changed();
            changed |= ui
                .checkbox(
                    &mut settings.outbound_attraction_distribution,
                    "Dissuade hubs",
                )
                .on_hover_text("Outbound attraction distribution.")
                .changed();
            changed |= optional_name_field(
                ui,
                "Edge weight attribute",
                &mut settings.edge_weight_attribute,
            );
            if changed {
                self.restart_if_running(LayoutKind::ForceAtlas2);
            }
        });
    }

    fn draw_radial_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Hub analysis").strong());

        let max_score = self
            .store
            .graph()
            .edges
            .values()
            .map(|edge| edge.score)
            .filter(|score| score.is_finite())
            .fold(1.0f32, f32::max);

        let mut changed = false;
        changed |= tuning_slider(
            ui,
            &mut self.radial.edge_weight_cut_off,
            0.0..=max_score,
            "Edge score cut-off",
            "Edges scoring below this do not count toward degree.",
        );
        changed |= tuning_slider(
            ui,
            &mut self.radial.hub_gene_edge_count,
            0..=50,
            "Hub edge count",
            "Filtered degree needed to count as a hub.",
        );
        changed |= tuning_slider(
            ui,
            &mut self.radial.node_degree_cut_off,
            0.0..=100.0,
            "Node cut-off",
            "Minimum degree, or property value when one is set, to keep a node.",
        );
        changed |= optional_name_field(ui, "Node property", &mut self.radial.node_degree_property);
        if changed {
            self.store.set_radial_settings(self.radial.clone());
        }

        if ui
            .checkbox(&mut self.radial_filter, "Hide pruned nodes")
            .changed()
        {
            self.store.set_radial_filter(self.radial_filter);
        }

        let analysis = self.store.radial_analysis();
        ui.label(format!(
            "{} hubs, {} edges kept, {} nodes retained",
            analysis.hubs.len(),
            analysis.edges.len(),
            analysis.retained_nodes.len()
        ));
    }
}
