use eframe::egui::Context;

use super::super::ViewModel;

const FPS_SAMPLE_WINDOW: usize = 120;

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps_bar || self.fps_samples.is_empty() {
            return None;
        }

        let average = self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32;
        let low = self
            .fps_samples
            .iter()
            .copied()
            .reduce(f32::min)
            .unwrap_or(average);
        Some(format!(
            "FPS {:.0} | avg {average:.1} | low {low:.0}",
            self.fps_current
        ))
    }

    pub(in crate::app) fn visible_graph_text(&self) -> String {
        let graph = self.store.graph();
        format!(
            "visible: {} / {} nodes, {} / {} edges",
            self.visible_node_count,
            graph.node_count(),
            self.visible_edge_count,
            graph.edge_count()
        )
    }
}
