use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};
use genenet::{
    EngineConfig, ForceAtlas2Settings, GenericForceSettings, GraphDocument, LayoutKind,
    RadialAnalysisSetting, SearchMode, Store,
};
use tracing::{error, warn};

mod graph;
mod render_utils;
mod ui;

type LoadResult = Result<GraphDocument, String>;

pub struct GeneNetApp {
    graph_path: PathBuf,
    config: EngineConfig,
    initial_layout: Option<LayoutKind>,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    store: Store,
    source: String,
    pan: Vec2,
    zoom: f32,
    search: String,
    search_mode: SearchMode,
    focused: Option<String>,
    box_drag: Option<(Pos2, Pos2)>,
    force: GenericForceSettings,
    force_atlas2: ForceAtlas2Settings,
    radial: RadialAnalysisSetting,
    radial_filter: bool,
    show_labels: bool,
    status: Option<String>,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
    visible_node_count: usize,
    visible_edge_count: usize,
    hub_rows_visible: usize,
}

impl GeneNetApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        graph_path: PathBuf,
        config: EngineConfig,
        initial_layout: Option<LayoutKind>,
    ) -> Self {
        let state = AppState::Loading {
            rx: Self::spawn_load(graph_path.clone()),
        };
        Self {
            graph_path,
            config,
            initial_layout,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(graph_path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = GraphDocument::from_path(&graph_path).map_err(|error| error.to_string());
            let _ = tx.send(result);
        });

        rx
    }

    fn ready(&self, document: GraphDocument) -> AppState {
        let mut store = Store::new(self.config.clone());
        if let Err(load_error) = store.load_document(document) {
            error!(%load_error, "graph document rejected");
            return AppState::Error(load_error.to_string());
        }
        if let Some(kind) = self.initial_layout {
            store.start_default_layout(kind);
        }
        AppState::Ready(Box::new(ViewModel::new(
            store,
            self.graph_path.display().to_string(),
        )))
    }
}

impl eframe::App for GeneNetApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(document)) => transition = Some(Ok(document)),
                    Ok(Err(load_error)) => transition = Some(Err(load_error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()))
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading interaction network...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the interaction network");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        self.reload_rx = Some(Self::spawn_load(self.graph_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.graph_path.clone()));
                }
            }
        }

        if let Some(rx) = self.reload_rx.take() {
            match rx.try_recv() {
                Ok(result) => match &mut self.state {
                    // Reloading in place keeps selection, search and running layouts.
                    AppState::Ready(model) => model.replace_graph(result),
                    _ => transition = Some(result),
                },
                Err(TryRecvError::Empty) => {
                    self.reload_rx = Some(rx);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Disconnected) => {
                    warn!("reload worker disconnected");
                }
            }
        }

        if let Some(result) = transition {
            self.state = match result {
                Ok(document) => self.ready(document),
                Err(message) => AppState::Error(message),
            };
        }
    }
}
