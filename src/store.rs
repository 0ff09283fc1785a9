//! Application-root state container.
//!
//! [`Store`] composes the graph model, the layout supervisor, selection and
//! search, and radial analysis. It is an ordinary value owned by whoever
//! drives the render loop; `pump` is the only place layout results reach the
//! graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::layout::{LayoutInput, LayoutKind, LayoutSettings};
use crate::model::{Edge, Graph, GraphDocument, GraphModel, Node, RemovedNode};
use crate::radial::{RadialAnalysis, RadialAnalysisSetting, compute_hubs};
use crate::selection::{SearchMode, SelectionBox, SelectionState};
use crate::worker::{LayoutSupervisor, WorkerState};

/// Everything a renderer or exporter needs, in a stable order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub generation: u64,
    pub revision: u64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub selection: Vec<String>,
    pub search_query: String,
    pub search_matches: Vec<String>,
    pub hubs: Vec<String>,
    pub layouts: BTreeMap<LayoutKind, WorkerState>,
}

pub struct Store {
    config: EngineConfig,
    model: GraphModel,
    supervisor: LayoutSupervisor,
    selection: SelectionState,
    radial_settings: RadialAnalysisSetting,
    radial: RadialAnalysis,
    radial_filter: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Store {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            model: GraphModel::new(),
            supervisor: LayoutSupervisor::new(config.worker.clone()),
            selection: SelectionState::new(config.search_mode),
            radial_settings: config.radial.clone(),
            radial: RadialAnalysis::default(),
            radial_filter: false,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        self.model.graph()
    }

    pub fn generation(&self) -> u64 {
        self.model.generation()
    }

    pub fn revision(&self) -> u64 {
        self.model.revision()
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.model.node(id)
    }

    pub fn edge(&self, id: &str) -> Result<&Edge> {
        self.model.edge(id)
    }

    /// Replaces the graph. Derived state is rebuilt and running layouts
    /// restart against the new generation; on error nothing changes.
    pub fn load(&mut self, graph: Graph) -> Result<u64> {
        let generation = self.model.load(graph)?;
        self.model.apply_styles(&self.config.style);
        self.rederive();
        self.restart_layouts();
        Ok(generation)
    }

    pub fn load_document(&mut self, document: GraphDocument) -> Result<u64> {
        self.load(document.into_graph()?)
    }

    pub fn load_json(&mut self, raw: &str) -> Result<u64> {
        self.load_document(GraphDocument::from_json(raw)?)
    }

    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        self.model.add_nodes(nodes)?;
        self.after_mutation();
        Ok(())
    }

    pub fn add_edges(&mut self, edges: Vec<Edge>) -> Result<()> {
        self.model.add_edges(edges)?;
        self.after_mutation();
        Ok(())
    }

    pub fn remove_node(&mut self, id: &str) -> Result<RemovedNode> {
        let removed = self.model.remove_node(id)?;
        self.after_mutation();
        Ok(removed)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let removed = self.model.remove_edge(id)?;
        self.after_mutation();
        Ok(removed)
    }

    /// Drops every position so the next layout run starts from the seed ring.
    pub fn reset_positions(&mut self) {
        self.model.clear_positions();
        self.restart_layouts();
    }

    fn after_mutation(&mut self) {
        self.model.apply_styles(&self.config.style);
        self.rederive();
        self.restart_layouts();
    }

    fn rederive(&mut self) {
        self.selection.refresh(self.model.graph());
        self.sync_highlights();
        self.radial = compute_hubs(self.model.graph(), &self.radial_settings);
        self.sync_radial_filter();
    }

    /// Running layouts are respawned from the current positions; paused ones
    /// are dropped since their simulation no longer matches the topology.
    fn restart_layouts(&mut self) {
        for kind in LayoutKind::ALL {
            let Some(settings) = self.supervisor.settings(kind).cloned() else {
                continue;
            };
            let running = self.supervisor.state(kind) == WorkerState::Running;
            self.supervisor.kill(kind);
            if running {
                debug!(kind = %kind, generation = self.model.generation(), "restarting layout after graph change");
                self.start_layout(settings);
            }
        }
    }

    pub fn start_layout(&mut self, settings: impl Into<LayoutSettings>) -> WorkerState {
        let settings = settings.into();
        let input = LayoutInput::from_graph(
            self.model.graph(),
            self.model.generation(),
            settings.edge_weight_attribute(),
        );
        self.supervisor.start(settings, input)
    }

    /// Starts `kind` with the settings from [`EngineConfig`].
    pub fn start_default_layout(&mut self, kind: LayoutKind) -> WorkerState {
        let settings = match kind {
            LayoutKind::Force => LayoutSettings::Force(self.config.force.clone()),
            LayoutKind::ForceAtlas2 => LayoutSettings::ForceAtlas2(self.config.force_atlas2.clone()),
        };
        self.start_layout(settings)
    }

    pub fn stop_layout(&mut self, kind: LayoutKind) {
        self.supervisor.stop(kind);
    }

    pub fn kill_layout(&mut self, kind: LayoutKind) {
        self.supervisor.kill(kind);
    }

    pub fn layout_state(&self, kind: LayoutKind) -> WorkerState {
        self.supervisor.state(kind)
    }

    /// Applies the newest frame of every live run. Returns how many frames
    /// moved at least one node.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0usize;
        for frame in self.supervisor.collect_frames() {
            if self
                .model
                .apply_positions(frame.generation, &frame.ids, &frame.positions)
                > 0
            {
                applied += 1;
            }
        }
        applied
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        self.selection.selected()
    }

    pub fn set_selection<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selection.set_selection(ids, self.model.graph());
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_selection();
    }

    /// Selects the visible, positioned nodes inside `area`.
    pub fn select_by_box(&mut self, area: &SelectionBox) -> &BTreeSet<String> {
        let positions = self
            .model
            .graph()
            .nodes
            .values()
            .filter(|node| !node.hidden)
            .filter_map(|node| node.position().map(|position| (node.id.as_str(), position)));
        self.selection.select_by_box(area, positions)
    }

    pub fn search_query(&self) -> &str {
        self.selection.query()
    }

    pub fn search_mode(&self) -> SearchMode {
        self.selection.mode()
    }

    pub fn search_matches(&self) -> &BTreeSet<String> {
        self.selection.matches()
    }

    pub fn set_search_query(&mut self, text: &str) -> &BTreeSet<String> {
        self.selection.set_search_query(text, self.model.graph());
        self.sync_highlights();
        self.selection.matches()
    }

    pub fn set_search_mode(&mut self, mode: SearchMode) {
        self.selection.set_mode(mode, self.model.graph());
        self.sync_highlights();
    }

    fn sync_highlights(&mut self) {
        let matches = self.selection.matches();
        self.model.set_highlights(|node| matches.contains(&node.id));
    }

    pub fn radial_settings(&self) -> &RadialAnalysisSetting {
        &self.radial_settings
    }

    pub fn radial_analysis(&self) -> &RadialAnalysis {
        &self.radial
    }

    pub fn radial_filter(&self) -> bool {
        self.radial_filter
    }

    pub fn set_radial_settings(&mut self, settings: RadialAnalysisSetting) -> &RadialAnalysis {
        self.radial_settings = settings;
        self.radial = compute_hubs(self.model.graph(), &self.radial_settings);
        self.sync_radial_filter();
        &self.radial
    }

    /// When enabled, nodes outside the retained set are hidden. Disabling
    /// the filter unhides every node.
    pub fn set_radial_filter(&mut self, enabled: bool) {
        let changed = self.radial_filter != enabled;
        self.radial_filter = enabled;
        if enabled {
            self.sync_radial_filter();
        } else if changed {
            self.model.set_hidden(|_| false);
        }
    }

    fn sync_radial_filter(&mut self) {
        if !self.radial_filter {
            return;
        }
        let retained = &self.radial.retained_nodes;
        self.model.set_hidden(|node| !retained.contains(&node.id));
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let graph = self.model.graph();
        let mut nodes = graph.nodes.values().cloned().collect::<Vec<_>>();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges = graph.edges.values().cloned().collect::<Vec<_>>();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        GraphSnapshot {
            generation: self.model.generation(),
            revision: self.model.revision(),
            nodes,
            edges,
            selection: self.selection.selected().iter().cloned().collect(),
            search_query: self.selection.query().to_owned(),
            search_matches: self.selection.matches().iter().cloned().collect(),
            hubs: self.radial.hubs.iter().cloned().collect(),
            layouts: LayoutKind::ALL
                .into_iter()
                .map(|kind| (kind, self.supervisor.state(kind)))
                .collect(),
        }
    }
}
