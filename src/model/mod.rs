//! Canonical in-memory graph. All mutation goes through [`GraphModel`].

mod document;
mod graph;
mod style;

use eframe::egui::Vec2;
use tracing::{debug, info};

pub use document::{GraphDocument, RawEdge, RawNode};
pub use graph::{
    DEFAULT_EDGE_COLOR, DEFAULT_EDGE_SIZE, DEFAULT_NODE_COLOR, DEFAULT_NODE_SIZE, Edge, Graph, Node,
    NodeKind,
};
pub use style::apply_styles;

use crate::config::StyleConfig;
use crate::error::{GraphError, Result};

/// Owner of the graph plus the counters other components use to tell
/// whether what they hold is still current.
///
/// `generation` changes only when the whole graph is replaced; `revision`
/// changes on every mutation, including applied layout frames.
#[derive(Debug, Default)]
pub struct GraphModel {
    graph: Graph,
    generation: u64,
    revision: u64,
}

/// What a cascading node removal took with it.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Replaces the graph atomically. Nothing changes if validation fails.
    pub fn load(&mut self, graph: Graph) -> Result<u64> {
        graph.validate()?;

        self.graph = graph;
        self.generation += 1;
        self.touch();
        info!(
            generation = self.generation,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "graph loaded"
        );
        Ok(self.generation)
    }

    pub fn load_document(&mut self, document: GraphDocument) -> Result<u64> {
        self.load(document.into_graph()?)
    }

    /// Adds a batch of nodes. A duplicate id rejects the whole batch.
    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if self.graph.nodes.contains_key(&node.id) || !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            graph::check_node(node)?;
        }

        for node in nodes {
            self.graph.nodes.insert(node.id.clone(), node);
        }
        self.touch();
        Ok(())
    }

    /// Adds a batch of edges. A dangling endpoint rejects the whole batch.
    pub fn add_edges(&mut self, edges: Vec<Edge>) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(edges.len());
        for edge in &edges {
            if self.graph.edges.contains_key(&edge.id) || !seen.insert(edge.id.as_str()) {
                return Err(GraphError::DuplicateEdge(edge.id.clone()));
            }
            graph::check_edge(edge, |id| self.graph.nodes.contains_key(id))?;
        }

        for edge in edges {
            self.graph.edges.insert(edge.id.clone(), edge);
        }
        self.touch();
        Ok(())
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Result<RemovedNode> {
        let node = self
            .graph
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))?;

        let incident = self
            .graph
            .edges
            .values()
            .filter(|edge| edge.touches(id))
            .map(|edge| edge.id.clone())
            .collect::<Vec<_>>();
        let mut edges = incident
            .iter()
            .filter_map(|edge_id| self.graph.edges.remove(edge_id))
            .collect::<Vec<_>>();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        self.touch();
        Ok(RemovedNode { node, edges })
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let edge = self
            .graph
            .edges
            .remove(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_owned()))?;
        self.touch();
        Ok(edge)
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.graph
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))
    }

    pub fn edge(&self, id: &str) -> Result<&Edge> {
        self.graph
            .edges
            .get(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_owned()))
    }

    /// Applies one layout frame. Frames computed against an older
    /// generation are dropped; ids that have since been removed are skipped.
    pub fn apply_positions(&mut self, generation: u64, ids: &[String], positions: &[Vec2]) -> usize {
        if generation != self.generation {
            debug!(
                frame_generation = generation,
                current = self.generation,
                "discarding stale layout frame"
            );
            return 0;
        }

        let mut applied = 0usize;
        for (id, position) in ids.iter().zip(positions) {
            if !position.x.is_finite() || !position.y.is_finite() {
                continue;
            }
            if let Some(node) = self.graph.nodes.get_mut(id) {
                node.set_position(*position);
                applied += 1;
            }
        }

        if applied > 0 {
            self.touch();
        }
        applied
    }

    pub fn clear_positions(&mut self) {
        for node in self.graph.nodes.values_mut() {
            node.x = None;
            node.y = None;
        }
        self.touch();
    }

    pub fn apply_styles(&mut self, style: &StyleConfig) {
        style::apply_styles(&mut self.graph, style);
        self.touch();
    }

    /// Sets each node's `highlighted` flag from a predicate.
    pub fn set_highlights(&mut self, mut highlighted: impl FnMut(&Node) -> bool) {
        for node in self.graph.nodes.values_mut() {
            node.highlighted = highlighted(node);
        }
        self.touch();
    }

    /// Sets each node's `hidden` flag from a predicate.
    pub fn set_hidden(&mut self, mut hidden: impl FnMut(&Node) -> bool) {
        for node in self.graph.nodes.values_mut() {
            node.hidden = hidden(node);
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn abc() -> Graph {
        Graph::from_parts(
            vec![
                Node::new("A").with_label("FTD-gene1"),
                Node::new("B"),
                Node::new("C"),
            ],
            vec![Edge::new("A", "B", 0.9), Edge::new("B", "C", 0.2)],
        )
        .expect("valid graph")
    }

    #[test]
    fn load_then_get_returns_every_input_node() {
        let graph = abc();
        let mut model = GraphModel::new();
        assert_eq!(model.load(graph.clone()).expect("load"), 1);

        for (id, node) in &graph.nodes {
            assert_eq!(model.node(id).expect("present"), node);
        }
        assert_eq!(model.edge("A:B").expect("present").score, 0.9);
    }

    #[test]
    fn failed_load_keeps_previous_graph() {
        let mut model = GraphModel::new();
        model.load(abc()).expect("load");

        let broken = Graph {
            nodes: abc().nodes,
            edges: [("X".to_owned(), Edge::new("A", "Z", 0.1).with_id("X"))].into(),
        };
        assert!(model.load(broken).unwrap_err().is_validation());
        assert_eq!(model.generation(), 1);
        assert_eq!(model.graph().edge_count(), 2);
    }

    #[test]
    fn load_rejects_entries_stored_under_another_id() {
        let mut model = GraphModel::new();
        let mut graph = abc();
        let node = graph.nodes.remove("C").expect("C");
        graph.nodes.insert("D".to_owned(), node);

        assert!(matches!(model.load(graph), Err(GraphError::KeyMismatch { .. })));
        assert_eq!(model.generation(), 0);
    }

    #[test]
    fn removing_a_node_cascades_to_its_edges() {
        let mut model = GraphModel::new();
        model.load(abc()).expect("load");

        let removed = model.remove_node("A").expect("present");
        assert_eq!(removed.edges.len(), 1);
        assert_eq!(removed.edges[0].id, "A:B");
        assert!(model.graph().edges.values().all(|edge| !edge.touches("A")));
        assert!(model.edge("A:B").unwrap_err().is_not_found());
        assert!(model.edge("B:C").is_ok());
    }

    #[test]
    fn accessors_report_missing_ids() {
        let model = GraphModel::new();
        assert!(matches!(model.node("nope"), Err(GraphError::NodeNotFound(_))));
        assert!(matches!(model.edge("nope"), Err(GraphError::EdgeNotFound(_))));
    }

    #[test]
    fn add_edges_rejects_whole_batch_on_dangling_endpoint() {
        let mut model = GraphModel::new();
        model.load(abc()).expect("load");

        let result = model.add_edges(vec![Edge::new("A", "C", 0.5), Edge::new("C", "D", 0.5)]);
        assert!(result.unwrap_err().is_validation());
        assert!(model.edge("A:C").is_err());

        model.add_nodes(vec![Node::new("D")]).expect("new node");
        model
            .add_edges(vec![Edge::new("A", "C", 0.5), Edge::new("C", "D", 0.5)])
            .expect("valid batch");
        assert_eq!(model.graph().edge_count(), 4);
    }

    #[test]
    fn stale_frames_are_not_applied() {
        let mut model = GraphModel::new();
        model.load(abc()).expect("load");
        let ids = vec!["A".to_owned(), "B".to_owned()];
        let positions = vec![vec2(1.0, 2.0), vec2(f32::NAN, 0.0)];

        assert_eq!(model.apply_positions(1, &ids, &positions), 1);
        assert_eq!(model.node("A").expect("A").position(), Some(vec2(1.0, 2.0)));
        assert_eq!(model.node("B").expect("B").position(), None);

        model.load(abc()).expect("reload");
        assert_eq!(model.apply_positions(1, &ids, &positions), 0);
        assert_eq!(model.node("A").expect("A").position(), None);
    }
}
