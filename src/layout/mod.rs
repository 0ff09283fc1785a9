//! Force-directed layout strategies and the state they iterate on.
//!
//! A strategy never touches the [`Graph`] directly: the supervisor hands it a
//! [`LayoutState`] built from a [`LayoutInput`] snapshot, and positions flow
//! back to the owner thread as frames.

mod force;
mod force_atlas2;
mod forces;
mod quadtree;

use std::f32::consts::TAU;
use std::fmt;
use std::sync::Arc;

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

pub use force::{GenericForce, GenericForceSettings};
pub use force_atlas2::{ForceAtlas2, ForceAtlas2Settings};

use crate::model::Graph;
use crate::util::stable_pair;

/// Substituted for missing, zero, negative or non-finite edge weights.
pub const MIN_EDGE_WEIGHT: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Force,
    ForceAtlas2,
}

impl LayoutKind {
    pub const ALL: [Self; 2] = [Self::Force, Self::ForceAtlas2];

    pub fn label(self) -> &'static str {
        match self {
            Self::Force => "Force",
            Self::ForceAtlas2 => "ForceAtlas2",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settings for one run. Changing them means restarting the run.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutSettings {
    Force(GenericForceSettings),
    ForceAtlas2(ForceAtlas2Settings),
}

impl LayoutSettings {
    pub fn kind(&self) -> LayoutKind {
        match self {
            Self::Force(_) => LayoutKind::Force,
            Self::ForceAtlas2(_) => LayoutKind::ForceAtlas2,
        }
    }

    pub fn edge_weight_attribute(&self) -> Option<&str> {
        match self {
            Self::Force(_) => None,
            Self::ForceAtlas2(settings) => settings.edge_weight_attribute.as_deref(),
        }
    }

    pub fn build_strategy(&self) -> Box<dyn LayoutStrategy> {
        match self {
            Self::Force(settings) => Box::new(GenericForce::new(settings.clone())),
            Self::ForceAtlas2(settings) => Box::new(ForceAtlas2::new(settings.clone())),
        }
    }
}

impl From<GenericForceSettings> for LayoutSettings {
    fn from(settings: GenericForceSettings) -> Self {
        Self::Force(settings)
    }
}

impl From<ForceAtlas2Settings> for LayoutSettings {
    fn from(settings: ForceAtlas2Settings) -> Self {
        Self::ForceAtlas2(settings)
    }
}

/// One iteration step of a layout algorithm.
///
/// Implementations own their per-node bookkeeping between ticks, so pausing
/// a worker and resuming it continues the same simulation.
pub trait LayoutStrategy: Send {
    fn kind(&self) -> LayoutKind;

    /// Moves `state.positions` one step. Returns `false` once the layout has settled.
    fn tick(&mut self, state: &mut LayoutState) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutEdge {
    pub source: usize,
    pub target: usize,
    /// Normalised into `[MIN_EDGE_WEIGHT, 1]`.
    pub weight: f32,
}

/// Copy of everything a worker needs, taken on the owner thread at start.
#[derive(Clone, Debug)]
pub struct LayoutInput {
    pub generation: u64,
    pub ids: Arc<[String]>,
    pub positions: Vec<Option<Vec2>>,
    pub sizes: Vec<f32>,
    pub edges: Vec<LayoutEdge>,
}

impl LayoutInput {
    pub fn from_graph(graph: &Graph, generation: u64, weight_attribute: Option<&str>) -> Self {
        let ids = graph.sorted_node_ids();
        let index_by_id = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect::<std::collections::HashMap<_, _>>();

        let mut positions = Vec::with_capacity(ids.len());
        let mut sizes = Vec::with_capacity(ids.len());
        for id in &ids {
            let node = &graph.nodes[id];
            positions.push(node.position());
            sizes.push(node.size.max(0.0));
        }

        let mut edge_ids = graph.edges.keys().collect::<Vec<_>>();
        edge_ids.sort_unstable();

        let mut raw_edges = Vec::with_capacity(edge_ids.len());
        let mut max_weight = 0.0f32;
        for edge_id in edge_ids {
            let edge = &graph.edges[edge_id];
            let (Some(&source), Some(&target)) = (
                index_by_id.get(edge.source.as_str()),
                index_by_id.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if source == target {
                continue;
            }

            let weight = edge
                .weight(weight_attribute)
                .map(|weight| weight as f32)
                .filter(|weight| weight.is_finite() && *weight > 0.0)
                .unwrap_or(MIN_EDGE_WEIGHT);
            max_weight = max_weight.max(weight);
            raw_edges.push(LayoutEdge {
                source,
                target,
                weight,
            });
        }

        if max_weight > 0.0 {
            for edge in &mut raw_edges {
                edge.weight = (edge.weight / max_weight).max(MIN_EDGE_WEIGHT);
            }
        }

        Self {
            generation,
            ids: ids.into(),
            positions,
            sizes,
            edges: raw_edges,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Mutable simulation state owned by a worker thread.
#[derive(Clone, Debug)]
pub struct LayoutState {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    /// Degree + 1, the node mass used by ForceAtlas2 and the quadtree.
    pub masses: Vec<f32>,
    pub radii: Vec<f32>,
    pub edges: Vec<LayoutEdge>,
    seeds: Vec<Vec2>,
}

impl LayoutState {
    /// Nodes without a position are spread on a ring with hashed jitter.
    pub fn from_input(input: &LayoutInput) -> Self {
        let n = input.len();
        let base_radius = (n as f32).sqrt() * 60.0;

        let seeds = input
            .ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let angle = (index as f32 / n.max(1) as f32) * TAU;
                let (jx, jy) = stable_pair(id);
                vec2(angle.cos(), angle.sin()) * base_radius + vec2(jx, jy) * 40.0
            })
            .collect::<Vec<_>>();

        let positions = input
            .positions
            .iter()
            .zip(&seeds)
            .map(|(position, seed)| {
                position
                    .filter(|position| position.x.is_finite() && position.y.is_finite())
                    .unwrap_or(*seed)
            })
            .collect::<Vec<_>>();

        let mut masses = vec![1.0f32; n];
        for edge in &input.edges {
            masses[edge.source] += 1.0;
            masses[edge.target] += 1.0;
        }

        Self {
            positions,
            velocities: vec![Vec2::ZERO; n],
            masses,
            radii: input.sizes.clone(),
            edges: input.edges.clone(),
            seeds,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn centroid(&self) -> Vec2 {
        if self.positions.is_empty() {
            return Vec2::ZERO;
        }
        self.positions.iter().fold(Vec2::ZERO, |sum, position| sum + *position)
            / self.positions.len() as f32
    }

    /// Puts any node that went non-finite back on its seed position.
    pub(crate) fn recover_non_finite(&mut self) -> usize {
        let mut recovered = 0usize;
        for index in 0..self.positions.len() {
            let position = self.positions[index];
            if position.x.is_finite() && position.y.is_finite() {
                continue;
            }
            self.positions[index] = self.seeds[index];
            self.velocities[index] = Vec2::ZERO;
            recovered += 1;
        }
        if recovered > 0 {
            tracing::debug!(recovered, "reset non-finite layout positions");
        }
        recovered
    }
}

/// Caps `displacement` to `max_length`, zeroing non-finite input.
pub(crate) fn clamp_displacement(displacement: Vec2, max_length: f32) -> Vec2 {
    if !displacement.x.is_finite() || !displacement.y.is_finite() {
        return Vec2::ZERO;
    }

    let length_sq = displacement.length_sq();
    if length_sq > max_length * max_length {
        displacement * (max_length / length_sq.sqrt())
    } else {
        displacement
    }
}

/// Direction used when two points coincide, stable per index pair.
pub(crate) fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};

    #[test]
    fn input_normalises_weights_and_sorts_ids() {
        let graph = Graph::from_parts(
            vec![
                Node::new("C"),
                Node::new("A").with_position(5.0, 6.0),
                Node::new("B"),
            ],
            vec![
                Edge::new("A", "B", 800.0),
                Edge::new("B", "C", 0.0),
                Edge::new("A", "C", 400.0),
            ],
        )
        .expect("valid graph");

        let input = LayoutInput::from_graph(&graph, 7, None);
        assert_eq!(&*input.ids, &["A".to_owned(), "B".to_owned(), "C".to_owned()]);
        assert_eq!(input.generation, 7);
        assert_eq!(input.positions[0], Some(vec2(5.0, 6.0)));
        assert_eq!(input.positions[1], None);

        let weights = input.edges.iter().map(|edge| edge.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![1.0, 0.5, MIN_EDGE_WEIGHT]);
    }

    #[test]
    fn state_seeds_unset_positions_and_counts_mass() {
        let graph = Graph::from_parts(
            vec![Node::new("A"), Node::new("B").with_position(1.0, 1.0)],
            vec![Edge::new("A", "B", 1.0)],
        )
        .expect("valid graph");

        let state = LayoutState::from_input(&LayoutInput::from_graph(&graph, 1, None));
        assert!(state.positions[0].length() > 0.0);
        assert_eq!(state.positions[1], vec2(1.0, 1.0));
        assert_eq!(state.masses, vec![2.0, 2.0]);
    }

    #[test]
    fn clamp_caps_length_and_drops_nan() {
        let clamped = clamp_displacement(vec2(30.0, 40.0), 10.0);
        assert!((clamped.length() - 10.0).abs() < 1e-4);
        assert_eq!(clamp_displacement(vec2(f32::NAN, 1.0), 10.0), Vec2::ZERO);
        assert_eq!(clamp_displacement(vec2(1.0, 1.0), 10.0), vec2(1.0, 1.0));
    }
}
