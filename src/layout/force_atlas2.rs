//! ForceAtlas2 (Jacomy et al.), without node-size adjustment.

use eframe::egui::Vec2;
use serde::Deserialize;

use super::forces::accumulate_repulsion;
use super::quadtree::QuadNode;
use super::{LayoutKind, LayoutState, LayoutStrategy, clamp_displacement, fallback_direction};

const SETTLED_DISPLACEMENT: f32 = 0.01;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceAtlas2Settings {
    /// Edge attribute used as attraction weight; `score` when unset.
    pub edge_weight_attribute: Option<String>,
    /// Divides every displacement; larger values animate more smoothly.
    pub slow_down: f32,
    pub barnes_hut_optimize: bool,
    pub barnes_hut_theta: f32,
    /// Logarithmic attraction, which produces tighter clusters.
    pub lin_log_mode: bool,
    pub gravity: f32,
    pub strong_gravity_mode: bool,
    pub scaling_ratio: f32,
    pub outbound_attraction_distribution: bool,
    pub edge_weight_influence: f32,
    pub max_displacement: f32,
}

impl Default for ForceAtlas2Settings {
    fn default() -> Self {
        Self {
            edge_weight_attribute: None,
            slow_down: 1.0,
            barnes_hut_optimize: true,
            barnes_hut_theta: 0.5,
            lin_log_mode: false,
            gravity: 1.0,
            strong_gravity_mode: false,
            scaling_ratio: 10.0,
            outbound_attraction_distribution: false,
            edge_weight_influence: 1.0,
            max_displacement: 20.0,
        }
    }
}

/// Per-node speed adaptation survives between ticks, so this strategy must
/// be kept alive across a pause for the run to resume smoothly.
pub struct ForceAtlas2 {
    settings: ForceAtlas2Settings,
    forces: Vec<Vec2>,
    previous: Vec<Vec2>,
    convergence: Vec<f32>,
}

impl ForceAtlas2 {
    pub fn new(settings: ForceAtlas2Settings) -> Self {
        Self {
            settings,
            forces: Vec::new(),
            previous: Vec::new(),
            convergence: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ForceAtlas2Settings {
        &self.settings
    }

    fn repulsion(&mut self, state: &LayoutState) {
        let scaling = self.settings.scaling_ratio.max(0.0);
        let positions = &state.positions;
        let masses = &state.masses;

        if self.settings.barnes_hut_optimize {
            let Some(tree) = QuadNode::build(positions, masses) else {
                return;
            };
            let theta = self.settings.barnes_hut_theta.max(0.0);
            for (index, force) in self.forces.iter_mut().enumerate() {
                let own_mass = masses[index];
                let kernel = |delta: Vec2, mass: f32| {
                    delta * (scaling * own_mass * mass / delta.length_sq())
                };
                accumulate_repulsion(&tree, index, positions, masses, theta, &kernel, force);
            }
            return;
        }

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let mut delta = positions[i] - positions[j];
                if delta.length_sq() < 1e-8 {
                    delta = fallback_direction(i, j) * 0.01;
                }
                let push = delta * (scaling * masses[i] * masses[j] / delta.length_sq());
                self.forces[i] += push;
                self.forces[j] -= push;
            }
        }
    }

    fn gravity(&mut self, state: &LayoutState) {
        let centroid = state.centroid();
        let scaling = self.settings.scaling_ratio.max(0.0);
        let gravity = self.settings.gravity;

        for ((force, position), mass) in self.forces.iter_mut().zip(&state.positions).zip(&state.masses) {
            let offset = *position - centroid;
            let distance = offset.length();
            if distance <= 0.0 {
                continue;
            }
            let factor = if self.settings.strong_gravity_mode {
                scaling * mass * gravity
            } else {
                scaling * mass * gravity / distance
            };
            *force -= offset * factor;
        }
    }

    fn attraction(&mut self, state: &LayoutState) {
        let compensation = if self.settings.outbound_attraction_distribution {
            state.masses.iter().sum::<f32>() / state.len() as f32
        } else {
            1.0
        };
        let influence = self.settings.edge_weight_influence;

        for edge in &state.edges {
            let (source, target) = (edge.source, edge.target);
            let weight = if influence == 0.0 {
                1.0
            } else if influence == 1.0 {
                edge.weight
            } else {
                edge.weight.powf(influence)
            };

            let delta = state.positions[source] - state.positions[target];
            let distance = delta.length();
            let mut factor = if self.settings.lin_log_mode {
                if distance <= 0.0 {
                    continue;
                }
                -compensation * weight * (1.0 + distance).ln() / distance
            } else {
                -compensation * weight
            };
            if self.settings.outbound_attraction_distribution {
                factor /= state.masses[source];
            }

            self.forces[source] += delta * factor;
            self.forces[target] -= delta * factor;
        }
    }
}

impl LayoutStrategy for ForceAtlas2 {
    fn kind(&self) -> LayoutKind {
        LayoutKind::ForceAtlas2
    }

    fn tick(&mut self, state: &mut LayoutState) -> bool {
        let node_count = state.len();
        if node_count == 0 {
            return false;
        }

        if self.previous.len() != node_count {
            self.previous = vec![Vec2::ZERO; node_count];
            self.convergence = vec![1.0; node_count];
        }
        self.forces.clear();
        self.forces.resize(node_count, Vec2::ZERO);

        if node_count > 1 {
            self.repulsion(state);
        }
        self.gravity(state);
        self.attraction(state);

        let slow_down = self.settings.slow_down.max(0.01);
        let max_displacement = self.settings.max_displacement.max(0.0);
        let mut largest_step = 0.0f32;
        for index in 0..node_count {
            let force = self.forces[index];
            let previous = self.previous[index];
            let swinging = state.masses[index] * (previous - force).length();
            let traction = (previous + force).length() * 0.5;
            let damping = 1.0 + swinging.sqrt();

            let node_speed = self.convergence[index] * (1.0 + traction).ln() / damping;
            let convergence = (node_speed * force.length_sq() / damping).sqrt();
            self.convergence[index] = if convergence.is_finite() {
                convergence.min(1.0)
            } else {
                1.0
            };

            let step = clamp_displacement(force * (node_speed / slow_down), max_displacement);
            state.positions[index] += step;
            state.velocities[index] = step;
            largest_step = largest_step.max(step.length());
            self.previous[index] = if force.is_finite() { force } else { Vec2::ZERO };
        }

        state.recover_non_finite();
        largest_step > SETTLED_DISPLACEMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutInput;
    use crate::model::{Edge, Graph, Node};

    fn two_clusters() -> Graph {
        let ids = ["A1", "A2", "A3", "B1", "B2", "B3"];
        let nodes = ids.iter().map(|id| Node::new(*id)).collect();
        let edges = vec![
            Edge::new("A1", "A2", 0.9),
            Edge::new("A2", "A3", 0.9),
            Edge::new("A1", "A3", 0.9),
            Edge::new("B1", "B2", 0.9),
            Edge::new("B2", "B3", 0.9),
            Edge::new("B1", "B3", 0.9),
            Edge::new("A1", "B1", 0.05),
        ];
        Graph::from_parts(nodes, edges).expect("graph")
    }

    fn run(settings: ForceAtlas2Settings, graph: &Graph, ticks: usize) -> LayoutState {
        let mut state = LayoutState::from_input(&LayoutInput::from_graph(graph, 1, None));
        let mut layout = ForceAtlas2::new(settings);
        for _ in 0..ticks {
            layout.tick(&mut state);
        }
        state
    }

    fn mean_intra_cluster_distance(state: &LayoutState) -> f32 {
        let pairs = [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)];
        pairs
            .iter()
            .map(|&(a, b)| (state.positions[a] - state.positions[b]).length())
            .sum::<f32>()
            / pairs.len() as f32
    }

    #[test]
    fn clusters_separate_under_both_attraction_modes() {
        for lin_log_mode in [false, true] {
            let settings = ForceAtlas2Settings {
                lin_log_mode,
                gravity: 0.05,
                ..ForceAtlas2Settings::default()
            };
            let state = run(settings, &two_clusters(), 600);

            let intra = mean_intra_cluster_distance(&state);
            let inter = (state.positions[2] - state.positions[5]).length();
            assert!(intra < inter, "lin_log={lin_log_mode} intra {intra} inter {inter}");
        }
    }

    #[test]
    fn isolated_nodes_do_not_diverge() {
        let nodes = (0..30).map(|index| Node::new(format!("ISO{index}"))).collect();
        let graph = Graph::from_parts(nodes, Vec::new()).expect("graph");

        for barnes_hut_optimize in [false, true] {
            let state = run(
                ForceAtlas2Settings {
                    barnes_hut_optimize,
                    ..ForceAtlas2Settings::default()
                },
                &graph,
                1000,
            );
            let centroid = state.centroid();
            for position in &state.positions {
                assert!(position.x.is_finite() && position.y.is_finite());
                assert!((*position - centroid).length() < 5_000.0);
            }
        }
    }

    #[test]
    fn slow_down_shrinks_the_first_step() {
        let graph = two_clusters();
        let start = LayoutState::from_input(&LayoutInput::from_graph(&graph, 1, None));
        let step = |slow_down: f32| {
            let mut state = start.clone();
            ForceAtlas2::new(ForceAtlas2Settings {
                slow_down,
                max_displacement: f32::MAX,
                ..ForceAtlas2Settings::default()
            })
            .tick(&mut state);
            (state.positions[0] - start.positions[0]).length()
        };

        let fast = step(1.0);
        let slow = step(10.0);
        assert!(slow < fast);
        assert!((slow * 10.0 - fast).abs() < fast * 1e-3);
    }

    #[test]
    fn single_node_does_not_move() {
        let graph = Graph::from_parts(vec![Node::new("ONLY")], Vec::new()).expect("graph");
        let mut state = LayoutState::from_input(&LayoutInput::from_graph(&graph, 1, None));
        let before = state.positions[0];
        let moving = ForceAtlas2::new(ForceAtlas2Settings::default()).tick(&mut state);
        assert!(!moving);
        assert_eq!(state.positions[0], before);
    }
}
