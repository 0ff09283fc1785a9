use eframe::egui::Vec2;
use serde::Deserialize;

use super::forces::{CollisionParams, accumulate_collisions, accumulate_repulsion};
use super::quadtree::QuadNode;
use super::{LayoutKind, LayoutState, LayoutStrategy, clamp_displacement};

const SOFTENING: f32 = 620.0;
const SPRING_DAMPING: f32 = 0.22;
const SPRING_REST_LENGTH: f32 = 96.0;
const COLLISION_PADDING: f32 = 4.2;
const FORCE_TO_VELOCITY: f32 = 0.055;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenericForceSettings {
    pub repulsion: f32,
    /// Spring stiffness along edges, multiplied by the normalised edge weight.
    pub attraction: f32,
    /// Pull toward the centroid, proportional to distance.
    pub gravity: f32,
    pub damping: f32,
    /// Overlap separation strength; `0` disables collision handling.
    pub collision: f32,
    /// Upper bound on how far a node may move in one tick.
    pub max_displacement: f32,
    pub barnes_hut_theta: f32,
    /// Above this many nodes repulsion switches from exact to Barnes-Hut.
    pub barnes_hut_threshold: usize,
}

impl Default for GenericForceSettings {
    fn default() -> Self {
        Self {
            repulsion: 78_000.0,
            attraction: 0.016,
            gravity: 0.0011,
            damping: 0.9,
            collision: 1.9,
            max_displacement: 26.0,
            barnes_hut_theta: 0.72,
            barnes_hut_threshold: 256,
        }
    }
}

/// Velocity-integrated spring/charge simulation.
pub struct GenericForce {
    settings: GenericForceSettings,
    forces: Vec<Vec2>,
}

impl GenericForce {
    pub fn new(settings: GenericForceSettings) -> Self {
        Self {
            settings,
            forces: Vec::new(),
        }
    }

    pub fn settings(&self) -> &GenericForceSettings {
        &self.settings
    }
}

impl LayoutStrategy for GenericForce {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Force
    }

    fn tick(&mut self, state: &mut LayoutState) -> bool {
        let node_count = state.len();
        if node_count == 0 {
            return false;
        }

        let settings = &self.settings;
        let forces = &mut self.forces;
        forces.clear();
        forces.resize(node_count, Vec2::ZERO);

        let repulsion = settings.repulsion.max(0.0);
        let theta = if node_count > settings.barnes_hut_threshold {
            settings.barnes_hut_theta.max(0.0)
        } else {
            0.0
        };

        if node_count > 1
            && let Some(tree) = QuadNode::build(&state.positions, &[])
        {
            let kernel = |delta: Vec2, mass: f32| {
                let distance_sq = delta.length_sq();
                delta / distance_sq.sqrt() * (repulsion * mass / (distance_sq + SOFTENING))
            };
            for (index, force) in forces.iter_mut().enumerate() {
                accumulate_repulsion(&tree, index, &state.positions, &[], theta, &kernel, force);
            }

            let max_radius = state.radii.iter().copied().fold(0.0f32, f32::max);
            let max_distance = max_radius * 2.0 * COLLISION_PADDING;
            if settings.collision > 0.0 && max_distance > 0.0 {
                accumulate_collisions(
                    &tree,
                    &tree,
                    true,
                    &state.positions,
                    &state.radii,
                    CollisionParams {
                        strength: settings.collision,
                        padding: COLLISION_PADDING,
                        max_distance_sq: max_distance * max_distance,
                    },
                    forces,
                );
            }
        }

        for edge in &state.edges {
            let (from, to) = (edge.source, edge.target);
            let delta = state.positions[from] - state.positions[to];
            let distance = delta.length();
            if distance <= 0.0001 {
                continue;
            }
            let direction = delta / distance;

            let preferred = SPRING_REST_LENGTH + (state.radii[from] + state.radii[to]) * 4.0;
            let spring = (distance - preferred) * settings.attraction * edge.weight;
            let relative_velocity = state.velocities[from] - state.velocities[to];
            let correction = direction * (spring + relative_velocity.dot(direction) * SPRING_DAMPING);

            forces[from] -= correction;
            forces[to] += correction;
        }

        let centroid = state.centroid();
        for (force, position) in forces.iter_mut().zip(&state.positions) {
            *force -= (*position - centroid) * settings.gravity;
        }

        let damping = settings.damping.clamp(0.0, 0.999);
        let max_speed = settings.max_displacement.max(0.0);
        let mut any_motion = false;
        let mut average_velocity = Vec2::ZERO;
        for (index, force) in forces.iter().enumerate() {
            let mut velocity = (state.velocities[index] + *force * FORCE_TO_VELOCITY) * damping;
            velocity = clamp_displacement(velocity, max_speed);

            if velocity.length_sq() < 0.02 * 0.02 && force.length_sq() < 0.08 * 0.08 {
                velocity = Vec2::ZERO;
            }
            if velocity.length_sq() > 0.000_001 {
                any_motion = true;
            }

            state.velocities[index] = velocity;
            state.positions[index] += velocity;
            average_velocity += velocity;
        }

        // Net drift is removed from the velocities only; positions never move
        // more than one clamped step per tick.
        average_velocity /= node_count as f32;
        for velocity in &mut state.velocities {
            *velocity -= average_velocity;
        }

        state.recover_non_finite();
        any_motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutInput;
    use crate::model::{Edge, Graph, Node};

    fn state_for(graph: &Graph) -> LayoutState {
        LayoutState::from_input(&LayoutInput::from_graph(graph, 1, None))
    }

    fn run(strategy: &mut GenericForce, state: &mut LayoutState, ticks: usize) {
        for _ in 0..ticks {
            strategy.tick(state);
        }
    }

    #[test]
    fn single_isolated_node_stays_bounded() {
        let graph = Graph::from_parts(vec![Node::new("ENSG00000000003")], Vec::new()).expect("graph");
        let mut state = state_for(&graph);
        let mut layout = GenericForce::new(GenericForceSettings::default());

        let start = state.positions[0];
        run(&mut layout, &mut state, 500);
        assert!((state.positions[0] - start).length() < 1.0);
    }

    #[test]
    fn far_from_origin_layout_moves_at_most_one_step_per_tick() {
        let graph = Graph::from_parts(
            vec![
                Node::new("A").with_position(10_000.0, 10_000.0),
                Node::new("B").with_position(10_100.0, 10_000.0),
            ],
            vec![Edge::new("A", "B", 1.0)],
        )
        .expect("graph");
        let mut state = state_for(&graph);
        let mut layout = GenericForce::new(GenericForceSettings::default());
        let max_step = layout.settings().max_displacement;

        for _ in 0..50 {
            let before = state.positions.clone();
            layout.tick(&mut state);
            for (old, new) in before.iter().zip(&state.positions) {
                let step = (*old - *new).length();
                assert!(step <= max_step + 1e-3, "step {step}");
            }
        }
        let centroid = state.centroid();
        assert!((centroid - Vec2::new(10_050.0, 10_000.0)).length() < 100.0);
    }

    #[test]
    fn connected_nodes_end_closer_than_unconnected() {
        let graph = Graph::from_parts(
            vec![Node::new("A"), Node::new("B"), Node::new("C"), Node::new("D")],
            vec![Edge::new("A", "B", 1.0), Edge::new("C", "D", 1.0)],
        )
        .expect("graph");
        let mut state = state_for(&graph);
        let mut layout = GenericForce::new(GenericForceSettings {
            attraction: 0.2,
            ..GenericForceSettings::default()
        });

        run(&mut layout, &mut state, 600);
        let linked = (state.positions[0] - state.positions[1]).length();
        let unlinked = (state.positions[0] - state.positions[2]).length();
        assert!(linked < unlinked, "linked {linked} unlinked {unlinked}");
    }

    #[test]
    fn disconnected_graph_remains_finite_and_bounded() {
        let nodes = (0..60).map(|index| Node::new(format!("G{index}"))).collect::<Vec<_>>();
        let edges = vec![Edge::new("G0", "G1", 0.0), Edge::new("G2", "G3", 1e9)];
        let graph = Graph::from_parts(nodes, edges).expect("graph");
        let mut state = state_for(&graph);
        let mut layout = GenericForce::new(GenericForceSettings {
            barnes_hut_threshold: 10,
            ..GenericForceSettings::default()
        });

        let max_step = layout.settings().max_displacement;
        for _ in 0..300 {
            let before = state.positions.clone();
            layout.tick(&mut state);
            for (old, new) in before.iter().zip(&state.positions) {
                assert!(new.x.is_finite() && new.y.is_finite());
                assert!((*old - *new).length() <= max_step + 1e-3);
            }
        }
        let centroid = state.centroid();
        assert!(state.positions.iter().all(|position| (*position - centroid).length() < 20_000.0));
    }
}
