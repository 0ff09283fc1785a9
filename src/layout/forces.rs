use eframe::egui::Vec2;

use super::fallback_direction;
use super::quadtree::QuadNode;

const MIN_DELTA_SQ: f32 = 0.0001 * 0.0001;

/// Accumulates the repulsion felt by `index` from every other point.
///
/// `kernel(delta, other_mass)` returns the force for a separation `delta`
/// pointing away from the source. Cells whose side over distance is below
/// `theta` are collapsed to their centre of mass; `theta == 0` is exact.
pub(super) fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    masses: &[f32],
    theta: f32,
    kernel: &impl Fn(Vec2, f32) -> Vec2,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let delta = separation(point - positions[other], index, other);
            *force += kernel(delta, masses.get(other).copied().unwrap_or(1.0));
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance = delta.length_sq().max(MIN_DELTA_SQ).sqrt();
    let can_approximate = theta > 0.0
        && !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < theta;

    if can_approximate {
        *force += kernel(delta, node.mass);
        return;
    }

    for child in node.children() {
        accumulate_repulsion(child, index, positions, masses, theta, kernel, force);
    }
}

fn separation(delta: Vec2, a: usize, b: usize) -> Vec2 {
    if delta.length_sq() > MIN_DELTA_SQ {
        delta
    } else {
        fallback_direction(a, b) * 0.01
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) padding: f32,
    pub(super) max_distance_sq: f32,
}

fn push_apart(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        fallback_direction(from, to)
    };

    let min_distance = (radii[from] + radii[to]) * params.padding;
    if distance < min_distance {
        let push = direction * (min_distance - distance) * params.strength;
        forces[from] += push;
        forces[to] -= push;
    }
}

/// Separates overlapping nodes, skipping cell pairs further apart than
/// `max_distance_sq`.
pub(super) fn accumulate_collisions(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    push_apart(from, to, positions, radii, params, forces);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_apart(from, to, positions, radii, params, forces);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, positions, radii, params, forces);
            for child_b in &children[offset + 1..] {
                accumulate_collisions(child_a, child_b, false, positions, radii, params, forces);
            }
        }
        return;
    }

    let split_a = !node_a.is_leaf()
        && (node_b.is_leaf() || node_a.bounds.half_extent >= node_b.bounds.half_extent);

    if split_a {
        for child in node_a.children() {
            accumulate_collisions(child, node_b, false, positions, radii, params, forces);
        }
    } else {
        for child in node_b.children() {
            accumulate_collisions(node_a, child, false, positions, radii, params, forces);
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn inverse_square(delta: Vec2, mass: f32) -> Vec2 {
        let distance_sq = delta.length_sq();
        delta / distance_sq.sqrt() * (mass * 1000.0 / (distance_sq + 1.0))
    }

    fn scattered(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| {
                let (x, y) = crate::util::stable_pair(&format!("n{index}"));
                vec2(x * 500.0, y * 500.0)
            })
            .collect()
    }

    #[test]
    fn barnes_hut_stays_close_to_exact_sum() {
        let mut positions = scattered(400);
        positions[0] = vec2(-700.0, -650.0);
        let tree = QuadNode::build(&positions, &[]).expect("finite points");

        let mut exact = Vec2::ZERO;
        accumulate_repulsion(&tree, 0, &positions, &[], 0.0, &inverse_square, &mut exact);
        let mut approximate = Vec2::ZERO;
        accumulate_repulsion(&tree, 0, &positions, &[], 0.7, &inverse_square, &mut approximate);

        let error = (exact - approximate).length() / exact.length().max(1e-6);
        assert!(error < 0.1, "relative error {error}");
    }

    #[test]
    fn exact_repulsion_pushes_two_points_apart() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build(&positions, &[]).expect("finite points");

        let mut force = Vec2::ZERO;
        accumulate_repulsion(&tree, 0, &positions, &[], 0.0, &inverse_square, &mut force);
        assert!(force.x < 0.0);
        assert!(force.y.abs() < 1e-6);
    }

    #[test]
    fn overlapping_nodes_are_pushed_apart_symmetrically() {
        let positions = vec![vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(500.0, 500.0)];
        let radii = vec![5.0, 5.0, 5.0];
        let tree = QuadNode::build(&positions, &[]).expect("finite points");
        let mut forces = vec![Vec2::ZERO; 3];

        accumulate_collisions(
            &tree,
            &tree,
            true,
            &positions,
            &radii,
            CollisionParams {
                strength: 1.0,
                padding: 1.0,
                max_distance_sq: 100.0,
            },
            &mut forces,
        );

        assert!(forces[0].x < 0.0 && forces[1].x > 0.0);
        assert!((forces[0] + forces[1]).length() < 1e-5);
        assert_eq!(forces[2], Vec2::ZERO);
    }
}
