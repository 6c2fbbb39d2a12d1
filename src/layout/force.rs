use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;

use super::quadtree::BarnesHut;
use super::{LayoutBounds, LayoutConfig, LayoutInput};

const BARNES_HUT_THETA: f32 = 0.72;
const COOLING: f32 = 0.965;
const STEP_SCALE: f32 = 0.92;
const MIN_TEMPERATURE: f32 = 0.5;

/// One-shot force-directed solve: iterates until the configured budget is
/// exhausted or the layout's kinetic energy falls below the epsilon,
/// whichever comes first. Deterministic for identical input.
pub(super) fn solve(input: &LayoutInput, bounds: LayoutBounds, config: &LayoutConfig) -> Vec<Vec2> {
    let n = input.node_count();
    if n == 0 {
        return Vec::new();
    }

    let mut positions = seed_positions(input, bounds, config);
    if n == 1 {
        return positions;
    }

    let min_separation = (config.node_radius * 2.0) + config.collision_padding;
    let mut temperature = (config.link_distance * 2.5).max(120.0);
    let mut displacement = vec![Vec2::ZERO; n];

    for _ in 0..config.iterations {
        displacement.fill(Vec2::ZERO);
        let tree = BarnesHut::build(&positions);

        for (index, slot) in displacement.iter_mut().enumerate() {
            *slot += tree.repulsion_at(
                index,
                &positions,
                config.charge_strength,
                config.charge_max_distance,
                BARNES_HUT_THETA,
            );
        }

        for &(from, to) in &input.edges {
            if from >= n || to >= n || from == to {
                continue;
            }

            let delta = positions[from] - positions[to];
            let distance = delta.length().max(0.5);
            let direction = delta / distance;
            let stretch = (distance - config.link_distance) * config.spring_strength;

            displacement[from] -= direction * stretch;
            displacement[to] += direction * stretch;
        }

        accumulate_collisions(&tree, &positions, min_separation, &mut displacement);

        for (index, slot) in displacement.iter_mut().enumerate() {
            *slot -= (positions[index] - bounds.center) * config.center_strength;
        }

        let mut energy = 0.0_f32;
        for index in 0..n {
            if input.pin(index).is_some() {
                continue;
            }

            let step = displacement[index];
            let length = step.length();
            if length <= 0.0 {
                continue;
            }

            let applied = step / length * length.min(temperature) * STEP_SCALE;
            positions[index] += applied;
            energy += applied.length_sq();
        }

        if energy / n as f32 <= config.energy_epsilon {
            break;
        }

        temperature *= COOLING;
        if temperature < MIN_TEMPERATURE {
            break;
        }
    }

    positions
}

/// Warm-starts from the caller's current positions so a recompute does not
/// teleport the graph; a degenerate position set (missing or collapsed to a
/// point) falls back to a deterministic hash-seeded ring.
fn seed_positions(input: &LayoutInput, bounds: LayoutBounds, config: &LayoutConfig) -> Vec<Vec2> {
    let n = input.node_count();
    let provided = &input.positions;
    let usable = provided.len() == n
        && !provided
            .windows(2)
            .all(|pair| (pair[0] - pair[1]).length_sq() < 1e-6);
    let ring_radius = (n as f32).sqrt() * config.link_distance * 0.5;

    (0..n)
        .map(|index| {
            if let Some(pin) = input.pin(index) {
                return pin;
            }
            if usable {
                return provided[index];
            }

            let angle = (index as f32 / n as f32) * TAU;
            let (jx, jy) = stable_pair(&input.ids[index]);
            let jitter = vec2(jx, jy) * (config.link_distance * 0.5);
            bounds.center + vec2(angle.cos(), angle.sin()) * ring_radius + jitter
        })
        .collect()
}

fn accumulate_collisions(
    tree: &BarnesHut,
    positions: &[Vec2],
    min_separation: f32,
    displacement: &mut [Vec2],
) {
    for index in 0..positions.len() {
        let point = positions[index];
        tree.for_each_within(point, min_separation, positions, &mut |other| {
            // Each unordered pair is resolved once.
            if other <= index {
                return;
            }

            let delta = point - positions[other];
            let distance = delta.length();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                let angle = ((index as f32) * 0.618_034 + (other as f32) * 0.414_214) * TAU;
                vec2(angle.cos(), angle.sin())
            };

            let push = (min_separation - distance) * 0.5;
            if push > 0.0 {
                displacement[index] += direction * push;
                displacement[other] -= direction * push;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::{LayoutKind, compute_layout};
    use super::*;

    fn input_with(ids: &[&str], edges: &[(usize, usize)]) -> LayoutInput {
        LayoutInput {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            edges: edges.to_vec(),
            positions: vec![Vec2::ZERO; ids.len()],
            pins: vec![None; ids.len()],
        }
    }

    #[test]
    fn two_linked_nodes_settle_near_the_link_distance() {
        let config = LayoutConfig::default();
        let input = input_with(&["a", "b"], &[(0, 1)]);
        let positions = solve(&input, LayoutBounds::default(), &config);

        let separation = (positions[0] - positions[1]).length();
        assert!(
            (config.link_distance * 0.8..=config.link_distance * 1.2).contains(&separation),
            "separation {separation} outside 20% of {}",
            config.link_distance
        );
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let input = input_with(&["a", "b", "c", "d"], &[(0, 1), (1, 2), (2, 3)]);
        let first = solve(&input, LayoutBounds::default(), &LayoutConfig::default());
        let second = solve(&input, LayoutBounds::default(), &LayoutConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn converged_nodes_do_not_overlap() {
        let ids: Vec<String> = (0..12).map(|i| format!("node-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(usize, usize)> = (1..12).map(|i| (0, i)).collect();
        let config = LayoutConfig::default();
        let positions = solve(
            &input_with(&id_refs, &edges),
            LayoutBounds::default(),
            &config,
        );

        let floor = config.node_radius * 2.0 * 0.75;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let separation = (positions[i] - positions[j]).length();
                assert!(
                    separation >= floor,
                    "nodes {i} and {j} overlap: separation {separation} < {floor}"
                );
            }
        }
    }

    #[test]
    fn pinned_nodes_never_move() {
        let pin = vec2(37.0, -18.0);
        let mut input = input_with(&["a", "b", "c"], &[(0, 1), (0, 2)]);
        input.pins[1] = Some(pin);

        let positions = compute_layout(
            LayoutKind::Force,
            &input,
            LayoutBounds::default(),
            &LayoutConfig::default(),
        );
        assert_eq!(positions[1], pin);
    }
}
