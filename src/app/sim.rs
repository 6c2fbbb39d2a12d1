use eframe::egui::Vec2;

use crate::data::{GraphEdge, GraphNode};
use crate::layout::{BarnesHut, LayoutConfig};

const THETA: f32 = 0.72;
const DAMPING: f32 = 0.9;
const FORCE_TO_VELOCITY: f32 = 0.055;
const MAX_SPEED: f32 = 22.0;
const MAX_FORCE: f32 = 240.0;
const SLEEP_SPEED: f32 = 0.02;
const SLEEP_FORCE: f32 = 0.08;

/// Scale factors lifting the solver's displacement-sized constants to the
/// velocity integration used here.
const REPULSION_SCALE: f32 = 150.0;
const SPRING_SCALE: f32 = 0.08;
const CENTER_SCALE: f32 = 0.2;

/// One incremental force tick, run per frame while the FORCE layout is
/// active so the graph keeps reacting to drags. `temperature` scales all
/// forces (raised by drags and resizes, decays toward rest); pinned nodes
/// are never written. Returns whether anything still moves.
pub fn step(
    nodes: &mut [GraphNode],
    edges: &[GraphEdge],
    center: Vec2,
    config: &LayoutConfig,
    temperature: f32,
    dt: f32,
) -> bool {
    let n = nodes.len();
    if n < 2 || temperature <= 0.0 {
        return false;
    }

    let positions: Vec<Vec2> = nodes.iter().map(|node| node.pos).collect();
    let tree = BarnesHut::build(&positions);
    let mut forces = vec![Vec2::ZERO; n];

    let repulsion = config.charge_strength * REPULSION_SCALE;
    for (index, force) in forces.iter_mut().enumerate() {
        *force += tree.repulsion_at(
            index,
            &positions,
            repulsion,
            config.charge_max_distance,
            THETA,
        );
    }

    let spring = config.spring_strength * SPRING_SCALE;
    for edge in edges {
        if edge.source >= n || edge.target >= n || edge.source == edge.target {
            continue;
        }

        let delta = positions[edge.source] - positions[edge.target];
        let distance = delta.length().max(0.5);
        let direction = delta / distance;
        let correction = direction * ((distance - config.link_distance) * spring);

        forces[edge.source] -= correction;
        forces[edge.target] += correction;
    }

    let min_separation = (config.node_radius * 2.0) + config.collision_padding;
    for index in 0..n {
        let point = positions[index];
        tree.for_each_within(point, min_separation, &positions, &mut |other| {
            if other <= index {
                return;
            }
            let delta = point - positions[other];
            let distance = delta.length().max(0.0001);
            let push = (min_separation - distance) * 0.75;
            if push > 0.0 {
                let direction = delta / distance;
                forces[index] += direction * push;
                forces[other] -= direction * push;
            }
        });
    }

    let center_pull = config.center_strength * CENTER_SCALE;
    for (index, force) in forces.iter_mut().enumerate() {
        *force -= (positions[index] - center) * center_pull;
    }

    let time_scale = (dt * 60.0).clamp(0.25, 3.0);
    let damping_factor = DAMPING.powf(time_scale);
    let mut any_motion = false;

    for (node, force_slot) in nodes.iter_mut().zip(forces.into_iter()) {
        if let Some(pin) = node.pin {
            node.pos = pin;
            node.velocity = Vec2::ZERO;
            continue;
        }

        let mut force = force_slot * temperature;
        let force_len = force.length();
        if force_len > MAX_FORCE {
            force *= MAX_FORCE / force_len;
        }

        let mut velocity =
            (node.velocity + force * (FORCE_TO_VELOCITY * time_scale)) * damping_factor;
        let speed = velocity.length();
        if speed > MAX_SPEED {
            velocity *= MAX_SPEED / speed;
        }

        if velocity.length() < SLEEP_SPEED && force_len < SLEEP_FORCE {
            velocity = Vec2::ZERO;
        }

        node.velocity = velocity;
        node.pos += velocity * time_scale;
        if velocity.length_sq() > 0.000_001 {
            any_motion = true;
        }
    }

    any_motion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;
    use eframe::egui::vec2;

    fn node_at(id: &str, pos: Vec2) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            kind: NodeKind::Module,
            pos,
            velocity: Vec2::ZERO,
            pin: None,
            in_degree: 0,
            out_degree: 0,
        }
    }

    #[test]
    fn a_stretched_edge_contracts() {
        let config = LayoutConfig::default();
        let mut nodes = vec![
            node_at("a", vec2(-150.0, 0.0)),
            node_at("b", vec2(150.0, 0.0)),
        ];
        let edges = vec![GraphEdge { source: 0, target: 1 }];

        let before = (nodes[0].pos - nodes[1].pos).length();
        for _ in 0..60 {
            step(&mut nodes, &edges, Vec2::ZERO, &config, 0.5, 1.0 / 60.0);
        }
        let after = (nodes[0].pos - nodes[1].pos).length();

        assert!(after < before, "separation went {before} -> {after}");
    }

    #[test]
    fn pinned_nodes_hold_their_position() {
        let config = LayoutConfig::default();
        let pin = vec2(-40.0, 25.0);
        let mut nodes = vec![node_at("a", pin), node_at("b", vec2(300.0, 0.0))];
        nodes[0].pin = Some(pin);
        let edges = vec![GraphEdge { source: 0, target: 1 }];

        for _ in 0..30 {
            step(&mut nodes, &edges, Vec2::ZERO, &config, 0.6, 1.0 / 60.0);
        }

        assert_eq!(nodes[0].pos, pin);
        assert_eq!(nodes[0].velocity, Vec2::ZERO);
        assert_ne!(nodes[1].pos, vec2(300.0, 0.0), "the free node reacted");
    }

    #[test]
    fn zero_temperature_means_rest() {
        let config = LayoutConfig::default();
        let mut nodes = vec![
            node_at("a", vec2(-150.0, 0.0)),
            node_at("b", vec2(150.0, 0.0)),
        ];
        let edges = vec![GraphEdge { source: 0, target: 1 }];

        assert!(!step(&mut nodes, &edges, Vec2::ZERO, &config, 0.0, 1.0 / 60.0));
        assert_eq!(nodes[0].pos, vec2(-150.0, 0.0));
    }
}
