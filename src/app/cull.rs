use eframe::egui::{Rect, Vec2};

use crate::data::GraphEdge;

/// Per-frame visibility decision for the active render backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleSet {
    pub node_visible: Vec<bool>,
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
}

/// Pure function of (positions, edges, rect): a node is visible iff its
/// position lies within the rect (inclusive bounds); an edge is visible iff
/// at least one endpoint is, so edges crossing the viewport boundary keep
/// rendering. O(n + e); endpoints are pre-resolved indices.
pub fn cull(positions: &[Vec2], edges: &[GraphEdge], visible_rect: Rect) -> VisibleSet {
    let mut node_visible = Vec::with_capacity(positions.len());
    let mut nodes = Vec::new();
    for (index, position) in positions.iter().enumerate() {
        let inside = visible_rect.contains(position.to_pos2());
        node_visible.push(inside);
        if inside {
            nodes.push(index);
        }
    }

    let mut visible_edges = Vec::new();
    for (index, edge) in edges.iter().enumerate() {
        let source_inside = node_visible.get(edge.source).copied().unwrap_or(false);
        let target_inside = node_visible.get(edge.target).copied().unwrap_or(false);
        if source_inside || target_inside {
            visible_edges.push(index);
        }
    }

    VisibleSet {
        node_visible,
        nodes,
        edges: visible_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn rect_100() -> Rect {
        Rect::from_min_max(pos2(-100.0, -100.0), pos2(100.0, 100.0))
    }

    #[test]
    fn nodes_are_tested_with_inclusive_bounds() {
        let positions = vec![
            vec2(0.0, 0.0),
            vec2(100.0, 100.0),
            vec2(-100.0, 40.0),
            vec2(100.1, 0.0),
        ];
        let visible = cull(&positions, &[], rect_100());
        assert_eq!(visible.nodes, vec![0, 1, 2]);
        assert_eq!(visible.node_visible, vec![true, true, true, false]);
    }

    #[test]
    fn an_edge_with_one_visible_endpoint_stays_rendered() {
        let positions = vec![vec2(0.0, 0.0), vec2(500.0, 0.0), vec2(600.0, 0.0)];
        let edges = vec![
            GraphEdge { source: 0, target: 1 },
            GraphEdge { source: 1, target: 2 },
        ];

        let visible = cull(&positions, &edges, rect_100());
        assert_eq!(visible.edges, vec![0], "only the boundary-crossing edge survives");
    }

    #[test]
    fn culling_is_idempotent_for_identical_inputs() {
        let positions = vec![vec2(10.0, 10.0), vec2(250.0, -30.0), vec2(-99.0, 99.0)];
        let edges = vec![
            GraphEdge { source: 0, target: 1 },
            GraphEdge { source: 1, target: 2 },
        ];

        let first = cull(&positions, &edges, rect_100());
        let second = cull(&positions, &edges, rect_100());
        assert_eq!(first, second);
    }

    #[test]
    fn everything_hidden_when_the_rect_is_elsewhere() {
        let positions = vec![vec2(0.0, 0.0), vec2(5.0, 5.0)];
        let edges = vec![GraphEdge { source: 0, target: 1 }];
        let rect = Rect::from_min_max(pos2(1000.0, 1000.0), pos2(1200.0, 1200.0));

        let visible = cull(&positions, &edges, rect);
        assert!(visible.nodes.is_empty());
        assert!(visible.edges.is_empty());
    }
}
