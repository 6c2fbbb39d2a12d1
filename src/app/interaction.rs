use eframe::egui::Vec2;

use crate::data::GraphNode;

/// Drag state for the canvas. A node moves through `Free -> Dragging ->
/// Free`; while dragging, the node's pin is the single writer of its
/// position. Background drags pan instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Panning,
    DraggingNode { index: usize },
}

pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn new() -> Self {
        Self {
            phase: DragPhase::Idle,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn dragged_node(&self) -> Option<usize> {
        match self.phase {
            DragPhase::DraggingNode { index } => Some(index),
            _ => None,
        }
    }

    /// Drag start on a node: the pin is seeded with the node's current
    /// position so physics lets go of it immediately.
    pub fn begin_node_drag(&mut self, nodes: &mut [GraphNode], index: usize) {
        let Some(node) = nodes.get_mut(index) else {
            return;
        };
        node.pin = Some(node.pos);
        node.velocity = Vec2::ZERO;
        self.phase = DragPhase::DraggingNode { index };
    }

    pub fn begin_pan(&mut self) {
        self.phase = DragPhase::Panning;
    }

    /// Drag move: the pin tracks the pointer's world position.
    pub fn drag_to(&mut self, nodes: &mut [GraphNode], world: Vec2) {
        let DragPhase::DraggingNode { index } = self.phase else {
            return;
        };
        if let Some(node) = nodes.get_mut(index) {
            node.pin = Some(world);
            node.pos = world;
            node.velocity = Vec2::ZERO;
        }
    }

    /// Drag end: the pin is cleared exactly once, no matter how many move
    /// events happened.
    pub fn end(&mut self, nodes: &mut [GraphNode]) {
        if let DragPhase::DraggingNode { index } = self.phase
            && let Some(node) = nodes.get_mut(index)
        {
            node.pin = None;
            node.velocity = Vec2::ZERO;
        }
        self.phase = DragPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;
    use eframe::egui::vec2;

    fn nodes() -> Vec<GraphNode> {
        ["a", "b"]
            .into_iter()
            .enumerate()
            .map(|(index, id)| GraphNode {
                id: id.to_string(),
                label: id.to_string(),
                kind: NodeKind::Module,
                pos: vec2(index as f32 * 50.0, 10.0),
                velocity: vec2(1.0, -1.0),
                pin: None,
                in_degree: 0,
                out_degree: 0,
            })
            .collect()
    }

    #[test]
    fn drag_pins_on_start_tracks_every_move_and_clears_on_release() {
        let mut nodes = nodes();
        let mut drag = DragController::new();

        drag.begin_node_drag(&mut nodes, 1);
        assert_eq!(nodes[1].pin, Some(vec2(50.0, 10.0)), "pin seeds at the start position");
        assert_eq!(drag.dragged_node(), Some(1));

        let path = [vec2(60.0, 12.0), vec2(75.0, 30.0), vec2(90.0, -5.0)];
        for target in path {
            drag.drag_to(&mut nodes, target);
            assert_eq!(nodes[1].pin, Some(target), "pin tracks the pointer on every move");
            assert_eq!(nodes[1].pos, target);
        }

        drag.end(&mut nodes);
        assert_eq!(nodes[1].pin, None, "pin is cleared exactly on release");
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn release_clears_the_pin_even_without_moves() {
        let mut nodes = nodes();
        let mut drag = DragController::new();

        drag.begin_node_drag(&mut nodes, 0);
        drag.end(&mut nodes);
        assert_eq!(nodes[0].pin, None);
    }

    #[test]
    fn panning_never_touches_pins() {
        let mut nodes = nodes();
        let mut drag = DragController::new();

        drag.begin_pan();
        drag.drag_to(&mut nodes, vec2(999.0, 999.0));
        drag.end(&mut nodes);

        assert!(nodes.iter().all(|node| node.pin.is_none()));
        assert_eq!(nodes[0].pos, vec2(0.0, 10.0));
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut nodes = nodes();
        let mut drag = DragController::new();

        drag.begin_node_drag(&mut nodes, 17);
        assert_eq!(drag.phase(), DragPhase::Idle);
    }
}
