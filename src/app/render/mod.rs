mod batched;
mod vector;

use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};
use log::warn;
use thiserror::Error;

use crate::data::{GraphSnapshot, NodeKind};

pub use batched::BatchedScene;
pub use vector::{FrameStyle, VectorScene};

/// Fixed node radius in world units; both backends consume the same value.
pub const NODE_RADIUS: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Vector,
    Gpu,
}

impl RenderMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Gpu => "batched",
        }
    }
}

/// Category palette; unmapped categories fall back to a neutral gray.
pub fn category_color(kind: &NodeKind) -> Color32 {
    match kind {
        NodeKind::Repository => Color32::from_rgb(0x34, 0x98, 0xdb),
        NodeKind::Module => Color32::from_rgb(0x2e, 0xcc, 0x71),
        NodeKind::Other(_) => Color32::from_rgb(0x95, 0xa5, 0xa6),
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendInitError {
    #[error(
        "batched scene needs {vertices} vertices for {nodes} nodes / {edges} edges, budget is {budget}"
    )]
    VertexBudget {
        vertices: u64,
        nodes: usize,
        edges: usize,
        budget: u64,
    },
}

/// Owns the active backend. The mode only ever moves Vector -> Gpu at
/// runtime; a data load returns to Vector only when no batched scene was
/// ever built.
pub struct RenderState {
    mode: RenderMode,
    vector: Option<VectorScene>,
    batched: Option<BatchedScene>,
    promotion_disabled: bool,
}

impl RenderState {
    pub fn new() -> Self {
        Self {
            mode: RenderMode::Vector,
            vector: None,
            batched: None,
            promotion_disabled: false,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn promotion_disabled(&self) -> bool {
        self.promotion_disabled
    }

    /// Rebuilds the active scene's structural objects. Called on a fresh
    /// snapshot or a layout-kind switch, never per frame.
    pub fn rebuild(&mut self, snapshot: &GraphSnapshot) {
        match self.mode {
            RenderMode::Vector => {
                self.vector = Some(VectorScene::build(snapshot));
            }
            RenderMode::Gpu => match BatchedScene::try_new(snapshot) {
                Ok(scene) => self.batched = Some(scene),
                Err(error) => {
                    warn!("batched scene rebuild failed: {error}; falling back to vector painting");
                    self.mode = RenderMode::Vector;
                    self.promotion_disabled = true;
                    self.batched = None;
                    self.vector = Some(VectorScene::build(snapshot));
                }
            },
        }
    }

    /// One-way promotion to the batched backend. Idempotent: promoting an
    /// already promoted state is a no-op. On construction failure the
    /// vector backend is kept and promotion is disabled for the session.
    pub fn promote(&mut self, snapshot: &GraphSnapshot) -> bool {
        if self.mode == RenderMode::Gpu || self.promotion_disabled {
            return false;
        }

        match BatchedScene::try_new(snapshot) {
            Ok(scene) => {
                self.vector = None;
                self.batched = Some(scene);
                self.mode = RenderMode::Gpu;
                true
            }
            Err(error) => {
                warn!("backend promotion failed: {error}; staying on the vector backend");
                self.promotion_disabled = true;
                false
            }
        }
    }

    /// Applies the snapshot-replacement rules: a session that built batched
    /// scene objects rebuilds them for the new graph, everything else
    /// returns to the vector backend.
    pub fn after_load(&mut self, snapshot: &GraphSnapshot) {
        if self.batched.is_some() {
            self.rebuild(snapshot);
        } else {
            self.mode = RenderMode::Vector;
            self.vector = Some(VectorScene::build(snapshot));
        }
    }

    pub fn vector_scene_mut(&mut self, snapshot: &GraphSnapshot) -> Option<&mut VectorScene> {
        if self.mode != RenderMode::Vector {
            return None;
        }
        if self
            .vector
            .as_ref()
            .is_none_or(|scene| scene.node_count() != snapshot.node_count())
        {
            self.vector = Some(VectorScene::build(snapshot));
        }
        self.vector.as_mut()
    }

    pub fn batched_scene_mut(&mut self) -> Option<&mut BatchedScene> {
        self.batched.as_mut()
    }
}

pub fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(21, 24, 31));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let grid_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(58, 68, 82, 64));

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            grid_stroke,
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            grid_stroke,
        );
        y += step;
    }
}

#[cfg(test)]
pub(super) mod test_support {
    use std::collections::HashMap;

    use eframe::egui::{Vec2, vec2};

    use crate::data::{GraphEdge, GraphNode, GraphSnapshot, NodeKind};

    pub fn snapshot(node_count: usize, edges: &[(usize, usize)]) -> GraphSnapshot {
        let nodes: Vec<GraphNode> = (0..node_count)
            .map(|index| GraphNode {
                id: format!("n{index}"),
                label: format!("node {index}"),
                kind: if index % 2 == 0 {
                    NodeKind::Repository
                } else {
                    NodeKind::Module
                },
                pos: vec2(index as f32 * 40.0, 0.0),
                velocity: Vec2::ZERO,
                pin: None,
                in_degree: 0,
                out_degree: 0,
            })
            .collect();

        let index_by_id: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        GraphSnapshot {
            edges: edges
                .iter()
                .map(|&(source, target)| GraphEdge { source, target })
                .collect(),
            outgoing: vec![Vec::new(); node_count],
            incoming: vec![Vec::new(); node_count],
            dropped_links: 0,
            nodes,
            index_by_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::snapshot;
    use super::*;

    #[test]
    fn promote_is_one_way_and_idempotent() {
        let snapshot = snapshot(4, &[(0, 1), (1, 2)]);
        let mut state = RenderState::new();
        assert_eq!(state.mode(), RenderMode::Vector);
        assert!(state.vector_scene_mut(&snapshot).is_some());

        assert!(state.promote(&snapshot), "the first call promotes");
        assert_eq!(state.mode(), RenderMode::Gpu);
        assert!(state.batched_scene_mut().is_some());
        assert!(
            state.vector_scene_mut(&snapshot).is_none(),
            "the vector scene is torn down on promotion"
        );

        assert!(!state.promote(&snapshot), "a second call is a no-op");
        assert_eq!(state.mode(), RenderMode::Gpu);
    }

    #[test]
    fn a_load_before_promotion_stays_on_the_vector_backend() {
        let mut state = RenderState::new();
        state.vector_scene_mut(&snapshot(3, &[]));

        state.after_load(&snapshot(5, &[(0, 4)]));
        assert_eq!(state.mode(), RenderMode::Vector);
        assert!(state.batched_scene_mut().is_none());
    }

    #[test]
    fn a_load_after_promotion_rebuilds_the_batched_scene() {
        let mut state = RenderState::new();
        assert!(state.promote(&snapshot(4, &[(0, 1)])));

        let larger = snapshot(9, &[(0, 1), (2, 3), (4, 5)]);
        state.after_load(&larger);
        assert_eq!(state.mode(), RenderMode::Gpu, "no demotion without a vector-era load");
        let scene = state.batched_scene_mut().expect("scene rebuilt");
        assert_eq!(scene.node_capacity(), 9);
    }

    #[test]
    fn unmapped_categories_fall_back_to_neutral() {
        assert_eq!(
            category_color(&NodeKind::Other("workspace".into())),
            category_color(&NodeKind::Other(String::new()))
        );
        assert_ne!(
            category_color(&NodeKind::Repository),
            category_color(&NodeKind::Module)
        );
    }
}
