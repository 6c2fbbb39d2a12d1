use std::f32::consts::TAU;
use std::sync::Arc;

use eframe::egui::epaint::{Mesh, Vertex, WHITE_UV};
use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Vec2, vec2};

use crate::data::GraphSnapshot;

use super::super::cull::VisibleSet;
use super::super::viewport::Viewport;
use super::{BackendInitError, NODE_RADIUS, category_color};

const CIRCLE_SEGMENTS: usize = 12;
const VERTS_PER_NODE: usize = CIRCLE_SEGMENTS + 1;
const VERTS_PER_EDGE: usize = 4;
/// Hard ceiling on total mesh vertices; beyond this, construction fails and
/// the engine stays on the vector backend.
const VERTEX_BUDGET: u64 = 16_777_216;

const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(64, 64, 64, 200);

/// Batched scene: every node sprite lives in one triangle mesh and every
/// edge segment in another, so a frame costs a constant number of draw
/// calls regardless of graph size. Mesh topology is fixed at construction;
/// the per-frame update is a flat write of vertex positions. There is no
/// per-element addressing and therefore no hit-testing.
pub struct BatchedScene {
    node_mesh: Mesh,
    edge_mesh: Mesh,
    unit_ring: [Vec2; CIRCLE_SEGMENTS],
}

pub(super) fn validate_capacity(
    node_count: usize,
    edge_count: usize,
) -> Result<(), BackendInitError> {
    let vertices =
        (node_count as u64 * VERTS_PER_NODE as u64) + (edge_count as u64 * VERTS_PER_EDGE as u64);
    if vertices > VERTEX_BUDGET {
        return Err(BackendInitError::VertexBudget {
            vertices,
            nodes: node_count,
            edges: edge_count,
            budget: VERTEX_BUDGET,
        });
    }
    Ok(())
}

impl BatchedScene {
    pub fn try_new(snapshot: &GraphSnapshot) -> Result<Self, BackendInitError> {
        validate_capacity(snapshot.node_count(), snapshot.edge_count())?;

        let mut unit_ring = [Vec2::ZERO; CIRCLE_SEGMENTS];
        for (segment, slot) in unit_ring.iter_mut().enumerate() {
            let angle = segment as f32 / CIRCLE_SEGMENTS as f32 * TAU;
            *slot = vec2(angle.cos(), angle.sin());
        }

        let mut node_mesh = Mesh::default();
        node_mesh
            .vertices
            .reserve(snapshot.node_count() * VERTS_PER_NODE);
        node_mesh
            .indices
            .reserve(snapshot.node_count() * CIRCLE_SEGMENTS * 3);
        for (index, node) in snapshot.nodes.iter().enumerate() {
            let color = category_color(&node.kind);
            let base = (index * VERTS_PER_NODE) as u32;
            for _ in 0..VERTS_PER_NODE {
                node_mesh.vertices.push(Vertex {
                    pos: Pos2::ZERO,
                    uv: WHITE_UV,
                    color,
                });
            }
            for segment in 0..CIRCLE_SEGMENTS as u32 {
                let next = (segment + 1) % CIRCLE_SEGMENTS as u32;
                node_mesh.indices.push(base);
                node_mesh.indices.push(base + 1 + segment);
                node_mesh.indices.push(base + 1 + next);
            }
        }

        let mut edge_mesh = Mesh::default();
        edge_mesh
            .vertices
            .reserve(snapshot.edge_count() * VERTS_PER_EDGE);
        edge_mesh.indices.reserve(snapshot.edge_count() * 6);
        for index in 0..snapshot.edge_count() {
            let base = (index * VERTS_PER_EDGE) as u32;
            for _ in 0..VERTS_PER_EDGE {
                edge_mesh.vertices.push(Vertex {
                    pos: Pos2::ZERO,
                    uv: WHITE_UV,
                    color: EDGE_COLOR,
                });
            }
            edge_mesh
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
        }

        Ok(Self {
            node_mesh,
            edge_mesh,
            unit_ring,
        })
    }

    pub fn node_capacity(&self) -> usize {
        self.node_mesh.vertices.len() / VERTS_PER_NODE
    }

    /// Flat buffer write: recomputes every vertex position from the current
    /// node positions and visibility. Hidden elements collapse to a point,
    /// which rasterizes to nothing.
    pub fn write_positions(
        &mut self,
        snapshot: &GraphSnapshot,
        visible: &VisibleSet,
        viewport: &Viewport,
        rect: Rect,
    ) {
        let radius = (NODE_RADIUS * viewport.zoom().powf(0.40)).clamp(2.5, 30.0);
        let nodes = snapshot
            .nodes
            .iter()
            .take(self.node_mesh.vertices.len() / VERTS_PER_NODE);
        for (index, node) in nodes.enumerate() {
            let center = viewport.world_to_screen(rect, node.pos);
            let base = index * VERTS_PER_NODE;
            let shown = visible.node_visible.get(index).copied().unwrap_or(false);

            self.node_mesh.vertices[base].pos = center;
            for segment in 0..CIRCLE_SEGMENTS {
                let offset = if shown {
                    self.unit_ring[segment] * radius
                } else {
                    Vec2::ZERO
                };
                self.node_mesh.vertices[base + 1 + segment].pos = center + offset;
            }
        }

        let half_width = ((0.9 * viewport.zoom().sqrt()).clamp(0.45, 2.2)) * 0.5;
        let mut visible_edges = visible.edges.iter().copied().peekable();
        let edge_slots = self.edge_mesh.vertices.len() / VERTS_PER_EDGE;
        for index in 0..edge_slots.min(snapshot.edge_count()) {
            let edge = &snapshot.edges[index];
            let base = index * VERTS_PER_EDGE;
            let start = viewport.world_to_screen(rect, snapshot.nodes[edge.source].pos);
            let shown = visible_edges.peek() == Some(&index);
            if shown {
                visible_edges.next();
            }

            if !shown {
                for slot in 0..VERTS_PER_EDGE {
                    self.edge_mesh.vertices[base + slot].pos = start;
                }
                continue;
            }

            let end = viewport.world_to_screen(rect, snapshot.nodes[edge.target].pos);
            let along = end - start;
            let length = along.length().max(0.0001);
            let normal = vec2(-along.y, along.x) / length * half_width;

            self.edge_mesh.vertices[base].pos = start + normal;
            self.edge_mesh.vertices[base + 1].pos = start - normal;
            self.edge_mesh.vertices[base + 2].pos = end + normal;
            self.edge_mesh.vertices[base + 3].pos = end - normal;
        }
    }

    /// Two draw calls per frame: all edges, then all node sprites.
    pub fn draw(&self, painter: &Painter) {
        painter.add(Shape::mesh(Arc::new(self.edge_mesh.clone())));
        painter.add(Shape::mesh(Arc::new(self.node_mesh.clone())));
    }
}
