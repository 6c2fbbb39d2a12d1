use std::collections::HashSet;

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, vec2};

use crate::data::GraphSnapshot;
use crate::util::truncate_label;

use super::super::cull::VisibleSet;
use super::super::viewport::Viewport;
use super::{NODE_RADIUS, category_color};

const LABEL_MAX_CHARS: usize = 28;
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const HOVERED_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const SEARCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);

/// Retained per-node visual state. The arena is rebuilt only on structural
/// changes (fresh snapshot, layout-kind switch); per-frame work writes
/// position deltas into `screen_positions` and repaints.
pub struct NodeHandle {
    color: Color32,
    label: String,
}

pub struct VectorScene {
    handles: Vec<NodeHandle>,
    screen_positions: Vec<Pos2>,
    screen_radius: f32,
}

/// Per-frame styling inputs resolved by the interaction layer.
#[derive(Default)]
pub struct FrameStyle<'a> {
    pub selected: Option<usize>,
    pub hovered: Option<usize>,
    pub search_matches: Option<&'a HashSet<usize>>,
}

impl VectorScene {
    pub fn build(snapshot: &GraphSnapshot) -> Self {
        let handles = snapshot
            .nodes
            .iter()
            .map(|node| NodeHandle {
                color: category_color(&node.kind),
                label: truncate_label(&node.label, LABEL_MAX_CHARS),
            })
            .collect::<Vec<_>>();

        Self {
            screen_positions: vec![Pos2::ZERO; handles.len()],
            screen_radius: NODE_RADIUS,
            handles,
        }
    }

    pub fn node_count(&self) -> usize {
        self.handles.len()
    }

    /// Flat position update; no handle is created or destroyed here.
    pub fn sync_positions(&mut self, snapshot: &GraphSnapshot, viewport: &Viewport, rect: Rect) {
        self.screen_positions.resize(snapshot.node_count(), Pos2::ZERO);
        for (slot, node) in self.screen_positions.iter_mut().zip(&snapshot.nodes) {
            *slot = viewport.world_to_screen(rect, node.pos);
        }
        self.screen_radius = (NODE_RADIUS * viewport.zoom().powf(0.40)).clamp(2.5, 30.0);
    }

    /// Direct hit-test against the individually addressable handles;
    /// closest hit wins.
    pub fn hit_test(&self, pointer: Pos2, visible: &VisibleSet) -> Option<usize> {
        visible
            .nodes
            .iter()
            .filter_map(|&index| {
                let distance = self.screen_positions.get(index)?.distance(pointer);
                (distance <= self.screen_radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub fn draw(
        &self,
        painter: &Painter,
        snapshot: &GraphSnapshot,
        visible: &VisibleSet,
        zoom: f32,
        style: &FrameStyle<'_>,
    ) {
        let zoom_sqrt = zoom.sqrt();
        let edge_stroke_width = (0.9 * zoom_sqrt).clamp(0.45, 2.2);
        let search_active = style
            .search_matches
            .is_some_and(|matches| !matches.is_empty());

        for &edge_index in &visible.edges {
            let edge = &snapshot.edges[edge_index];
            let start = self.screen_positions[edge.source];
            let end = self.screen_positions[edge.target];

            let touches_selection = style.selected == Some(edge.source)
                || style.selected == Some(edge.target);
            let (width, color) = if touches_selection {
                ((1.9 * zoom_sqrt).clamp(1.0, 3.6), Color32::from_rgb(241, 146, 94))
            } else {
                (edge_stroke_width, Color32::from_gray(72))
            };
            painter.line_segment([start, end], Stroke::new(width, color));
        }

        let outline = Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190));
        for &index in &visible.nodes {
            let handle = &self.handles[index];
            let position = self.screen_positions[index];

            let is_selected = style.selected == Some(index);
            let is_hovered = style.hovered == Some(index);
            let is_match = style
                .search_matches
                .is_some_and(|matches| matches.contains(&index));

            let color = if is_selected {
                SELECTED_COLOR
            } else if is_hovered {
                HOVERED_COLOR
            } else if is_match {
                blend_color(handle.color, SEARCH_COLOR, 0.68)
            } else if search_active {
                dim_color(handle.color, 0.38)
            } else {
                handle.color
            };

            painter.circle_filled(position, self.screen_radius, color);
            painter.circle_stroke(
                position,
                self.screen_radius,
                if is_selected {
                    Stroke::new(2.2, outline.color)
                } else {
                    outline
                },
            );

            let should_label = is_selected
                || is_hovered
                || (is_match && zoom > 0.35)
                || zoom > 1.35;
            if should_label {
                painter.text(
                    position + vec2(self.screen_radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    &handle.label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }
    }
}

fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::snapshot;
    use super::*;
    use crate::app::cull::cull;
    use crate::app::viewport::{ScaleRange, Viewport};
    use eframe::egui::{Rect, pos2};

    fn scene_on_canvas() -> (VectorScene, GraphSnapshot, Rect, VisibleSet) {
        let snapshot = snapshot(3, &[(0, 1), (1, 2)]);
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0));
        let viewport = Viewport::new(ScaleRange::default());

        let mut scene = VectorScene::build(&snapshot);
        scene.sync_positions(&snapshot, &viewport, rect);

        let positions = snapshot.positions();
        let visible = cull(&positions, &snapshot.edges, viewport.visible_world_rect(rect));
        (scene, snapshot, rect, visible)
    }

    #[test]
    fn the_arena_holds_one_handle_per_node() {
        let (scene, snapshot, _, _) = scene_on_canvas();
        assert_eq!(scene.node_count(), snapshot.node_count());
    }

    #[test]
    fn hit_test_resolves_the_node_under_the_pointer() {
        let (scene, _, rect, visible) = scene_on_canvas();

        // Node 0 sits at world origin, which maps to the canvas center.
        let over_node = rect.center();
        assert_eq!(scene.hit_test(over_node, &visible), Some(0));

        let near_miss = over_node + vec2(NODE_RADIUS * 3.0, 0.0);
        assert_eq!(scene.hit_test(near_miss, &visible), None);
    }

    #[test]
    fn hidden_nodes_are_not_hit_testable() {
        let (scene, _, rect, _) = scene_on_canvas();
        let nothing_visible = VisibleSet::default();
        assert_eq!(scene.hit_test(rect.center(), &nothing_visible), None);
    }
}
