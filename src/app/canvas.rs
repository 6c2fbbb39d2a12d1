use eframe::egui::{self, Rect, Sense, Ui, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::layout::LayoutKind;

use super::cull::{VisibleSet, cull};
use super::interaction::DragPhase;
use super::render::{self, FrameStyle, RenderMode};
use super::sim;
use super::{SIM_ACTIVE_TEMPERATURE, SIM_IDLE_TEMPERATURE, SIM_TEMPERATURE_DECAY};
use super::{SearchMatches, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if (self.canvas_size - rect.size()).length_sq() > 1.0 {
            self.handle_resize(rect.size());
        }
        if !self.layout_requested {
            self.layout_requested = true;
            self.request_layout();
        }

        if let Some(result) = self.worker.poll() {
            self.apply_layout(result);
            ui.ctx().request_repaint();
        }

        render::draw_background(&painter, rect, self.viewport.pan(), self.viewport.zoom());
        self.handle_zoom(ui, rect, &response);

        self.step_live_simulation(ui);

        // Culling happens in world space; the rect is padded by the node
        // radius so circles straddling the boundary keep rendering.
        let margin = render::NODE_RADIUS / self.viewport.zoom();
        let world_rect = self.viewport.visible_world_rect(rect).expand(margin);
        let positions = self.snapshot.positions();
        let visible = cull(&positions, &self.snapshot.edges, world_rect);
        self.visible_node_count = visible.nodes.len();
        self.visible_edge_count = visible.edges.len();

        let frame_dt = ui.ctx().input(|input| input.stable_dt);
        if self.governor.record_frame(frame_dt, self.snapshot.node_count())
            && !self.render.promote(&self.snapshot)
        {
            self.governor.disable();
        }

        match self.render.mode() {
            RenderMode::Vector => self.vector_frame(ui, &painter, rect, &response, &visible),
            RenderMode::Gpu => self.batched_frame(&painter, rect, &response, &visible),
        }

        if response.dragged() {
            ui.ctx().request_repaint();
        }
    }

    fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.viewport.zoom_about(rect, pointer, factor);
    }

    fn step_live_simulation(&mut self, ui: &Ui) {
        if self.layout_kind != LayoutKind::Force
            || !self.live_simulation
            || self.sim_temperature <= SIM_IDLE_TEMPERATURE
        {
            return;
        }

        let dt = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let moving = sim::step(
            &mut self.snapshot.nodes,
            &self.snapshot.edges,
            Vec2::ZERO,
            &self.config.layout,
            self.sim_temperature,
            dt,
        );

        if self.drag.dragged_node().is_none() {
            self.sim_temperature *= SIM_TEMPERATURE_DECAY;
            if self.sim_temperature <= SIM_IDLE_TEMPERATURE {
                self.sim_temperature = 0.0;
            }
        }

        if moving {
            ui.ctx().request_repaint();
        }
    }

    fn vector_frame(
        &mut self,
        ui: &mut Ui,
        painter: &egui::Painter,
        rect: Rect,
        response: &egui::Response,
        visible: &VisibleSet,
    ) {
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = {
            let viewport = self.viewport;
            let Some(scene) = self.render.vector_scene_mut(&self.snapshot) else {
                return;
            };
            scene.sync_positions(&self.snapshot, &viewport, rect);
            match pointer {
                Some(position) if response.hovered() => scene.hit_test(position, visible),
                _ => None,
            }
        };

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.drag_started() {
            match hovered {
                Some(index) => {
                    self.drag.begin_node_drag(&mut self.snapshot.nodes, index);
                }
                None => self.drag.begin_pan(),
            }
        }

        if response.dragged() {
            match self.drag.phase() {
                DragPhase::DraggingNode { .. } => {
                    if let Some(position) = response.interact_pointer_pos() {
                        let world = self.viewport.screen_to_world(rect, position);
                        self.drag.drag_to(&mut self.snapshot.nodes, world);
                    }
                    self.sim_temperature = self.sim_temperature.max(SIM_ACTIVE_TEMPERATURE);
                }
                _ => self.viewport.pan_by(response.drag_delta()),
            }
        }

        if response.drag_stopped() {
            self.drag.end(&mut self.snapshot.nodes);
        }

        if response.clicked() {
            match hovered {
                Some(index) => {
                    self.selected = Some(index);
                    if let Some(info) = self.selected_node_info(index) {
                        self.selection_bus.emit(&info);
                    }
                }
                None => self.selected = None,
            }
        }

        self.refresh_search_matches();

        let viewport = self.viewport;
        let zoom = viewport.zoom();
        let style = FrameStyle {
            selected: self.selected,
            hovered,
            search_matches: self.search_matches.as_ref().map(|cache| &cache.matches),
        };
        if let Some(scene) = self.render.vector_scene_mut(&self.snapshot) {
            // Re-sync so a drag that moved a node this frame paints at the
            // pointer, not one frame behind.
            scene.sync_positions(&self.snapshot, &viewport, rect);
            scene.draw(painter, &self.snapshot, visible, zoom, &style);
        }
    }

    /// Batched mode: pan and zoom only. There is no per-element addressing,
    /// so hovering, dragging nodes, and click selection are unavailable.
    fn batched_frame(
        &mut self,
        painter: &egui::Painter,
        rect: Rect,
        response: &egui::Response,
        visible: &VisibleSet,
    ) {
        if response.dragged() {
            self.viewport.pan_by(response.drag_delta());
        }
        if response.drag_stopped() {
            // A node drag that straddled the promotion still releases its pin.
            self.drag.end(&mut self.snapshot.nodes);
        }

        let viewport = self.viewport;
        if let Some(scene) = self.render.batched_scene_mut() {
            scene.write_positions(&self.snapshot, visible, &viewport, rect);
            scene.draw(painter);
        }
    }

    fn refresh_search_matches(&mut self) {
        let query = self.search.trim();
        if query.is_empty() {
            self.search_matches = None;
            return;
        }
        if self
            .search_matches
            .as_ref()
            .is_some_and(|cache| cache.query == query)
        {
            return;
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .snapshot
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let hit = matcher.fuzzy_match(&node.label, query).is_some()
                    || matcher.fuzzy_match(&node.id, query).is_some();
                hit.then_some(index)
            })
            .collect();

        self.search_matches = Some(SearchMatches {
            query: query.to_owned(),
            matches,
        });
    }
}
