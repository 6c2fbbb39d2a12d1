use eframe::egui::{self, RichText, Ui};

use crate::layout::LayoutKind;

use super::super::ViewModel;
use super::super::render::{NODE_RADIUS, category_color};
use crate::data::NodeKind;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("View Controls");
        ui.add_space(4.0);

        ui.label("Layout");
        let mut kind = self.layout_kind;
        ui.horizontal(|ui| {
            ui.selectable_value(&mut kind, LayoutKind::Force, LayoutKind::Force.label())
                .on_hover_text("Physics-driven placement; supports dragging nodes around.");
            ui.selectable_value(&mut kind, LayoutKind::Tree, LayoutKind::Tree.label())
                .on_hover_text("Left-to-right hierarchy from the dependency direction.");
            ui.selectable_value(&mut kind, LayoutKind::Radial, LayoutKind::Radial.label())
                .on_hover_text("The same hierarchy wrapped around the canvas center.");
        });
        if kind != self.layout_kind {
            self.set_layout_kind(kind);
        }

        ui.add_enabled_ui(self.layout_kind == LayoutKind::Force, |ui| {
            ui.checkbox(&mut self.live_simulation, "Live simulation")
                .on_hover_text("Keep the force layout reacting while nodes are dragged.");
        });

        ui.collapsing("Force tuning", |ui| {
            ui.add(
                egui::Slider::new(&mut self.config.layout.link_distance, 30.0..=150.0)
                    .text("Link distance")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Preferred separation of two linked nodes.");
            ui.add(
                egui::Slider::new(&mut self.config.layout.charge_strength, 20.0..=300.0)
                    .text("Repulsion")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How strongly nodes push away from each other.");
            ui.add(
                egui::Slider::new(&mut self.config.layout.spring_strength, 0.05..=0.8)
                    .text("Edge spring")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("How strongly edges pull toward the link distance.");
            ui.add(
                egui::Slider::new(&mut self.config.layout.collision_padding, 0.0..=16.0)
                    .text("Collision padding")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Extra clearance kept between node discs.");

            if ui.button("Recompute layout").clicked() {
                self.request_layout();
            }
        });

        ui.checkbox(&mut self.show_fps, "FPS readout")
            .on_hover_text("Show the current and sampled frame rate in the header.");

        ui.label("Search")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the graph.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();
        ui.label(RichText::new("Backend").strong());
        ui.label(format!("active: {}", self.render.mode().label()));
        if self.render.promotion_disabled() {
            ui.label("promotion disabled: batched scene could not be built");
        } else if self.governor.is_promoted() {
            ui.label("promoted to batched drawing for this session");
        } else {
            ui.label(format!(
                "promotes below {:.0} fps with more than {} nodes",
                self.config.promote_fps_floor, self.config.promote_node_floor
            ));
        }

        ui.separator();
        ui.label(RichText::new("Legend").strong());
        legend_row(ui, &NodeKind::Repository, "repository");
        legend_row(ui, &NodeKind::Module, "module");
        legend_row(ui, &NodeKind::Other(String::new()), "other");
        ui.label(format!("node radius: {NODE_RADIUS:.0} px"));
    }
}

fn legend_row(ui: &mut Ui, kind: &NodeKind, label: &str) {
    ui.colored_label(category_color(kind), format!("\u{25cf} {label}"));
}
