use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Align, Context, Layout, Vec2};
use log::warn;

use crate::data::{self, DetailStore, GraphSnapshot};
use crate::layout::{LayoutBounds, LayoutConfig, LayoutInput, LayoutKind, LayoutResult, LayoutWorker};

mod canvas;
mod cull;
mod governor;
mod interaction;
mod render;
mod selection;
mod sim;
mod ui;
mod viewport;

use governor::FrameGovernor;
use interaction::DragController;
use render::{RenderMode, RenderState};
use selection::{SelectedNode, SelectionBus};
use viewport::{ScaleRange, Viewport};

/// Rest-state temperature floor below which the live simulation idles.
const SIM_IDLE_TEMPERATURE: f32 = 0.005;
/// Temperature the interaction layer raises the simulation to while a node
/// is being dragged or the canvas was resized.
const SIM_ACTIVE_TEMPERATURE: f32 = 0.3;
const SIM_TEMPERATURE_DECAY: f32 = 0.96;

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub scale_range: ScaleRange,
    pub layout: LayoutConfig,
    pub promote_fps_floor: f32,
    pub promote_node_floor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale_range: ScaleRange::default(),
            layout: LayoutConfig::default(),
            promote_fps_floor: 30.0,
            promote_node_floor: 1000,
        }
    }
}

pub struct DepScopeApp {
    graph_path: PathBuf,
    detail_path: Option<PathBuf>,
    initial_layout: LayoutKind,
    config: EngineConfig,
    state: AppState,
    reload_rx: Option<Receiver<Result<GraphSnapshot, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<GraphSnapshot, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct SearchMatches {
    query: String,
    matches: HashSet<usize>,
}

enum DetailsSlot {
    Absent,
    Idle,
    Loading,
    Ready(DetailStore),
    Degraded,
}

struct ViewModel {
    snapshot: GraphSnapshot,
    config: EngineConfig,
    detail_path: Option<PathBuf>,
    layout_kind: LayoutKind,
    worker: LayoutWorker,
    layout_requested: bool,
    viewport: Viewport,
    render: RenderState,
    governor: FrameGovernor,
    drag: DragController,
    selection_bus: SelectionBus,
    selection_rx: Receiver<SelectedNode>,
    selected: Option<usize>,
    panel_selection: Option<SelectedNode>,
    sim_temperature: f32,
    live_simulation: bool,
    search: String,
    search_matches: Option<SearchMatches>,
    details: DetailsSlot,
    details_rx: Option<Receiver<Result<DetailStore, String>>>,
    show_fps: bool,
    fps_current: f32,
    canvas_size: Vec2,
    visible_node_count: usize,
    visible_edge_count: usize,
}

impl DepScopeApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        graph_path: PathBuf,
        detail_path: Option<PathBuf>,
        initial_layout: LayoutKind,
        config: EngineConfig,
    ) -> Self {
        let state = Self::start_load(graph_path.clone());
        Self {
            graph_path,
            detail_path,
            initial_layout,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(graph_path: PathBuf) -> Receiver<Result<GraphSnapshot, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result =
                data::load_graph_snapshot(&graph_path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(graph_path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(graph_path),
        }
    }
}

impl eframe::App for DepScopeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(snapshot) => AppState::Ready(Box::new(ViewModel::new(
                            snapshot,
                            self.config,
                            self.detail_path.clone(),
                            self.initial_layout,
                        ))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading dependency graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the dependency graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.graph_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.graph_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(snapshot)) => model.replace_snapshot(snapshot),
                        Ok(Err(error)) => transition = Some(AppState::Error(error)),
                        Err(TryRecvError::Empty) => self.reload_rx = Some(rx),
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(
        snapshot: GraphSnapshot,
        config: EngineConfig,
        detail_path: Option<PathBuf>,
        layout_kind: LayoutKind,
    ) -> Self {
        let mut selection_bus = SelectionBus::default();
        // The detail panel is the one assumed listener.
        let selection_rx = selection_bus.subscribe();

        let details = if detail_path.is_some() {
            DetailsSlot::Idle
        } else {
            DetailsSlot::Absent
        };

        Self {
            governor: FrameGovernor::new(config.promote_fps_floor, config.promote_node_floor),
            viewport: Viewport::new(config.scale_range),
            render: RenderState::new(),
            worker: LayoutWorker::spawn(),
            layout_requested: false,
            drag: DragController::new(),
            selection_bus,
            selection_rx,
            selected: None,
            panel_selection: None,
            sim_temperature: 0.0,
            live_simulation: true,
            search: String::new(),
            search_matches: None,
            details,
            details_rx: None,
            show_fps: true,
            fps_current: 0.0,
            canvas_size: Vec2::ZERO,
            visible_node_count: 0,
            visible_edge_count: 0,
            snapshot,
            config,
            detail_path,
            layout_kind,
        }
    }

    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_reloading: bool) {
        let dt = ctx.input(|input| input.stable_dt);
        if dt > f32::EPSILON {
            self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        }

        self.drain_selection_events();
        self.drain_detail_results();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("depscope");
                    ui.separator();
                    ui.label(format!("nodes: {}", self.snapshot.node_count()));
                    ui.label(format!("edges: {}", self.snapshot.edge_count()));
                    if self.snapshot.dropped_links > 0 {
                        ui.label(format!("dropped links: {}", self.snapshot.dropped_links))
                            .on_hover_text(
                                "Links whose endpoints were missing from the node set.",
                            );
                    }
                    if self.worker.is_busy() {
                        ui.spinner();
                        ui.label("computing layout...");
                    }

                    let reload_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Reload graph"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Reset view").clicked() {
                        self.viewport.reset();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("backend: {}", self.render.mode().label()));
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                        ui.label(format!(
                            "visible: {} nodes / {} edges",
                            self.visible_node_count, self.visible_edge_count
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_canvas(ui));
    }

    fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps {
            return None;
        }

        let mut text = format!("FPS {:.0}", self.fps_current);
        if let Some(sample) = self.governor.last_sample() {
            text.push_str(&format!(" | avg {sample:.1}"));
        }
        Some(text)
    }

    /// Queues a full recomputation on the worker; the UI never blocks on it.
    fn request_layout(&mut self) {
        let input = LayoutInput {
            ids: self.snapshot.nodes.iter().map(|node| node.id.clone()).collect(),
            edges: self
                .snapshot
                .edges
                .iter()
                .map(|edge| (edge.source, edge.target))
                .collect(),
            positions: self.snapshot.positions(),
            pins: self.snapshot.pins(),
        };
        let bounds = LayoutBounds::new(self.canvas_size.x.max(640.0), self.canvas_size.y.max(480.0));
        self.worker.request(self.layout_kind, input, bounds, self.config.layout);
    }

    fn set_layout_kind(&mut self, kind: LayoutKind) {
        if self.layout_kind == kind {
            return;
        }
        self.layout_kind = kind;
        self.sim_temperature = 0.0;
        // A kind switch is a structural change for the active scene.
        self.render.rebuild(&self.snapshot);
        self.request_layout();
    }

    /// Applies a completed layout; pinned nodes keep their override.
    fn apply_layout(&mut self, result: LayoutResult) {
        if result.positions.len() != self.snapshot.node_count() {
            warn!(
                "layout result size {} does not match the graph ({} nodes); ignored",
                result.positions.len(),
                self.snapshot.node_count()
            );
            return;
        }

        for (node, position) in self.snapshot.nodes.iter_mut().zip(result.positions) {
            if node.pin.is_some() {
                continue;
            }
            node.pos = position;
            node.velocity = Vec2::ZERO;
        }

        self.sim_temperature = if result.kind == LayoutKind::Force {
            // Leave a little residual heat so the live simulation can
            // absorb rounding between solver and incremental force models.
            0.05
        } else {
            0.0
        };
    }

    /// Canvas size changed: the next layout request sees the new bounds and
    /// the simulation is reheated so the center force re-settles the graph
    /// without discarding positions.
    fn handle_resize(&mut self, size: Vec2) {
        self.canvas_size = size;
        if self.layout_kind == LayoutKind::Force {
            self.sim_temperature = self.sim_temperature.max(SIM_ACTIVE_TEMPERATURE);
        }
    }

    /// Swaps in a freshly loaded snapshot. The render mode returns to
    /// vector only if no batched scene was ever built; otherwise the
    /// batched scene is rebuilt for the new graph.
    fn replace_snapshot(&mut self, snapshot: GraphSnapshot) {
        self.snapshot = snapshot;
        self.selected = None;
        self.panel_selection = None;
        self.search_matches = None;
        self.drag = DragController::new();
        self.sim_temperature = 0.0;

        self.render.after_load(&self.snapshot);
        if self.render.mode() == RenderMode::Vector {
            self.governor.reset();
        }
        if self.render.promotion_disabled() {
            self.governor.disable();
        }

        self.request_layout();
    }

    fn selected_node_info(&self, index: usize) -> Option<SelectedNode> {
        let node = self.snapshot.nodes.get(index)?;
        Some(SelectedNode {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind.clone(),
            in_degree: node.in_degree,
            out_degree: node.out_degree,
        })
    }

    fn drain_selection_events(&mut self) {
        while let Ok(selection) = self.selection_rx.try_recv() {
            self.panel_selection = Some(selection);
            self.ensure_details_loading();
        }
    }

    fn ensure_details_loading(&mut self) {
        if !matches!(self.details, DetailsSlot::Idle) {
            return;
        }
        let Some(path) = self.detail_path.clone() else {
            self.details = DetailsSlot::Absent;
            return;
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = data::load_detail_store(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });
        self.details_rx = Some(rx);
        self.details = DetailsSlot::Loading;
    }

    fn drain_detail_results(&mut self) {
        let Some(rx) = &self.details_rx else {
            return;
        };

        match rx.try_recv() {
            Ok(Ok(store)) => {
                self.details = DetailsSlot::Ready(store);
                self.details_rx = None;
            }
            Ok(Err(error)) => {
                warn!("detail source failed: {error}");
                self.details = DetailsSlot::Degraded;
                self.details_rx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("detail loader disconnected before delivering a result");
                self.details = DetailsSlot::Degraded;
                self.details_rx = None;
            }
        }
    }
}
