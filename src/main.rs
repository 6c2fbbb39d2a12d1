mod app;
mod data;
mod layout;
mod util;

use std::path::PathBuf;

use clap::Parser;

use app::{DepScopeApp, EngineConfig};
use layout::LayoutKind;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph document to visualize ({"nodes": [...], "links": [...]})
    #[arg(long)]
    graph: PathBuf,

    /// Optional per-node detail document keyed by node id
    #[arg(long)]
    details: Option<PathBuf>,

    /// Initial layout algorithm
    #[arg(long, value_enum, default_value_t = LayoutKind::Force)]
    layout: LayoutKind,

    /// Frame rate below which the batched backend takes over
    #[arg(long, default_value_t = 30.0)]
    promote_fps: f32,

    /// Node count above which promotion is considered
    #[arg(long, default_value_t = 1000)]
    promote_nodes: usize,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = EngineConfig {
        promote_fps_floor: args.promote_fps,
        promote_node_floor: args.promote_nodes,
        ..EngineConfig::default()
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "depscope",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DepScopeApp::new(
                cc,
                args.graph.clone(),
                args.details.clone(),
                args.layout,
                config,
            )))
        }),
    )
}
