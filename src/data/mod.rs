mod details;
mod parse;
mod snapshot;

use std::path::Path;

use anyhow::{Context, Result};

pub use details::{DetailStore, load_detail_store};
pub use snapshot::{GraphEdge, GraphNode, GraphSnapshot, NodeKind};

/// Reads and validates a graph document from disk.
///
/// The document shape matches the upstream dependency-scanner export:
/// `{ "nodes": [{"id", "label", "type"}], "links": [{"source", "target"}] }`.
pub fn load_graph_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;
    let parsed = parse::parse_graph_document(&raw)
        .with_context(|| format!("failed to parse graph file {}", path.display()))?;
    Ok(GraphSnapshot::build(parsed))
}
