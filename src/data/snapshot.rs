use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use log::warn;

use crate::util::stable_pair;

use super::parse::RawGraph;

/// World-space spread used for pre-layout seed positions.
const SEED_RADIUS: f32 = 320.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Repository,
    Module,
    Other(String),
}

impl NodeKind {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("repository") => Self::Repository,
            Some("module") => Self::Module,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Repository => "repository",
            Self::Module => "module",
            Self::Other(name) if !name.is_empty() => name,
            Self::Other(_) => "unknown",
        }
    }
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    /// Mutable world position, written by the layout solver, the live
    /// simulation, or a drag (never more than one of them per node at a time).
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Fixed-position override; while set, physics never moves the node.
    pub pin: Option<Vec2>,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Edge endpoints are resolved to node indices once, at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
}

#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub index_by_id: HashMap<String, usize>,
    pub outgoing: Vec<Vec<usize>>,
    pub incoming: Vec<Vec<usize>>,
    /// Links discarded at load time because an endpoint id did not resolve.
    pub dropped_links: usize,
}

impl GraphSnapshot {
    pub(super) fn build(raw: RawGraph) -> Self {
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        let mut index_by_id = HashMap::with_capacity(raw.nodes.len());

        for raw_node in raw.nodes {
            if index_by_id.contains_key(&raw_node.id) {
                warn!("duplicate node id {:?} in graph document, keeping first", raw_node.id);
                continue;
            }

            let (jx, jy) = stable_pair(&raw_node.id);
            let label = raw_node
                .label
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| raw_node.id.clone());

            index_by_id.insert(raw_node.id.clone(), nodes.len());
            nodes.push(GraphNode {
                id: raw_node.id,
                label,
                kind: NodeKind::from_raw(raw_node.kind.as_deref()),
                pos: vec2(jx, jy) * SEED_RADIUS,
                velocity: Vec2::ZERO,
                pin: None,
                in_degree: 0,
                out_degree: 0,
            });
        }

        let mut edges = Vec::with_capacity(raw.links.len());
        let mut dropped_links = 0usize;
        for link in raw.links {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&link.source), index_by_id.get(&link.target))
            else {
                dropped_links += 1;
                continue;
            };

            if source == target {
                dropped_links += 1;
                continue;
            }

            edges.push(GraphEdge { source, target });
        }
        edges.sort_unstable_by_key(|edge| (edge.source, edge.target));
        edges.dedup();

        if dropped_links > 0 {
            warn!("dropped {dropped_links} links with unresolved or self-referential endpoints");
        }

        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            outgoing[edge.source].push(edge.target);
            incoming[edge.target].push(edge.source);
            nodes[edge.source].out_degree += 1;
            nodes[edge.target].in_degree += 1;
        }

        Self {
            nodes,
            edges,
            index_by_id,
            outgoing,
            incoming,
            dropped_links,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.nodes.iter().map(|node| node.pos).collect()
    }

    pub fn pins(&self) -> Vec<Option<Vec2>> {
        self.nodes.iter().map(|node| node.pin).collect()
    }
}
