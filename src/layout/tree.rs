use std::collections::VecDeque;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use log::warn;
use thiserror::Error;

use super::{LayoutBounds, LayoutConfig, LayoutInput};

/// Recoverable hierarchy fault: the offending node is demoted to a root.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotATreeError {
    #[error("cycle in parent chain at node {node_id}; treating it as a root")]
    ParentCycle { node_id: String },
    #[error("node {node_id} has no path to any root; treating it as a root")]
    NoRootPath { node_id: String },
}

struct Hierarchy {
    depth: Vec<usize>,
    /// Breadth slot per node: leaves get successive slots in traversal
    /// order, interior nodes sit at the mean of their children.
    breadth: Vec<f32>,
    leaf_count: usize,
    max_depth: usize,
}

/// Depth maps to the x axis and breadth to the y axis so trees read
/// left-to-right (the raw depth/breadth axes are swapped on purpose).
pub(super) fn solve_tree(
    input: &LayoutInput,
    bounds: LayoutBounds,
    config: &LayoutConfig,
) -> Vec<Vec2> {
    let hierarchy = resolve_hierarchy(input);

    let depth_extent = (bounds.width - config.tree_depth_margin).max(50.0);
    let breadth_extent = (bounds.height - config.tree_breadth_margin).max(50.0);
    let max_depth = hierarchy.max_depth.max(1) as f32;
    let leaf_count = hierarchy.leaf_count.max(1) as f32;

    (0..input.node_count())
        .map(|index| {
            let depth_t = hierarchy.depth[index] as f32 / max_depth;
            let slot_t = (hierarchy.breadth[index] + 0.5) / leaf_count;
            bounds.center
                + vec2(
                    (depth_t - 0.5) * depth_extent,
                    (slot_t - 0.5) * breadth_extent,
                )
        })
        .collect()
}

/// Same parent resolution as the tree layout, remapped to polar
/// coordinates: `x = r * cos(angle) + cx`, `y = r * sin(angle) + cy`.
pub(super) fn solve_radial(
    input: &LayoutInput,
    bounds: LayoutBounds,
    config: &LayoutConfig,
) -> Vec<Vec2> {
    let hierarchy = resolve_hierarchy(input);

    let radius_extent = ((bounds.width.min(bounds.height) / 2.0) - config.radial_margin).max(50.0);
    let max_depth = hierarchy.max_depth.max(1) as f32;
    let leaf_count = hierarchy.leaf_count.max(1) as f32;

    (0..input.node_count())
        .map(|index| {
            let radius = hierarchy.depth[index] as f32 / max_depth * radius_extent;
            let angle = (hierarchy.breadth[index] + 0.5) / leaf_count * TAU;
            bounds.center + vec2(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// First matching incoming edge wins; later edges into the same node are an
/// accepted tie-break, not an error. Parent chains that re-enter themselves
/// are cut at the point of re-entry, demoting that node to a root.
fn resolve_parents(input: &LayoutInput) -> (Vec<Option<usize>>, Vec<NotATreeError>) {
    let n = input.node_count();
    let mut faults = Vec::new();

    let mut parent: Vec<Option<usize>> = vec![None; n];
    for &(source, target) in &input.edges {
        if source >= n || target >= n || source == target {
            continue;
        }
        if parent[target].is_none() {
            parent[target] = Some(source);
        }
    }

    const UNSEEN: u8 = 0;
    const ON_CHAIN: u8 = 1;
    const RESOLVED: u8 = 2;
    let mut state = vec![UNSEEN; n];
    let mut chain = Vec::new();
    for start in 0..n {
        if state[start] != UNSEEN {
            continue;
        }

        chain.clear();
        let mut cursor = start;
        loop {
            if state[cursor] == ON_CHAIN {
                parent[cursor] = None;
                faults.push(NotATreeError::ParentCycle {
                    node_id: input.ids[cursor].clone(),
                });
                break;
            }
            if state[cursor] == RESOLVED {
                break;
            }

            state[cursor] = ON_CHAIN;
            chain.push(cursor);
            match parent[cursor] {
                Some(next) => cursor = next,
                None => break,
            }
        }

        for &node in &chain {
            state[node] = RESOLVED;
        }
    }

    (parent, faults)
}

fn resolve_hierarchy(input: &LayoutInput) -> Hierarchy {
    let n = input.node_count();
    let (parent, mut faults) = resolve_parents(input);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for index in 0..n {
        match parent[index] {
            Some(p) => children[p].push(index),
            None => roots.push(index),
        }
    }

    let mut depth = vec![0usize; n];
    let mut placed = vec![false; n];
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    for &root in &roots {
        placed[root] = true;
    }
    let mut bfs_order = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        bfs_order.push(node);
        for &child in &children[node] {
            if !placed[child] {
                placed[child] = true;
                depth[child] = depth[node] + 1;
                queue.push_back(child);
            }
        }
    }

    for index in 0..n {
        if !placed[index] {
            faults.push(NotATreeError::NoRootPath {
                node_id: input.ids[index].clone(),
            });
            placed[index] = true;
            roots.push(index);
            bfs_order.push(index);
        }
    }

    for fault in &faults {
        warn!("{fault}");
    }

    // Leaves get successive slots in depth-first order so sibling subtrees
    // occupy disjoint breadth bands.
    let mut breadth = vec![0.0f32; n];
    let mut next_leaf = 0usize;
    let mut stack = Vec::new();
    for &root in &roots {
        stack.push(root);
        while let Some(node) = stack.pop() {
            if children[node].is_empty() {
                breadth[node] = next_leaf as f32;
                next_leaf += 1;
            }
            for &child in children[node].iter().rev() {
                stack.push(child);
            }
        }
    }

    for &node in bfs_order.iter().rev() {
        if !children[node].is_empty() {
            let sum: f32 = children[node].iter().map(|&child| breadth[child]).sum();
            breadth[node] = sum / children[node].len() as f32;
        }
    }

    let max_depth = depth.iter().copied().max().unwrap_or(0);

    Hierarchy {
        depth,
        breadth,
        leaf_count: next_leaf,
        max_depth,
    }
}
