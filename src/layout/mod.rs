mod force;
mod quadtree;
mod tree;
mod worker;

use clap::ValueEnum;
use eframe::egui::Vec2;

pub use quadtree::BarnesHut;
pub use tree::NotATreeError;
pub use worker::{LayoutResult, LayoutWorker};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LayoutKind {
    #[default]
    Force,
    Tree,
    Radial,
}

impl LayoutKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Force => "Force",
            Self::Tree => "Tree",
            Self::Radial => "Radial",
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Force => "force",
            Self::Tree => "tree",
            Self::Radial => "radial",
        })
    }
}

/// World-space area the layout should fill, centered on `center`.
#[derive(Clone, Copy, Debug)]
pub struct LayoutBounds {
    pub width: f32,
    pub height: f32,
    pub center: Vec2,
}

impl LayoutBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            center: Vec2::ZERO,
        }
    }
}

impl Default for LayoutBounds {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    /// Preferred separation of two linked nodes.
    pub link_distance: f32,
    pub spring_strength: f32,
    pub charge_strength: f32,
    /// Repulsion cutoff; node pairs farther apart than this do not interact.
    pub charge_max_distance: f32,
    pub node_radius: f32,
    pub collision_padding: f32,
    pub center_strength: f32,
    pub iterations: usize,
    /// Early-exit threshold: mean squared displacement per node and step.
    pub energy_epsilon: f32,
    /// Margin kept free along the depth axis of tree layouts.
    pub tree_depth_margin: f32,
    /// Margin kept free along the breadth axis of tree layouts.
    pub tree_breadth_margin: f32,
    pub radial_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance: 60.0,
            spring_strength: 0.3,
            charge_strength: 100.0,
            charge_max_distance: 200.0,
            node_radius: 8.0,
            collision_padding: 4.0,
            center_strength: 0.005,
            iterations: 300,
            energy_epsilon: 0.02,
            tree_depth_margin: 160.0,
            tree_breadth_margin: 100.0,
            radial_margin: 100.0,
        }
    }
}

/// Topology copy handed to the solver; the solver never sees the live graph.
#[derive(Clone, Debug, Default)]
pub struct LayoutInput {
    pub ids: Vec<String>,
    pub edges: Vec<(usize, usize)>,
    pub positions: Vec<Vec2>,
    pub pins: Vec<Option<Vec2>>,
}

impl LayoutInput {
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    fn pin(&self, index: usize) -> Option<Vec2> {
        self.pins.get(index).copied().flatten()
    }
}

/// Computes one position per input node, order preserved.
pub fn compute_layout(
    kind: LayoutKind,
    input: &LayoutInput,
    bounds: LayoutBounds,
    config: &LayoutConfig,
) -> Vec<Vec2> {
    match kind {
        LayoutKind::Force => force::solve(input, bounds, config),
        LayoutKind::Tree => tree::solve_tree(input, bounds, config),
        LayoutKind::Radial => tree::solve_radial(input, bounds, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_returns_one_position_per_node() {
        let input = LayoutInput {
            ids: vec!["a".into(), "b".into(), "c".into()],
            edges: vec![(0, 1), (0, 2)],
            positions: vec![Vec2::ZERO; 3],
            pins: vec![None; 3],
        };

        for kind in [LayoutKind::Force, LayoutKind::Tree, LayoutKind::Radial] {
            let positions =
                compute_layout(kind, &input, LayoutBounds::default(), &LayoutConfig::default());
            assert_eq!(positions.len(), 3, "kind {kind:?}");
            assert!(positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let input = LayoutInput::default();
        let positions = compute_layout(
            LayoutKind::Force,
            &input,
            LayoutBounds::default(),
            &LayoutConfig::default(),
        );
        assert!(positions.is_empty());
    }
}
