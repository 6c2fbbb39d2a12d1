use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;
/// Softening term keeping near-coincident points from producing huge forces.
const SOFTENING: f32 = 620.0;

/// Barnes-Hut quadtree over a position slice. Built fresh per simulation
/// step; distant clusters of nodes are approximated by their aggregate mass.
pub struct BarnesHut {
    root: Option<Cell>,
}

struct Cell {
    center: Vec2,
    half_extent: f32,
    center_of_mass: Vec2,
    mass: f32,
    members: Vec<usize>,
    children: [Option<Box<Cell>>; 4],
}

impl BarnesHut {
    pub fn build(positions: &[Vec2]) -> Self {
        let Some((center, half_extent)) = square_around(positions) else {
            return Self { root: None };
        };

        let members = (0..positions.len()).collect::<Vec<_>>();
        Self {
            root: Some(Cell::build(center, half_extent, members, positions, 0)),
        }
    }

    /// Accumulated inverse-square repulsion acting on `positions[index]`.
    /// Pairs farther apart than `max_distance` do not interact.
    pub fn repulsion_at(
        &self,
        index: usize,
        positions: &[Vec2],
        strength: f32,
        max_distance: f32,
        theta: f32,
    ) -> Vec2 {
        let mut force = Vec2::ZERO;
        if let Some(root) = &self.root {
            root.accumulate_repulsion(index, positions, strength, max_distance, theta, &mut force);
        }
        force
    }

    /// Visits every indexed point within `radius` of `center`.
    pub fn for_each_within(
        &self,
        center: Vec2,
        radius: f32,
        positions: &[Vec2],
        visit: &mut impl FnMut(usize),
    ) {
        if let Some(root) = &self.root {
            root.visit_within(center, radius, positions, visit);
        }
    }
}

impl Cell {
    fn build(
        center: Vec2,
        half_extent: f32,
        members: Vec<usize>,
        positions: &[Vec2],
        depth: usize,
    ) -> Self {
        let mut center_of_mass = Vec2::ZERO;
        for &index in &members {
            center_of_mass += positions[index];
        }
        let mass = members.len() as f32;
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut cell = Self {
            center,
            half_extent,
            center_of_mass,
            mass,
            members,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.members.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &cell.members {
            buckets[quadrant_of(center, positions[index])].push(index);
        }

        // Degenerate clusters (all points in one quadrant) stay a leaf.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        let quarter = half_extent * 0.5;
        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child_center = center + quadrant_offset(quadrant, quarter);
            cell.children[quadrant] = Some(Box::new(Self::build(
                child_center,
                quarter,
                bucket,
                positions,
                depth + 1,
            )));
        }
        cell.members.clear();
        cell
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    fn contains(&self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    /// Squared distance from a point to the cell's box, zero inside.
    fn distance_sq_to_point(&self, point: Vec2) -> f32 {
        let dx = ((point.x - self.center.x).abs() - self.half_extent).max(0.0);
        let dy = ((point.y - self.center.y).abs() - self.half_extent).max(0.0);
        (dx * dx) + (dy * dy)
    }

    fn accumulate_repulsion(
        &self,
        index: usize,
        positions: &[Vec2],
        strength: f32,
        max_distance: f32,
        theta: f32,
        force: &mut Vec2,
    ) {
        if self.mass <= 0.0 {
            return;
        }

        let point = positions[index];
        if self.distance_sq_to_point(point) > max_distance * max_distance {
            return;
        }

        if self.is_leaf() {
            for &other in &self.members {
                if other == index {
                    continue;
                }
                *force += pair_repulsion(point, positions[other], index, other, strength, max_distance);
            }
            return;
        }

        let delta = point - self.center_of_mass;
        let distance_sq = delta.length_sq().max(0.0001);
        let distance = distance_sq.sqrt();
        let can_approximate =
            !self.contains(point) && ((self.half_extent * 2.0) / distance) < theta && self.mass > 1.0;

        if can_approximate {
            if distance <= max_distance {
                let direction = delta / distance;
                *force += direction * ((strength * self.mass) / (distance_sq + SOFTENING));
            }
            return;
        }

        for child in self.children.iter().flatten() {
            child.accumulate_repulsion(index, positions, strength, max_distance, theta, force);
        }
    }

    fn visit_within(
        &self,
        center: Vec2,
        radius: f32,
        positions: &[Vec2],
        visit: &mut impl FnMut(usize),
    ) {
        if self.distance_sq_to_point(center) > radius * radius {
            return;
        }

        if self.is_leaf() {
            for &index in &self.members {
                if (positions[index] - center).length_sq() <= radius * radius {
                    visit(index);
                }
            }
            return;
        }

        for child in self.children.iter().flatten() {
            child.visit_within(center, radius, positions, visit);
        }
    }
}

fn pair_repulsion(
    point: Vec2,
    other: Vec2,
    index: usize,
    other_index: usize,
    strength: f32,
    max_distance: f32,
) -> Vec2 {
    let delta = point - other;
    let distance_sq = delta.length_sq();
    if distance_sq > max_distance * max_distance {
        return Vec2::ZERO;
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        // Coincident points get a deterministic separation direction.
        let angle = ((index as f32) * 0.618_034 + (other_index as f32) * 0.414_214) * TAU;
        vec2(angle.cos(), angle.sin())
    };
    direction * (strength / (distance_sq + SOFTENING))
}

fn quadrant_of(center: Vec2, point: Vec2) -> usize {
    match (point.x >= center.x, point.y >= center.y) {
        (false, false) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (true, true) => 3,
    }
}

fn quadrant_offset(quadrant: usize, quarter: f32) -> Vec2 {
    match quadrant {
        0 => vec2(-quarter, -quarter),
        1 => vec2(quarter, -quarter),
        2 => vec2(-quarter, quarter),
        _ => vec2(quarter, quarter),
    }
}

fn square_around(positions: &[Vec2]) -> Option<(Vec2, f32)> {
    let mut min = vec2(f32::INFINITY, f32::INFINITY);
    let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for point in positions {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }

    if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
        return None;
    }

    let center = (min + max) * 0.5;
    let span = (max.x - min.x).max(max.y - min.y).max(1.0);
    Some((center, (span * 0.5) + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_builds_an_empty_tree() {
        let tree = BarnesHut::build(&[]);
        assert_eq!(
            tree.repulsion_at(0, &[], 100.0, 200.0, 0.7),
            Vec2::ZERO
        );
    }

    #[test]
    fn repulsion_pushes_two_points_apart() {
        let positions = vec![vec2(-10.0, 0.0), vec2(10.0, 0.0)];
        let tree = BarnesHut::build(&positions);

        let left = tree.repulsion_at(0, &positions, 100.0, 200.0, 0.7);
        let right = tree.repulsion_at(1, &positions, 100.0, 200.0, 0.7);
        assert!(left.x < 0.0, "left point pushed further left, got {left:?}");
        assert!(right.x > 0.0, "right point pushed further right, got {right:?}");
        assert!((left.x + right.x).abs() < 1e-4, "forces are symmetric");
    }

    #[test]
    fn repulsion_respects_the_distance_cutoff() {
        let positions = vec![vec2(0.0, 0.0), vec2(500.0, 0.0)];
        let tree = BarnesHut::build(&positions);
        assert_eq!(tree.repulsion_at(0, &positions, 100.0, 200.0, 0.7), Vec2::ZERO);
    }

    #[test]
    fn range_query_finds_exactly_the_near_points() {
        let positions = vec![
            vec2(0.0, 0.0),
            vec2(5.0, 0.0),
            vec2(0.0, 9.0),
            vec2(50.0, 50.0),
        ];
        let tree = BarnesHut::build(&positions);

        let mut found = Vec::new();
        tree.for_each_within(vec2(0.0, 0.0), 10.0, &positions, &mut |index| found.push(index));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }
}
