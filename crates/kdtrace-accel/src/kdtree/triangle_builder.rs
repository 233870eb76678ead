//! SAH kd-tree construction over the triangles of one geometry.
//!
//! Each node clips its triangles to the node box ("perfect splits"),
//! sweeps sorted start/end/planar events along every axis and keeps the
//! plane with the lowest surface area heuristic cost. Straddling triangles
//! go to both children; triangles whose clipped box is empty are dropped.

use std::cmp::Ordering;

use kdtrace_math::{Axis, Point3};

use super::raw::{RawKdNode, RawKdTree};
use crate::aabb::{Aabb, SplitPlane};
use crate::clip::{clip_triangle, split_aabb};
use crate::config::KdTreeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Planar,
    Start,
}

#[derive(Debug, Clone, Copy)]
struct Event {
    position: f32,
    kind: EventKind,
    triangle: u32,
}

impl Event {
    fn order(a: &Event, b: &Event) -> Ordering {
        a.position
            .partial_cmp(&b.position)
            .unwrap_or(Ordering::Equal)
            .then(a.kind.cmp(&b.kind))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
    Invalid,
}

#[derive(Debug, Clone, Copy)]
struct SahResult {
    cost: f32,
    /// Where triangles lying in the split plane go.
    side: Side,
}

/// Builds a [`RawKdTree`] over triangles.
#[derive(Debug, Clone)]
pub struct TriangleTreeBuilder {
    config: KdTreeConfig,
}

impl TriangleTreeBuilder {
    /// Builder with the given cost model.
    pub fn new(config: KdTreeConfig) -> Self {
        Self { config }
    }

    /// Build a tree over `triangles` inside `bbox`.
    ///
    /// Leaf element ids are indices into `triangles`.
    pub fn build(&self, bbox: &Aabb, triangles: &[[Point3; 3]]) -> RawKdTree {
        if triangles.is_empty() || bbox.is_degenerate() {
            return RawKdTree::new(RawKdNode::leaf(Vec::new()), *bbox);
        }

        let mut state = BuildState {
            config: &self.config,
            triangles,
            events: [
                Vec::with_capacity(triangles.len() * 2),
                Vec::with_capacity(triangles.len() * 2),
                Vec::with_capacity(triangles.len() * 2),
            ],
            sides: vec![Side::Invalid; triangles.len()],
        };

        let all = (0..triangles.len() as u32).collect();
        let root = state.build_node(all, bbox, 0);
        RawKdTree::new(root, *bbox)
    }
}

impl Default for TriangleTreeBuilder {
    fn default() -> Self {
        Self::new(KdTreeConfig::default())
    }
}

/// Scratch space shared by all nodes of one build.
struct BuildState<'a> {
    config: &'a KdTreeConfig,
    triangles: &'a [[Point3; 3]],
    events: [Vec<Event>; 3],
    sides: Vec<Side>,
}

impl BuildState<'_> {
    fn build_node(&mut self, triangles: Vec<u32>, voxel: &Aabb, depth: usize) -> RawKdNode {
        if depth >= self.config.max_depth {
            return RawKdNode::leaf(triangles);
        }

        let (plane, best, valid_count) = self.find_plane(&triangles, voxel);
        if self.terminate(&best, valid_count) {
            return RawKdNode::leaf(triangles);
        }

        let (left_box, right_box) = split_aabb(voxel, &plane);
        let (left, right) = self.partition(&plane, best.side, &triangles);
        drop(triangles);

        let left = self.build_node(left, &left_box, depth + 1);
        let right = self.build_node(right, &right_box, depth + 1);
        RawKdNode::internal(plane, left, right)
    }

    fn terminate(&self, best: &SahResult, valid_count: usize) -> bool {
        best.cost >= self.config.intersection_cost * valid_count as f32
    }

    /// Cost of splitting `voxel` at `plane`, trying planar triangles on
    /// both sides. Ties go left.
    fn sah(&self, plane: &SplitPlane, voxel: &Aabb, n_l: usize, n_p: usize, n_r: usize) -> SahResult {
        let (left, right) = split_aabb(voxel, plane);

        let inv_area = 1.0 / voxel.surface_area();
        let p_l = left.surface_area() * inv_area;
        let p_r = right.surface_area() * inv_area;

        let inv_extent = 1.0 / voxel.axis_extent(plane.axis);
        let left_ratio = left.axis_extent(plane.axis) * inv_extent;
        let right_ratio = right.axis_extent(plane.axis) * inv_extent;

        let cost = |num_left: usize, num_right: usize| {
            let mut cost = self.config.traversal_cost
                + self.config.intersection_cost * (p_l * num_left as f32 + p_r * num_right as f32);
            let bonus = self.config.empty_space_bonus;
            if num_left == 0 {
                cost *= bonus + (1.0 - bonus) * right_ratio;
            } else if num_right == 0 {
                cost *= bonus + (1.0 - bonus) * left_ratio;
            }
            cost
        };

        let left_cost = cost(n_l + n_p, n_r);
        let right_cost = cost(n_l, n_p + n_r);
        if left_cost <= right_cost {
            SahResult {
                cost: left_cost,
                side: Side::Left,
            }
        } else {
            SahResult {
                cost: right_cost,
                side: Side::Right,
            }
        }
    }

    /// Clip the node's triangles, rebuild the event lists and sweep them.
    ///
    /// Returns the best plane, its cost and the number of triangles that
    /// actually overlap `voxel`.
    fn find_plane(&mut self, triangles: &[u32], voxel: &Aabb) -> (SplitPlane, SahResult, usize) {
        for events in &mut self.events {
            events.clear();
        }

        let mut valid_count = 0;
        for &id in triangles {
            let [v0, v1, v2] = &self.triangles[id as usize];
            let clipped = clip_triangle(v0, v1, v2, voxel);
            if clipped.is_degenerate() {
                self.sides[id as usize] = Side::Invalid;
                continue;
            }
            valid_count += 1;
            self.sides[id as usize] = Side::Both;

            for axis in Axis::ALL {
                let d = axis.index();
                let events = &mut self.events[d];
                if clipped.is_planar(axis) {
                    events.push(Event {
                        position: clipped.minv[d],
                        kind: EventKind::Planar,
                        triangle: id,
                    });
                } else {
                    events.push(Event {
                        position: clipped.minv[d],
                        kind: EventKind::Start,
                        triangle: id,
                    });
                    events.push(Event {
                        position: clipped.maxv[d],
                        kind: EventKind::End,
                        triangle: id,
                    });
                }
            }
        }

        for events in &mut self.events {
            events.sort_by(Event::order);
        }

        let mut best_plane = SplitPlane::new(Axis::X, f32::MAX);
        let mut best = SahResult {
            cost: f32::MAX,
            side: Side::Left,
        };

        for axis in Axis::ALL {
            let events = &self.events[axis.index()];
            let mut n_l = 0;
            let mut n_r = valid_count;

            let mut i = 0;
            while i < events.len() {
                let plane = SplitPlane::new(axis, events[i].position);
                let mut counts = [0usize; 3];
                for kind in [EventKind::End, EventKind::Planar, EventKind::Start] {
                    while i < events.len()
                        && events[i].position == plane.position
                        && events[i].kind == kind
                    {
                        counts[kind as usize] += 1;
                        i += 1;
                    }
                }
                let [n_end, n_planar, n_start] = counts;

                let n_p = n_planar;
                n_r -= n_planar + n_end;

                let result = self.sah(&plane, voxel, n_l, n_p, n_r);
                if result.cost < best.cost {
                    best = result;
                    best_plane = plane;
                }

                n_l += n_start + n_planar;
            }
        }

        (best_plane, best, valid_count)
    }

    /// Classify the node's triangles against `plane` using the events of
    /// its axis, then split the id list.
    fn partition(&mut self, plane: &SplitPlane, planar_side: Side, triangles: &[u32]) -> (Vec<u32>, Vec<u32>) {
        for event in &self.events[plane.axis.index()] {
            let side = &mut self.sides[event.triangle as usize];
            match event.kind {
                EventKind::End if event.position <= plane.position => *side = Side::Left,
                EventKind::Start if event.position >= plane.position => *side = Side::Right,
                EventKind::Planar => {
                    *side = match event.position.partial_cmp(&plane.position) {
                        Some(Ordering::Less) => Side::Left,
                        Some(Ordering::Greater) => Side::Right,
                        _ => planar_side,
                    };
                }
                _ => {}
            }
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &id in triangles {
            match self.sides[id as usize] {
                Side::Left => left.push(id),
                Side::Right => right.push(id),
                Side::Both => {
                    left.push(id);
                    right.push(id);
                }
                Side::Invalid => {}
            }
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn bbox_of(triangles: &[[Point3; 3]]) -> Aabb {
        let mut bbox = Aabb::empty();
        for t in triangles {
            bbox.expand_by_points(t);
        }
        bbox
    }

    fn leaves(node: &RawKdNode, out: &mut Vec<Vec<u32>>) {
        match node {
            RawKdNode::Leaf { elements } => out.push(elements.clone()),
            RawKdNode::Internal { left, right, .. } => {
                leaves(left, out);
                leaves(right, out);
            }
        }
    }

    fn tri(offset_x: f32) -> [Point3; 3] {
        [
            Point3::new(offset_x, 0.0, 0.0),
            Point3::new(offset_x + 1.0, 0.0, 0.0),
            Point3::new(offset_x, 1.0, 1.0),
        ]
    }

    #[test]
    fn test_empty_input() {
        let tree = TriangleTreeBuilder::default().build(&Aabb::empty(), &[]);
        assert!(tree.root.is_leaf());
        assert_eq!(tree.stats.leaf_count, 1);
        assert_eq!(tree.stats.element_count, 0);
    }

    #[test]
    fn test_separates_clusters() {
        let triangles = [tri(0.0), tri(9.0)];
        let tree = TriangleTreeBuilder::default().build(&bbox_of(&triangles), &triangles);

        match &tree.root {
            RawKdNode::Internal { plane, .. } => {
                assert_eq!(plane.axis, Axis::X);
                assert!(plane.position >= 1.0 && plane.position <= 9.0);
            }
            RawKdNode::Leaf { .. } => panic!("expected a split"),
        }

        let mut found = Vec::new();
        leaves(&tree.root, &mut found);
        assert!(found.iter().all(|l| !(l.contains(&0) && l.contains(&1))));
        assert!(found.iter().any(|l| l.contains(&0)));
        assert!(found.iter().any(|l| l.contains(&1)));
    }

    #[test]
    fn test_single_triangle_keeps_element() {
        let triangles = [tri(0.0)];
        let tree = TriangleTreeBuilder::default().build(&bbox_of(&triangles), &triangles);
        let mut found = Vec::new();
        leaves(&tree.root, &mut found);
        assert!(found.iter().any(|l| l == &vec![0]));
    }

    #[test]
    fn test_max_depth_forces_leaves() {
        let mut rng = StdRng::seed_from_u64(7);
        let triangles: Vec<[Point3; 3]> = (0..200)
            .map(|_| {
                let base = Point3::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                );
                [base, base + kdtrace_math::Vec3::new(0.3, 0.0, 0.0), base + kdtrace_math::Vec3::new(0.0, 0.3, 0.1)]
            })
            .collect();

        let config = KdTreeConfig {
            max_depth: 3,
            ..KdTreeConfig::default()
        };
        let tree = TriangleTreeBuilder::new(config).build(&bbox_of(&triangles), &triangles);
        assert!(tree.stats.depth <= 3);
        assert_eq!(tree.stats.node_count, 2 * tree.stats.leaf_count - 1);

        let unlimited = TriangleTreeBuilder::default().build(&bbox_of(&triangles), &triangles);
        assert!(unlimited.stats.depth > 3);

        // Every triangle survives in at least one leaf.
        let mut found = Vec::new();
        leaves(&unlimited.root, &mut found);
        for id in 0..triangles.len() as u32 {
            assert!(found.iter().any(|l| l.contains(&id)));
        }
    }

    #[test]
    fn test_coplanar_triangles_terminate() {
        let triangles: Vec<[Point3; 3]> = (0..32)
            .map(|i| {
                let x = (i % 8) as f32;
                let y = (i / 8) as f32;
                [
                    Point3::new(x, y, 0.0),
                    Point3::new(x + 1.0, y, 0.0),
                    Point3::new(x, y + 1.0, 0.0),
                ]
            })
            .collect();
        let mut bbox = bbox_of(&triangles);
        bbox.scale_by(0.01, crate::aabb::PLANAR_TOLERANCE);

        let tree = TriangleTreeBuilder::default().build(&bbox, &triangles);
        assert!(tree.stats.leaf_count > 1);
        assert!(tree.stats.depth <= KdTreeConfig::default().max_depth);
    }
}
