//! Kd-tree construction over instance bounding boxes.
//!
//! Instances are few and large, so instead of a cost model the builder
//! picks the box face closest to the node center, on the side of the center
//! with more faces, and tries the axes from longest to shortest until one
//! separates the instances.

use std::cmp::Ordering;

use kdtrace_math::Axis;

use super::raw::{RawKdNode, RawKdTree};
use crate::aabb::{Aabb, SplitPlane};
use crate::clip::split_aabb;

/// Builds a [`RawKdTree`] over instance world boxes.
#[derive(Debug, Clone)]
pub struct InstanceTreeBuilder {
    max_depth: usize,
}

impl InstanceTreeBuilder {
    /// Builder that turns nodes at `max_depth` into leaves.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Build a tree over `boxes`; leaf element ids index into `boxes`.
    ///
    /// An empty input gives an empty bbox and a single empty leaf.
    pub fn build(&self, boxes: &[Aabb]) -> RawKdTree {
        if boxes.is_empty() {
            return RawKdTree::empty();
        }

        let mut bbox = Aabb::empty();
        for b in boxes {
            bbox.expand_by_box(b);
        }

        let all = (0..boxes.len() as u32).collect();
        let root = self.build_node(boxes, all, &bbox, 0);
        RawKdTree::new(root, bbox)
    }

    fn build_node(&self, boxes: &[Aabb], instances: Vec<u32>, voxel: &Aabb, depth: usize) -> RawKdNode {
        if instances.len() == 1 || depth >= self.max_depth {
            return RawKdNode::leaf(instances);
        }

        let center = voxel.center();
        for axis in axes_by_extent(voxel) {
            let d = axis.index();
            let position = split_position(boxes, &instances, center[d], d);
            let plane = SplitPlane::new(axis, position);

            let mut left = Vec::new();
            let mut right = Vec::new();
            for &id in &instances {
                let b = &boxes[id as usize];
                if b.minv[d] <= position && b.maxv[d] <= position {
                    left.push(id);
                } else if b.minv[d] >= position && b.maxv[d] >= position {
                    right.push(id);
                } else {
                    left.push(id);
                    right.push(id);
                }
            }

            if left.len() >= instances.len() || right.len() >= instances.len() {
                continue;
            }

            let (left_box, right_box) = split_aabb(voxel, &plane);
            let left = self.build_node(boxes, left, &left_box, depth + 1);
            let right = self.build_node(boxes, right, &right_box, depth + 1);
            return RawKdNode::internal(plane, left, right);
        }

        RawKdNode::leaf(instances)
    }
}

impl Default for InstanceTreeBuilder {
    fn default() -> Self {
        Self::new(crate::config::KdTreeConfig::default().max_depth)
    }
}

fn axes_by_extent(voxel: &Aabb) -> [Axis; 3] {
    let extent = voxel.extent();
    let mut axes = Axis::ALL;
    axes.sort_by(|a, b| {
        extent[b.index()]
            .partial_cmp(&extent[a.index()])
            .unwrap_or(Ordering::Equal)
    });
    axes
}

/// Box face closest to `center` on the side holding more faces.
fn split_position(boxes: &[Aabb], instances: &[u32], center: f32, d: usize) -> f32 {
    let mut left = FaceSide::default();
    let mut right = FaceSide::default();

    for &id in instances {
        let b = &boxes[id as usize];
        for face in [b.minv[d], b.maxv[d]] {
            let distance = face - center;
            if distance <= 0.0 {
                left.add(face, -distance);
            } else {
                right.add(face, distance);
            }
        }
    }

    if left.count > right.count {
        left.position
    } else {
        right.position
    }
}

#[derive(Debug)]
struct FaceSide {
    count: usize,
    distance: f32,
    position: f32,
}

impl Default for FaceSide {
    fn default() -> Self {
        Self {
            count: 0,
            distance: f32::MAX,
            position: 0.0,
        }
    }
}

impl FaceSide {
    fn add(&mut self, face: f32, distance: f32) {
        self.count += 1;
        if distance < self.distance {
            self.distance = distance;
            self.position = face;
        }
    }
}
