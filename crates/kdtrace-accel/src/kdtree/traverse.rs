//! Stack-based kd-tree traversal.

use super::compact::{KdNode, KdTree};
use super::MAX_STACK_SIZE;
use crate::accel::{any_in_instance, trace_instance};
use crate::geometry::Instance;
use crate::intersect::{hit_wald, TriAccel};
use crate::ray::{Hit, Ray};
use crate::stack::Stack;

/// A subtree left for later, with the ray interval inside it.
#[derive(Debug, Clone, Copy, Default)]
struct TraversalEntry {
    node: u32,
    tnear: f32,
    tfar: f32,
}

type TraversalStack = Stack<TraversalEntry, MAX_STACK_SIZE>;

impl KdTree {
    /// Descend from `node` to the first leaf along `ray`, narrowing the ray
    /// interval to that leaf and pushing skipped far children.
    fn find_leaf(&self, mut node: u32, ray: &mut Ray, stack: &mut TraversalStack) -> &[u32] {
        loop {
            match self.nodes[node as usize] {
                KdNode::Leaf { start, count } => {
                    let start = start as usize;
                    return &self.elements[start..start + count as usize];
                }
                KdNode::Internal {
                    axis, split, left, ..
                } => {
                    let a = axis.index();
                    let d = (split - ray.orig[a]) * ray.inv_dir[a];
                    let bit = ray.dir_sign_bits[a] as u32;
                    let front = left + bit;
                    let back = left + (1 - bit);

                    // Strict comparisons so that flat cells and triangles in
                    // the plane visit both sides. A NaN `d` (origin on the
                    // plane, direction parallel to it) also visits both.
                    if d < ray.tnear {
                        node = back;
                    } else if d > ray.tfar {
                        node = front;
                    } else {
                        stack.push(TraversalEntry {
                            node: back,
                            tnear: if d > ray.tnear { d } else { ray.tnear },
                            tfar: ray.tfar,
                        });
                        node = front;
                        ray.tfar = if d < ray.tfar { d } else { ray.tfar };
                    }
                }
            }
        }
    }

    /// Walk leaves front to back, calling `visit` with each leaf's elements
    /// and the ray limited to the leaf, until it returns true.
    fn walk(&self, mut ray: Ray, mut visit: impl FnMut(&[u32], &Ray) -> bool) -> bool {
        let mut stack = TraversalStack::new();
        let mut node = 0;
        loop {
            let elements = self.find_leaf(node, &mut ray, &mut stack);
            if visit(elements, &ray) {
                return true;
            }
            let Some(entry) = stack.pop() else {
                return false;
            };
            node = entry.node;
            ray.tnear = entry.tnear;
            ray.tfar = entry.tfar;
        }
    }

    /// Nearest triangle hit closer than `best` along a ray clipped to the
    /// tree bounds. Stops at the first leaf that yields a hit.
    pub(crate) fn trace_nearest_geometry(&self, triangles: &[TriAccel], ray: Ray, hit: &mut Hit, best: &mut f32) -> bool {
        let initial = *best;
        self.walk(ray, |elements, leaf_ray| {
            for &id in elements {
                hit_wald(&triangles[id as usize], leaf_ray, hit, best);
            }
            *best < initial
        })
    }

    /// Whether any triangle blocks a ray clipped to the tree bounds.
    pub(crate) fn trace_any_geometry(&self, triangles: &[TriAccel], ray: Ray) -> bool {
        let mut scratch = Hit::default();
        let mut best = f32::MAX;
        self.walk(ray, |elements, leaf_ray| {
            elements
                .iter()
                .any(|&id| hit_wald(&triangles[id as usize], leaf_ray, &mut scratch, &mut best))
        })
    }

    /// Nearest hit among `instances` along a world ray clipped to the tree
    /// bounds.
    ///
    /// Each candidate instance is traced with the ray limited to the current
    /// leaf, so the first leaf with a hit holds the nearest one even when
    /// instances span several leaves.
    pub(crate) fn trace_nearest_instance(&self, instances: &[Instance], ray: &Ray, hit: &mut Hit) {
        self.walk(*ray, |elements, leaf_ray| {
            for &id in elements {
                trace_instance(&instances[id as usize], id as usize, leaf_ray, hit);
            }
            hit.is_hit()
        });
    }

    /// Whether any instance blocks a world ray clipped to the tree bounds.
    pub(crate) fn trace_any_instance(&self, instances: &[Instance], ray: &Ray) -> bool {
        self.walk(*ray, |elements, leaf_ray| {
            elements
                .iter()
                .any(|&id| any_in_instance(&instances[id as usize], leaf_ray))
        })
    }
}
