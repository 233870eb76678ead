//! Build-time kd-tree representation.

use serde::{Deserialize, Serialize};

use crate::aabb::{Aabb, SplitPlane};

/// A node of the pointer-based tree produced by the builders.
#[derive(Debug, Clone, PartialEq)]
pub enum RawKdNode {
    /// Terminal node holding element ids.
    Leaf {
        /// Triangle or instance ids, depending on the builder.
        elements: Vec<u32>,
    },
    /// Split node.
    Internal {
        /// Plane separating the two children.
        plane: SplitPlane,
        /// Child below the plane.
        left: Box<RawKdNode>,
        /// Child above the plane.
        right: Box<RawKdNode>,
    },
}

impl RawKdNode {
    /// Leaf holding `elements`.
    pub fn leaf(elements: Vec<u32>) -> Self {
        RawKdNode::Leaf { elements }
    }

    /// Internal node splitting at `plane`.
    pub fn internal(plane: SplitPlane, left: RawKdNode, right: RawKdNode) -> Self {
        RawKdNode::Internal {
            plane,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, RawKdNode::Leaf { .. })
    }
}

/// Build statistics of a kd-tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdTreeStats {
    /// Total number of nodes, leaves included.
    pub node_count: usize,
    /// Number of leaves.
    pub leaf_count: usize,
    /// Depth of the deepest leaf (the root is at depth 0).
    pub depth: usize,
    /// Sum of leaf sizes; duplicated elements count once per leaf.
    pub element_count: usize,
}

impl KdTreeStats {
    fn collect(node: &RawKdNode, depth: usize, stats: &mut KdTreeStats) {
        stats.node_count += 1;
        match node {
            RawKdNode::Leaf { elements } => {
                stats.leaf_count += 1;
                stats.element_count += elements.len();
                stats.depth = stats.depth.max(depth);
            }
            RawKdNode::Internal { left, right, .. } => {
                Self::collect(left, depth + 1, stats);
                Self::collect(right, depth + 1, stats);
            }
        }
    }
}

/// Root node, bounds and statistics of a freshly built tree.
#[derive(Debug, Clone)]
pub struct RawKdTree {
    /// Root node.
    pub root: RawKdNode,
    /// Bounds of everything the tree holds.
    pub bbox: Aabb,
    /// Build statistics.
    pub stats: KdTreeStats,
}

impl RawKdTree {
    /// Wrap a root node, computing its statistics.
    pub fn new(root: RawKdNode, bbox: Aabb) -> Self {
        let mut stats = KdTreeStats::default();
        KdTreeStats::collect(&root, 0, &mut stats);
        Self { root, bbox, stats }
    }

    /// A tree with an empty bbox and one empty leaf.
    pub fn empty() -> Self {
        Self::new(RawKdNode::leaf(Vec::new()), Aabb::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdtrace_math::Axis;

    #[test]
    fn test_stats() {
        let root = RawKdNode::internal(
            SplitPlane::new(Axis::X, 0.0),
            RawKdNode::leaf(vec![0, 1]),
            RawKdNode::internal(
                SplitPlane::new(Axis::Y, 1.0),
                RawKdNode::leaf(vec![1]),
                RawKdNode::leaf(vec![]),
            ),
        );
        let tree = RawKdTree::new(root, Aabb::empty());
        assert_eq!(
            tree.stats,
            KdTreeStats {
                node_count: 5,
                leaf_count: 3,
                depth: 2,
                element_count: 3,
            }
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = RawKdTree::empty();
        assert!(tree.root.is_leaf());
        assert!(tree.bbox.is_degenerate());
        assert_eq!(tree.stats.node_count, 1);
        assert_eq!(tree.stats.element_count, 0);
    }
}
