//! Flat runtime layout of a kd-tree.

use std::collections::VecDeque;

use bytemuck::{Pod, Zeroable};
use kdtrace_math::Axis;

use super::raw::{KdTreeStats, RawKdNode, RawKdTree};
use crate::aabb::Aabb;
use crate::error::{AccelError, Result};

/// A node of the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdNode {
    /// Elements `elements[start..start + count]`.
    Leaf {
        /// First element slot.
        start: u32,
        /// Number of elements.
        count: u32,
    },
    /// Split node; `right == left + 1`.
    Internal {
        /// Split axis.
        axis: Axis,
        /// Split position.
        split: f32,
        /// Index of the child below the plane.
        left: u32,
        /// Index of the child above the plane.
        right: u32,
    },
}

const LEAF_FLAG: u32 = 0x8000_0000;
const AXIS_MASK: u32 = 0x3;
const MAX_PACKED_CHILD: u32 = 1 << 29;

/// 8-byte node encoding for GPU upload.
///
/// Bit 31 of `word` marks a leaf. Leaves keep the element count in the
/// low 31 bits and the first element slot in `payload`. Internal nodes keep
/// the axis in bits 0..2, the left child index in bits 2..31, and the split
/// position's bit pattern in `payload`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedKdNode {
    /// Flag, axis, and count or child index.
    pub word: u32,
    /// Element start or split bits.
    pub payload: u32,
}

const _: () = assert!(std::mem::size_of::<PackedKdNode>() == 8);

impl PackedKdNode {
    /// Encode one node.
    ///
    /// Fails when a leaf count needs more than 31 bits or a child index
    /// more than 29.
    pub fn pack(node: &KdNode) -> Result<Self> {
        match *node {
            KdNode::Leaf { start, count } => {
                if count & LEAF_FLAG != 0 {
                    return Err(AccelError::PackOverflow {
                        field: "leaf count",
                        value: count,
                    });
                }
                Ok(Self {
                    word: LEAF_FLAG | count,
                    payload: start,
                })
            }
            KdNode::Internal {
                axis, split, left, ..
            } => {
                if left >= MAX_PACKED_CHILD {
                    return Err(AccelError::PackOverflow {
                        field: "child index",
                        value: left,
                    });
                }
                Ok(Self {
                    word: (left << 2) | axis.index() as u32,
                    payload: split.to_bits(),
                })
            }
        }
    }

    /// Decode back into a [`KdNode`].
    pub fn unpack(&self) -> KdNode {
        if self.is_leaf() {
            KdNode::Leaf {
                start: self.payload,
                count: self.word & !LEAF_FLAG,
            }
        } else {
            let left = (self.word & !LEAF_FLAG) >> 2;
            KdNode::Internal {
                axis: Axis::from_index((self.word & AXIS_MASK) as usize),
                split: f32::from_bits(self.payload),
                left,
                right: left + 1,
            }
        }
    }

    /// Whether the leaf flag is set.
    pub fn is_leaf(&self) -> bool {
        self.word & LEAF_FLAG != 0
    }
}

/// Kd-tree in breadth-first array layout, ready for traversal.
#[derive(Debug, Clone)]
pub struct KdTree {
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) elements: Vec<u32>,
    pub(crate) bbox: Aabb,
    stats: KdTreeStats,
}

impl KdTree {
    /// Flatten `raw` breadth-first.
    ///
    /// Siblings are stored next to each other and leaf element ids are
    /// appended to one shared array in node order.
    pub fn from_raw(raw: &RawKdTree) -> Self {
        let mut nodes = Vec::with_capacity(raw.stats.node_count);
        let mut elements = Vec::with_capacity(raw.stats.element_count);
        let mut queue = VecDeque::new();
        queue.push_back(&raw.root);

        let mut next_child = 1u32;
        while let Some(node) = queue.pop_front() {
            match node {
                RawKdNode::Leaf { elements: ids } => {
                    nodes.push(KdNode::Leaf {
                        start: elements.len() as u32,
                        count: ids.len() as u32,
                    });
                    elements.extend_from_slice(ids);
                }
                RawKdNode::Internal { plane, left, right } => {
                    nodes.push(KdNode::Internal {
                        axis: plane.axis,
                        split: plane.position,
                        left: next_child,
                        right: next_child + 1,
                    });
                    next_child += 2;
                    queue.push_back(left);
                    queue.push_back(right);
                }
            }
        }

        Self {
            nodes,
            elements,
            bbox: raw.bbox,
            stats: raw.stats,
        }
    }

    /// Nodes in breadth-first order; the root is at index 0.
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Concatenated leaf element ids.
    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    /// Bounds of the tree.
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// Build statistics.
    pub fn stats(&self) -> &KdTreeStats {
        &self.stats
    }

    /// Encode every node as a [`PackedKdNode`].
    pub fn pack(&self) -> Result<Vec<PackedKdNode>> {
        self.nodes.iter().map(PackedKdNode::pack).collect()
    }
}
