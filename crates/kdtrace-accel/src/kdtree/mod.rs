//! Kd-trees: construction, compaction and traversal.
//!
//! Builders produce a pointer-based [`RawKdTree`]; [`KdTree::from_raw`]
//! flattens it breadth-first for traversal.

mod compact;
mod instance_builder;
mod raw;
mod traverse;
mod triangle_builder;

pub use compact::{KdNode, KdTree, PackedKdNode};
pub use instance_builder::InstanceTreeBuilder;
pub use raw::{KdTreeStats, RawKdNode, RawKdTree};
pub use triangle_builder::TriangleTreeBuilder;

/// Capacity of the per-query traversal stack, and the upper bound on tree
/// depth.
pub const MAX_STACK_SIZE: usize = 128;
