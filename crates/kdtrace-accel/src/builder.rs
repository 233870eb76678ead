//! Construction of acceleration structures for geometries and instance sets.

use crate::aabb::Aabb;
use crate::accel::{AccStruct, BruteForce};
use crate::config::{AccelConfig, AccelKind, GridConfig, KdTreeConfig};
use crate::geometry::{Geometry, Instance};
use crate::grid::UniformGrid;
use crate::kdtree::{InstanceTreeBuilder, KdTree, TriangleTreeBuilder};

/// Builds one kind of [`AccStruct`].
#[derive(Debug, Clone)]
pub enum AccelBuilder {
    /// Linear scan at both levels.
    BruteForce,
    /// Uniform grid per geometry. Instance sets fall back to a linear scan.
    UniformGrid(GridConfig),
    /// SAH kd-tree per geometry, heuristic kd-tree over instances.
    KdTree(KdTreeConfig),
}

impl AccelBuilder {
    /// Builder selected by `config.accel`.
    pub fn from_config(config: &AccelConfig) -> Self {
        match config.accel {
            AccelKind::BruteForce => AccelBuilder::BruteForce,
            AccelKind::UniformGrid => AccelBuilder::UniformGrid(config.grid.clone()),
            AccelKind::KdTree => AccelBuilder::KdTree(config.kdtree.clone()),
        }
    }

    /// Kind of structure this builder produces for geometries.
    pub fn kind(&self) -> AccelKind {
        match self {
            AccelBuilder::BruteForce => AccelKind::BruteForce,
            AccelBuilder::UniformGrid(_) => AccelKind::UniformGrid,
            AccelBuilder::KdTree(_) => AccelKind::KdTree,
        }
    }

    /// Build and attach the structure over `geometry`'s triangles.
    pub fn build_geometry(&self, geometry: &mut Geometry) {
        let bbox = geometry.vertex_bbox();
        geometry.accel = match self {
            AccelBuilder::BruteForce => AccStruct::BruteForce(BruteForce::new(bbox)),
            AccelBuilder::UniformGrid(config) => {
                AccStruct::UniformGrid(UniformGrid::build(&bbox, &geometry.triangles(), config))
            }
            AccelBuilder::KdTree(config) => {
                let raw = TriangleTreeBuilder::new(config.clone()).build(&bbox, &geometry.triangles());
                log::debug!(
                    "kd-tree over {} triangles: {:?}",
                    geometry.triangle_count(),
                    raw.stats
                );
                AccStruct::KdTree(KdTree::from_raw(&raw))
            }
        };
    }

    /// Build a scene-level structure over `instances`.
    pub fn build_instances(&self, instances: &[Instance]) -> AccStruct {
        match self {
            AccelBuilder::KdTree(config) => {
                let boxes: Vec<Aabb> = instances.iter().map(|i| *i.bbox()).collect();
                let raw = InstanceTreeBuilder::new(config.max_depth).build(&boxes);
                log::debug!("kd-tree over {} instances: {:?}", instances.len(), raw.stats);
                AccStruct::KdTree(KdTree::from_raw(&raw))
            }
            AccelBuilder::BruteForce | AccelBuilder::UniformGrid(_) => {
                let mut bbox = Aabb::empty();
                for instance in instances {
                    bbox.expand_by_box(instance.bbox());
                }
                AccStruct::BruteForce(BruteForce::new(bbox))
            }
        }
    }
}

impl Default for AccelBuilder {
    fn default() -> Self {
        Self::from_config(&AccelConfig::default())
    }
}
