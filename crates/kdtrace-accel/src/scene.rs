//! Scene: geometries, their instances, and the scene-level structure.

use std::sync::Arc;

use kdtrace_math::Transform;
use rayon::prelude::*;
use serde::Serialize;

use crate::accel::AccStruct;
use crate::builder::AccelBuilder;
use crate::config::{AccelConfig, AccelKind};
use crate::error::{AccelError, Result};
use crate::geometry::{Geometry, Instance};
use crate::grid::GridStats;
use crate::kdtree::KdTreeStats;
use crate::ray::{Ray, Sample};

/// Owns geometries and instances and rebuilds the scene-level structure
/// when instances change.
///
/// Queries go through the [`SceneView`] returned by [`Scene::commit`], so
/// the scene cannot change while a view is alive.
#[derive(Debug)]
pub struct Scene {
    config: AccelConfig,
    builder: AccelBuilder,
    geometries: Vec<Arc<Geometry>>,
    instances: Vec<Instance>,
    accel: AccStruct,
    dirty: bool,
}

impl Scene {
    /// Empty scene using `config`.
    pub fn new(config: AccelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_validated(config))
    }

    fn with_validated(config: AccelConfig) -> Self {
        let builder = AccelBuilder::from_config(&config);
        let accel = builder.build_instances(&[]);
        Self {
            config,
            builder,
            geometries: Vec::new(),
            instances: Vec::new(),
            accel,
            dirty: false,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AccelConfig {
        &self.config
    }

    /// Build the structure over `geometry` and store it. Returns its id.
    pub fn add_geometry(&mut self, mut geometry: Geometry) -> usize {
        self.builder.build_geometry(&mut geometry);
        self.geometries.push(Arc::new(geometry));
        self.geometries.len() - 1
    }

    /// Geometry by id.
    pub fn geometry(&self, id: usize) -> Result<&Arc<Geometry>> {
        self.geometries.get(id).ok_or(AccelError::UnknownGeometry(id))
    }

    /// All geometries in id order.
    pub fn geometries(&self) -> &[Arc<Geometry>] {
        &self.geometries
    }

    /// Place geometry `geometry_id` with `transform`. Returns the instance id.
    pub fn instantiate(&mut self, geometry_id: usize, transform: Transform) -> Result<usize> {
        let geometry = self.geometry(geometry_id)?.clone();
        let instance = Instance::new(geometry, transform, self.config.instance_bbox_scale)?;
        self.instances.push(instance);
        self.dirty = true;
        Ok(self.instances.len() - 1)
    }

    /// Move instance `instance_id`.
    pub fn set_transform(&mut self, instance_id: usize, transform: Transform) -> Result<()> {
        let scale = self.config.instance_bbox_scale;
        let instance = self
            .instances
            .get_mut(instance_id)
            .ok_or(AccelError::UnknownInstance(instance_id))?;
        instance.set_transform(transform, scale)?;
        self.dirty = true;
        Ok(())
    }

    /// All instances in id order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Whether instances changed since the last [`Scene::commit`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild the scene-level structure if needed and return a query view.
    pub fn commit(&mut self) -> SceneView<'_> {
        if self.dirty {
            self.accel = self.builder.build_instances(&self.instances);
            self.dirty = false;
            log::info!(
                "rebuilt {:?} scene structure over {} instances",
                self.accel.kind(),
                self.instances.len()
            );
        }
        SceneView {
            instances: &self.instances,
            accel: &self.accel,
            ray_epsilon: self.config.ray_epsilon,
        }
    }

    /// Summary of the current structures.
    pub fn report(&self) -> BuildReport {
        BuildReport {
            accel: self.builder.kind(),
            instances: self.instances.len(),
            top_level: kdtree_stats(&self.accel),
            geometries: self
                .geometries
                .iter()
                .map(|g| GeometryReport {
                    triangles: g.triangle_count(),
                    kdtree: kdtree_stats(&g.accel),
                    grid: match &g.accel {
                        AccStruct::UniformGrid(grid) => Some(grid.stats()),
                        _ => None,
                    },
                })
                .collect(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_validated(AccelConfig::default())
    }
}

fn kdtree_stats(accel: &AccStruct) -> Option<KdTreeStats> {
    match accel {
        AccStruct::KdTree(tree) => Some(*tree.stats()),
        _ => None,
    }
}

/// Read-only query access to a committed scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    instances: &'a [Instance],
    accel: &'a AccStruct,
    ray_epsilon: f32,
}

impl SceneView<'_> {
    /// Nearest hit of `sample.ray`; see [`AccStruct::trace_nearest_instance`].
    pub fn trace_nearest(&self, sample: &mut Sample) -> bool {
        self.accel
            .trace_nearest_instance(self.instances, sample, self.ray_epsilon)
    }

    /// Whether anything blocks `ray` within its interval.
    pub fn trace_any(&self, ray: &Ray) -> bool {
        self.accel.trace_any_instance(self.instances, ray)
    }

    /// Trace `samples` in parallel. Returns the number of hits.
    pub fn trace_nearest_batch(&self, samples: &mut [Sample]) -> usize {
        samples
            .par_iter_mut()
            .map(|sample| self.trace_nearest(sample))
            .filter(|&hit| hit)
            .count()
    }

    /// Occlusion results for `rays`, in parallel.
    pub fn trace_any_batch(&self, rays: &[Ray]) -> Vec<bool> {
        rays.par_iter().map(|ray| self.trace_any(ray)).collect()
    }

    /// The scene-level structure.
    pub fn accel(&self) -> &AccStruct {
        self.accel
    }

    /// The instances queries refer to by index.
    pub fn instances(&self) -> &[Instance] {
        self.instances
    }
}

/// Per-geometry part of a [`BuildReport`].
#[derive(Debug, Clone, Serialize)]
pub struct GeometryReport {
    /// Stored (valid) triangles.
    pub triangles: usize,
    /// Kd-tree statistics, if the geometry has one.
    pub kdtree: Option<KdTreeStats>,
    /// Grid statistics, if the geometry has one.
    pub grid: Option<GridStats>,
}

/// What a scene built.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Configured structure kind.
    pub accel: AccelKind,
    /// Number of instances.
    pub instances: usize,
    /// Scene-level kd-tree statistics, if any.
    pub top_level: Option<KdTreeStats>,
    /// One entry per geometry.
    pub geometries: Vec<GeometryReport>,
}
