//! The acceleration structure interface and the linear-scan baseline.
//!
//! Tracing is two-level: [`AccStruct::trace_nearest_instance`] walks the
//! scene-level structure over instances, maps the ray into each candidate
//! instance's local space and hands it to the instance geometry's own
//! structure through [`AccStruct::trace_nearest_geometry`].

use crate::aabb::Aabb;
use crate::clip::clip_ray;
use crate::config::AccelKind;
use crate::geometry::Instance;
use crate::grid::UniformGrid;
use crate::intersect::{hit_wald, TriAccel};
use crate::kdtree::KdTree;
use crate::ray::{Hit, Ray, Sample};

/// Linear scan over every element.
#[derive(Debug, Clone)]
pub struct BruteForce {
    bbox: Aabb,
}

impl BruteForce {
    /// Scan structure with bounds `bbox`.
    pub fn new(bbox: Aabb) -> Self {
        Self { bbox }
    }

    fn trace_nearest_geometry(&self, triangles: &[TriAccel], ray: &Ray, hit: &mut Hit, best: &mut f32) {
        for acc in triangles {
            hit_wald(acc, ray, hit, best);
        }
    }

    fn trace_any_geometry(&self, triangles: &[TriAccel], ray: &Ray) -> bool {
        let mut hit = Hit::default();
        let mut best = f32::MAX;
        triangles.iter().any(|acc| hit_wald(acc, ray, &mut hit, &mut best))
    }
}

/// An acceleration structure over triangles or instances.
#[derive(Debug, Clone)]
pub enum AccStruct {
    /// Linear scan.
    BruteForce(BruteForce),
    /// Uniform grid with 3D-DDA traversal.
    UniformGrid(UniformGrid),
    /// Kd-tree.
    KdTree(KdTree),
}

impl AccStruct {
    /// Bounds of everything the structure holds.
    pub fn bbox(&self) -> &Aabb {
        match self {
            AccStruct::BruteForce(b) => &b.bbox,
            AccStruct::UniformGrid(g) => g.bbox(),
            AccStruct::KdTree(t) => t.bbox(),
        }
    }

    /// Which variant this is.
    pub fn kind(&self) -> AccelKind {
        match self {
            AccStruct::BruteForce(_) => AccelKind::BruteForce,
            AccStruct::UniformGrid(_) => AccelKind::UniformGrid,
            AccStruct::KdTree(_) => AccelKind::KdTree,
        }
    }

    /// Find the nearest hit of `sample.ray` among `instances`.
    ///
    /// The ray interval is reset to `[ray_epsilon, f32::MAX]` and the hit
    /// is cleared first. Returns whether anything was hit.
    pub fn trace_nearest_instance(&self, instances: &[Instance], sample: &mut Sample, ray_epsilon: f32) -> bool {
        let ray = &mut sample.ray;
        let hit = &mut sample.hit;

        ray.tnear = ray_epsilon;
        ray.tfar = f32::MAX;
        ray.update();
        hit.reset();

        let mut clipped = *ray;
        if !clip_ray(self.bbox(), &mut clipped) {
            return false;
        }

        match self {
            AccStruct::KdTree(tree) => tree.trace_nearest_instance(instances, &clipped, hit),
            _ => {
                for (id, instance) in instances.iter().enumerate() {
                    trace_instance(instance, id, &clipped, hit);
                }
            }
        }
        hit.is_hit()
    }

    /// Find the nearest hit of a local-space `ray` among `triangles`.
    ///
    /// Only hits closer than `hit.distance` are accepted; on improvement
    /// `hit` is updated and tagged with `instance_id`.
    pub fn trace_nearest_geometry(&self, triangles: &[TriAccel], instance_id: usize, ray: &Ray, hit: &mut Hit) {
        let mut ray = *ray;
        if !clip_ray(self.bbox(), &mut ray) {
            return;
        }

        let mut best = hit.distance;
        match self {
            AccStruct::BruteForce(b) => b.trace_nearest_geometry(triangles, &ray, hit, &mut best),
            AccStruct::UniformGrid(g) => {
                g.trace_nearest(triangles, &ray, hit, &mut best);
            }
            AccStruct::KdTree(t) => {
                t.trace_nearest_geometry(triangles, ray, hit, &mut best);
            }
        }

        if best < hit.distance {
            hit.distance = best;
            hit.instance = Some(instance_id);
        }
    }

    /// Whether anything among `instances` blocks `ray` within its interval.
    pub fn trace_any_instance(&self, instances: &[Instance], ray: &Ray) -> bool {
        let mut clipped = *ray;
        if !clip_ray(self.bbox(), &mut clipped) {
            return false;
        }

        match self {
            AccStruct::KdTree(tree) => tree.trace_any_instance(instances, &clipped),
            _ => instances.iter().any(|instance| any_in_instance(instance, &clipped)),
        }
    }

    /// Whether any of `triangles` blocks a local-space `ray`.
    pub fn trace_any_geometry(&self, triangles: &[TriAccel], ray: &Ray) -> bool {
        let mut ray = *ray;
        if !clip_ray(self.bbox(), &mut ray) {
            return false;
        }

        match self {
            AccStruct::BruteForce(b) => b.trace_any_geometry(triangles, &ray),
            AccStruct::UniformGrid(g) => g.trace_any(triangles, &ray),
            AccStruct::KdTree(t) => t.trace_any_geometry(triangles, ray),
        }
    }
}

/// Trace a world-space ray against one instance.
pub(crate) fn trace_instance(instance: &Instance, id: usize, ray: &Ray, hit: &mut Hit) {
    let local = ray.to_local(instance.transform());
    let geometry = instance.geometry();
    geometry
        .accel
        .trace_nearest_geometry(&geometry.tri_accel, id, &local, hit);
}

/// Occlusion test of a world-space ray against one instance.
pub(crate) fn any_in_instance(instance: &Instance, ray: &Ray) -> bool {
    let local = ray.to_local(instance.transform());
    let geometry = instance.geometry();
    geometry.accel.trace_any_geometry(&geometry.tri_accel, &local)
}
