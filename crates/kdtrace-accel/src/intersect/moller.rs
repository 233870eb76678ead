//! Möller-Trumbore ray-triangle test.

use kdtrace_math::Point3;

use super::{accepts_distance, HIT_EPSILON};
use crate::ray::{Hit, Ray};

/// Intersect `ray` with triangle `(v0, v1, v2)` directly from its vertices.
///
/// Same acceptance rules and outputs as [`hit_wald`](super::hit_wald).
/// Rays within `HIT_EPSILON` of parallel to the triangle plane miss.
pub fn hit_moller_trumbore(
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    triangle_id: u32,
    ray: &Ray,
    hit: &mut Hit,
    best: &mut f32,
) -> bool {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.dir.cross(&edge2);
    let det = edge1.dot(&pvec);
    if det > -HIT_EPSILON && det < HIT_EPSILON {
        return false;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.orig - v0;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let qvec = tvec.cross(&edge1);
    let v = ray.dir.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let f = edge2.dot(&qvec) * inv_det;
    if !accepts_distance(f, ray.tnear, ray.tfar, *best) {
        return false;
    }

    *best = f;
    hit.triangle_id = triangle_id;
    hit.barycentrics = [1.0 - (u + v), u, v];
    true
}
