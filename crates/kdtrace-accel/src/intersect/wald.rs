//! Wald's projection-based ray-triangle test.

use bytemuck::{Pod, Zeroable};
use kdtrace_math::Point3;

use super::accepts_distance;
use crate::ray::{Hit, Ray};

const MODULO: [usize; 5] = [0, 1, 2, 0, 1];

/// Precomputed per-triangle intersection coefficients.
///
/// The triangle is projected onto the plane orthogonal to the dominant
/// axis `k` of its normal. `n_*` describe the plane, `b_*` the line through
/// edge `v0 -> v2`, and `c_*` the line through edge `v0 -> v1`, both scaled
/// so they evaluate directly to barycentric weights.
///
/// The layout is 48 bytes and GPU-uploadable.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TriAccel {
    /// Dominant axis of the normal (0, 1 or 2).
    pub k: u32,
    /// Normal u component divided by the k component.
    pub n_u: f32,
    /// Normal v component divided by the k component.
    pub n_v: f32,
    /// Plane distance along the scaled normal.
    pub n_d: f32,
    /// Edge `v0 -> v2` line, u coefficient.
    pub b_nu: f32,
    /// Edge `v0 -> v2` line, v coefficient.
    pub b_nv: f32,
    /// Edge `v0 -> v2` line, constant term.
    pub b_d: f32,
    /// Padding for alignment.
    pub _pad: u32,
    /// Edge `v0 -> v1` line, u coefficient.
    pub c_nu: f32,
    /// Edge `v0 -> v1` line, v coefficient.
    pub c_nv: f32,
    /// Edge `v0 -> v1` line, constant term.
    pub c_d: f32,
    /// Index of the triangle within its geometry.
    pub triangle_id: u32,
}

const _: () = assert!(std::mem::size_of::<TriAccel>() == 48);

impl TriAccel {
    /// Precompute coefficients for triangle `(v0, v1, v2)`.
    ///
    /// Degenerate triangles produce non-finite coefficients; check
    /// [`TriAccel::valid`] before storing the result.
    pub fn build_from(v0: &Point3, v1: &Point3, v2: &Point3, triangle_id: u32) -> Self {
        let b = v2 - v0;
        let c = v1 - v0;
        let normal = c.cross(&b);

        let k = if normal.x.abs() > normal.y.abs() && normal.x.abs() > normal.z.abs() {
            0
        } else if normal.y.abs() > normal.z.abs() {
            1
        } else {
            2
        };
        let u = MODULO[k + 1];
        let v = MODULO[k + 2];

        let n_line = normal / normal[k];
        let inv_denom = 1.0 / (b[u] * c[v] - b[v] * c[u]);

        Self {
            k: k as u32,
            n_u: normal[u] / normal[k],
            n_v: normal[v] / normal[k],
            n_d: v0.coords.dot(&n_line),
            b_nu: -b[v] * inv_denom,
            b_nv: b[u] * inv_denom,
            b_d: (b[v] * v0[u] - b[u] * v0[v]) * inv_denom,
            _pad: 0,
            c_nu: c[v] * inv_denom,
            c_nv: -c[u] * inv_denom,
            c_d: (c[u] * v0[v] - c[v] * v0[u]) * inv_denom,
            triangle_id,
        }
    }

    /// Whether every coefficient is finite.
    pub fn valid(&self) -> bool {
        [
            self.n_u, self.n_v, self.n_d, self.b_nu, self.b_nv, self.b_d, self.c_nu, self.c_nv,
            self.c_d,
        ]
        .iter()
        .all(|c| c.is_finite())
    }
}

/// Intersect `ray` with one precomputed triangle.
///
/// Accepts the hit only if its distance lies in the ray interval (with
/// [`HIT_EPSILON`](super::HIT_EPSILON) slack) and is below `best`. On
/// success `best` becomes the hit distance and `hit` receives the triangle
/// id and barycentrics; `hit.distance` is left to the caller.
#[inline]
pub fn hit_wald(acc: &TriAccel, ray: &Ray, hit: &mut Hit, best: &mut f32) -> bool {
    let k = acc.k as usize;
    let ku = MODULO[k + 1];
    let kv = MODULO[k + 2];

    let nd = 1.0 / (ray.dir[k] + acc.n_u * ray.dir[ku] + acc.n_v * ray.dir[kv]);
    let f = nd * (acc.n_d - ray.orig[k] - acc.n_u * ray.orig[ku] - acc.n_v * ray.orig[kv]);

    if !accepts_distance(f, ray.tnear, ray.tfar, *best) {
        return false;
    }

    let hu = ray.orig[ku] + f * ray.dir[ku];
    let hv = ray.orig[kv] + f * ray.dir[kv];

    let lambda = hu * acc.b_nu + hv * acc.b_nv + acc.b_d;
    if !(lambda >= 0.0) {
        return false;
    }

    let mue = hu * acc.c_nu + hv * acc.c_nv + acc.c_d;
    if !(mue >= 0.0) {
        return false;
    }

    let psi = 1.0 - lambda - mue;
    if psi < 0.0 {
        return false;
    }

    *best = f;
    hit.triangle_id = acc.triangle_id;
    hit.barycentrics = [psi, lambda, mue];
    true
}
