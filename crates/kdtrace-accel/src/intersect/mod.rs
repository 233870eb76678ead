//! Ray-triangle intersection.
//!
//! The hot path uses Wald's precomputed [`TriAccel`] records; the
//! Möller-Trumbore test works straight from vertex positions and serves as
//! an independent reference.

mod moller;
mod wald;

pub use moller::hit_moller_trumbore;
pub use wald::{hit_wald, TriAccel};

/// Slack applied to the `[tnear, tfar]` acceptance window of every test.
pub const HIT_EPSILON: f32 = 1e-4;

/// Whether `f` is inside the ray interval (with slack) and closer than `best`.
///
/// NaN distances (rays lying in the triangle plane) are rejected.
#[inline]
pub(crate) fn accepts_distance(f: f32, tnear: f32, tfar: f32, best: f32) -> bool {
    f < best && f >= tnear - HIT_EPSILON && f <= tfar + HIT_EPSILON
}
