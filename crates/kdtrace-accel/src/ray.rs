//! Rays, hit records, and the sample record exchanged with shading code.

use kdtrace_math::{Point3, Transform, Vec3};

/// A ray segment `orig + t * dir` for `t` in `[tnear, tfar]`.
///
/// The reciprocal direction and direction signs are cached for slab tests
/// and tree traversal. Call [`Ray::update`] after changing `dir`.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub orig: Point3,
    /// Direction of the ray. Not required to be normalized.
    pub dir: Vec3,
    /// Start of the valid parameter interval.
    pub tnear: f32,
    /// End of the valid parameter interval.
    pub tfar: f32,
    /// Reciprocal of each direction component.
    pub inv_dir: Vec3,
    /// Sign of each direction component: -1, 0 or 1.
    pub dir_signs: [i32; 3],
    /// Sign bit of each direction component: 1 if negative (including -0.0), else 0.
    pub dir_sign_bits: [usize; 3],
}

impl Ray {
    /// Create a ray over `[0, f32::MAX]` with derived fields filled in.
    pub fn new(orig: Point3, dir: Vec3) -> Self {
        let mut ray = Self {
            orig,
            dir,
            tnear: 0.0,
            tfar: f32::MAX,
            inv_dir: Vec3::zeros(),
            dir_signs: [0; 3],
            dir_sign_bits: [0; 3],
        };
        ray.update();
        ray
    }

    /// Same as [`Ray::new`] with an explicit interval.
    pub fn with_interval(orig: Point3, dir: Vec3, tnear: f32, tfar: f32) -> Self {
        let mut ray = Self::new(orig, dir);
        ray.tnear = tnear;
        ray.tfar = tfar;
        ray
    }

    /// Recompute `inv_dir`, `dir_signs` and `dir_sign_bits` from `dir`.
    #[inline]
    pub fn update(&mut self) {
        for d in 0..3 {
            let c = self.dir[d];
            self.inv_dir[d] = 1.0 / c;
            self.dir_signs[d] = if c > 0.0 {
                1
            } else if c < 0.0 {
                -1
            } else {
                0
            };
            self.dir_sign_bits[d] = c.is_sign_negative() as usize;
        }
    }

    /// Evaluate the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.orig + self.dir * t
    }

    /// Map this ray into the local space of `transform`, keeping the interval.
    ///
    /// The direction is not renormalized, so distances along the local ray
    /// equal distances along the world ray.
    pub fn to_local(&self, transform: &Transform) -> Ray {
        let mut local = *self;
        local.orig = transform.inverse_apply_point(&self.orig);
        local.dir = transform.inverse_apply_vec(&self.dir);
        local.update();
        local
    }
}

/// Result of a nearest-hit query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Index of the hit triangle within its geometry.
    pub triangle_id: u32,
    /// Barycentric weights of the triangle's three vertices.
    pub barycentrics: [f32; 3],
    /// Ray parameter of the hit; `f32::MAX` when nothing was hit.
    pub distance: f32,
    /// Index of the hit instance, `None` when nothing was hit.
    pub instance: Option<usize>,
}

impl Default for Hit {
    fn default() -> Self {
        Self {
            triangle_id: 0,
            barycentrics: [0.0; 3],
            distance: f32::MAX,
            instance: None,
        }
    }
}

impl Hit {
    /// Clear back to the no-hit state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether any instance was hit.
    pub fn is_hit(&self) -> bool {
        self.instance.is_some()
    }
}

/// A ray together with the hit it produced.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// The query ray. Its interval is overwritten by scene-level queries.
    pub ray: Ray,
    /// Query result.
    pub hit: Hit,
}

impl Sample {
    /// New sample for a ray from `orig` along `dir`.
    pub fn new(orig: Point3, dir: Vec3) -> Self {
        Self {
            ray: Ray::new(orig, dir),
            hit: Hit::default(),
        }
    }

    /// World-space hit point, if any.
    pub fn hit_point(&self) -> Option<Point3> {
        self.hit.is_hit().then(|| self.ray.at(self.hit.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let p = ray.at(2.5);
        assert!((p.x - 5.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn test_update_signs() {
        let ray = Ray::new(Point3::origin(), Vec3::new(-2.0, 0.0, 4.0));
        assert_eq!(ray.dir_signs, [-1, 0, 1]);
        assert_eq!(ray.dir_sign_bits, [1, 0, 0]);
        assert_eq!(ray.inv_dir.x, -0.5);
        assert!(ray.inv_dir.y.is_infinite());
        assert_eq!(ray.inv_dir.z, 0.25);
    }

    #[test]
    fn test_negative_zero_sign_bit() {
        let ray = Ray::new(Point3::origin(), Vec3::new(-0.0, 1.0, 0.0));
        assert_eq!(ray.dir_signs[0], 0);
        assert_eq!(ray.dir_sign_bits[0], 1);
        assert_eq!(ray.inv_dir.x, f32::NEG_INFINITY);
    }

    #[test]
    fn test_to_local_preserves_distance() {
        let t = Transform::translation(0.0, 0.0, 5.0).then(&Transform::scale(2.0, 2.0, 2.0));
        let world = Ray::with_interval(Point3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 0.5, 9.0);
        let local = world.to_local(&t);
        assert_eq!(local.tnear, 0.5);
        assert_eq!(local.tfar, 9.0);

        // The world point at t maps to the local point at the same t.
        let p_world = world.at(3.0);
        let p_local = t.apply_point(&local.at(3.0));
        assert!((p_world - p_local).norm() < 1e-5);
    }

    #[test]
    fn test_hit_default_is_miss() {
        let mut hit = Hit::default();
        assert!(!hit.is_hit());
        hit.instance = Some(3);
        hit.distance = 1.0;
        hit.reset();
        assert_eq!(hit.distance, f32::MAX);
        assert!(hit.instance.is_none());
    }
}
