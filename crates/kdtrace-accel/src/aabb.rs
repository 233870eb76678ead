//! Axis-aligned bounding boxes and kd-tree split planes.

use kdtrace_math::{Axis, Point3, Vec3};

/// Tolerance added to planar box dimensions by [`Aabb::scale_by`] callers
/// that need a volume greater than zero.
pub const PLANAR_TOLERANCE: f32 = 0.01;

/// Axis-aligned bounding box in 3D.
///
/// A freshly created box is *empty*: `minv = +MAX` and `maxv = -MAX`, so
/// the first inserted point becomes both corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub minv: Point3,
    /// Maximum corner.
    pub maxv: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(minv: Point3, maxv: Point3) -> Self {
        Self { minv, maxv }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            minv: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            maxv: Point3::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }

    /// Tight box around `points`; empty if there are none.
    pub fn from_points(points: &[Point3]) -> Self {
        let mut aabb = Self::empty();
        aabb.build_from(points);
        aabb
    }

    /// Reset this box to the tight bounds of `points`.
    pub fn build_from(&mut self, points: &[Point3]) {
        match points.split_first() {
            None => *self = Self::empty(),
            Some((first, rest)) => {
                self.minv = *first;
                self.maxv = *first;
                self.expand_by_points(rest);
            }
        }
    }

    /// Expand this AABB to include a point.
    ///
    /// Both bounds are checked independently so the box stays valid even
    /// when starting from the empty sentinel.
    pub fn expand_by_point(&mut self, p: &Point3) {
        for d in 0..3 {
            if p[d] < self.minv[d] {
                self.minv[d] = p[d];
            }
            if p[d] > self.maxv[d] {
                self.maxv[d] = p[d];
            }
        }
    }

    /// Expand this AABB to include every point in `points`.
    pub fn expand_by_points(&mut self, points: &[Point3]) {
        for p in points {
            self.expand_by_point(p);
        }
    }

    /// Expand this AABB to enclose `other`.
    pub fn expand_by_box(&mut self, other: &Aabb) {
        for d in 0..3 {
            if other.minv[d] < self.minv[d] {
                self.minv[d] = other.minv[d];
            }
            if other.maxv[d] > self.maxv[d] {
                self.maxv[d] = other.maxv[d];
            }
        }
    }

    /// Grow each axis by `scale` times its extent on both sides.
    ///
    /// Planar axes grow by `tolerance` instead. Degenerate boxes are left
    /// untouched.
    pub fn scale_by(&mut self, scale: f32, tolerance: f32) {
        if self.is_degenerate() {
            return;
        }
        for axis in Axis::ALL {
            let d = axis.index();
            let s = if self.is_planar(axis) {
                tolerance
            } else {
                (self.maxv[d] - self.minv[d]).abs() * scale
            };
            self.minv[d] -= s;
            self.maxv[d] += s;
        }
    }

    /// Whether the box has zero extent along `axis`.
    #[inline]
    pub fn is_planar(&self, axis: Axis) -> bool {
        self.minv[axis.index()] == self.maxv[axis.index()]
    }

    /// Whether `minv > maxv` on any axis (the box encloses nothing).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.minv.x > self.maxv.x || self.minv.y > self.maxv.y || self.minv.z > self.maxv.z
    }

    /// Surface area `2(ab + bc + ca)`.
    pub fn surface_area(&self) -> f32 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Size of the box along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.maxv - self.minv
    }

    /// Size of the box along one axis.
    #[inline]
    pub fn axis_extent(&self, axis: Axis) -> f32 {
        self.maxv[axis.index()] - self.minv[axis.index()]
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        Point3::from((self.minv.coords + self.maxv.coords) * 0.5)
    }

    /// The eight corners.
    ///
    /// ```text
    ///     7+------+6
    ///     /|     /|      y
    ///    / |    / |      |
    ///   / 3+---/--+2     |
    /// 4+------+5 /       *---x
    ///  | /    | /       /
    ///  |/     |/       z
    /// 0+------+1
    /// ```
    pub fn vertices(&self) -> [Point3; 8] {
        let (lo, hi) = (self.minv, self.maxv);
        [
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, lo.z),
            lo,
            Point3::new(lo.x, hi.y, hi.z),
            hi,
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
        ]
    }

    /// Test if two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.minv.x <= other.maxv.x
            && self.maxv.x >= other.minv.x
            && self.minv.y <= other.maxv.y
            && self.maxv.y >= other.minv.y
            && self.minv.z <= other.maxv.z
            && self.maxv.z >= other.minv.z
    }
}

/// An axis-aligned splitting plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPlane {
    /// Axis the plane is perpendicular to.
    pub axis: Axis,
    /// Plane coordinate along `axis`.
    pub position: f32,
}

impl SplitPlane {
    /// Create a split plane.
    pub fn new(axis: Axis, position: f32) -> Self {
        Self { axis, position }
    }
}
