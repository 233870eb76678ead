#![warn(missing_docs)]

//! Math types for the kdtrace acceleration structures.
//!
//! Thin wrappers around nalgebra providing single-precision points,
//! vectors, coordinate axes, and affine transforms that carry their
//! own inverse so rays can be moved into instance space cheaply.

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f32>>;

/// A 4x4 matrix.
pub type Mat4 = Matrix4<f32>;

/// Lengths below this are treated as zero (duplicate clip vertices, etc).
pub const ZERO_TOLERANCE: f32 = 1e-6;

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// The X axis.
    X = 0,
    /// The Y axis.
    Y = 1,
    /// The Z axis.
    Z = 2,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axis for an index in `0..3`; larger values wrap around.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 3]
    }

    /// Component index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// An affine transform with its cached inverse.
///
/// The inverse is carried along through composition, so mapping a ray from
/// world space into instance space never inverts a matrix at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Mat4,
    inverse: Mat4,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Mat4::identity(),
            inverse: Mat4::identity(),
        }
    }

    /// Build a transform from an arbitrary matrix.
    ///
    /// Returns `None` if the matrix has no inverse.
    pub fn from_matrix(matrix: Mat4) -> Option<Self> {
        let inverse = matrix.try_inverse()?;
        Some(Self { matrix, inverse })
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f32, dy: f32, dz: f32) -> Self {
        let mut m = Mat4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        let mut inv = Mat4::identity();
        inv[(0, 3)] = -dx;
        inv[(1, 3)] = -dy;
        inv[(2, 3)] = -dz;
        Self {
            matrix: m,
            inverse: inv,
        }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    ///
    /// A zero factor yields a transform that is not invertible; see
    /// [`Transform::is_invertible`].
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        let mut m = Mat4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        let mut inv = Mat4::identity();
        inv[(0, 0)] = 1.0 / sx;
        inv[(1, 1)] = 1.0 / sy;
        inv[(2, 2)] = 1.0 / sz;
        Self {
            matrix: m,
            inverse: inv,
        }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self::rotation(m)
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self::rotation(m)
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self::rotation(m)
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Mat4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self::rotation(m)
    }

    // Orthonormal: the inverse is the transpose.
    fn rotation(m: Mat4) -> Self {
        Self {
            matrix: m,
            inverse: m.transpose(),
        }
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// Applying the result maps `p` to `self(other(p))`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
            inverse: other.inverse * self.inverse,
        }
    }

    /// Inverse of this transform.
    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.inverse,
            inverse: self.matrix,
        }
    }

    /// The cached inverse matrix.
    pub fn inverse_matrix(&self) -> &Mat4 {
        &self.inverse
    }

    /// Whether the cached inverse is finite, i.e. the transform can map
    /// world-space rays back into local space.
    pub fn is_invertible(&self) -> bool {
        self.inverse.iter().all(|v| v.is_finite())
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector (inverse transpose of the upper-left 3x3).
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        self.inverse.fixed_view::<3, 3>(0, 0).transpose() * n
    }

    /// Map a point through the inverse transform.
    pub fn inverse_apply_point(&self, p: &Point3) -> Point3 {
        let v = self.inverse * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Map a direction through the inverse transform.
    ///
    /// The result is not normalized, so ray parameters stay comparable
    /// between world and local space.
    pub fn inverse_apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.inverse * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
