//! Geometric predicates between boxes, rays, triangles, and split planes.

use kdtrace_math::{Axis, Point3, Vec3, ZERO_TOLERANCE};

use crate::aabb::{Aabb, SplitPlane};
use crate::ray::Ray;

// A triangle clipped by six half-spaces has at most 3 + 6 vertices.
const CLIP_BUFFER: usize = 9;

/// Clip the ray interval against the three slabs of `aabb`.
///
/// Returns `false` if the clipped interval is empty; the ray is only
/// modified when the result is `true`.
#[inline]
pub fn clip_ray(aabb: &Aabb, ray: &mut Ray) -> bool {
    let mut ray_near = ray.tnear;
    let mut ray_far = ray.tfar;

    for d in 0..3 {
        let t_near = (aabb.minv[d] - ray.orig[d]) * ray.inv_dir[d];
        let t_far = (aabb.maxv[d] - ray.orig[d]) * ray.inv_dir[d];

        ray_near = ray_near.max(t_near.min(t_far));
        ray_far = ray_far.min(t_near.max(t_far));
    }

    if ray_near > ray_far {
        return false;
    }

    ray.tnear = ray_near;
    ray.tfar = ray_far;
    true
}

/// Bounding box of the part of triangle `(v0, v1, v2)` inside `aabb`.
///
/// Sutherland-Hodgman clipping against the six box planes. The result is
/// empty (degenerate) when the triangle lies outside the box.
pub fn clip_triangle(v0: &Point3, v1: &Point3, v2: &Point3, aabb: &Aabb) -> Aabb {
    let mut polygon = [Point3::origin(); CLIP_BUFFER];
    let mut temp = [Point3::origin(); CLIP_BUFFER];
    polygon[0] = *v0;
    polygon[1] = *v1;
    polygon[2] = *v2;
    let mut count = 3;

    for axis in Axis::ALL {
        clip_polygon(&mut polygon, &mut temp, &mut count, aabb.minv[axis.index()], 1.0, axis);
    }
    for axis in Axis::ALL {
        clip_polygon(&mut polygon, &mut temp, &mut count, aabb.maxv[axis.index()], -1.0, axis);
    }

    Aabb::from_points(&polygon[..count])
}

/// Keep the part of the polygon where `dir * (p[axis] - pos) >= 0`.
fn clip_polygon(
    polygon: &mut [Point3; CLIP_BUFFER],
    temp: &mut [Point3; CLIP_BUFFER],
    count: &mut usize,
    pos: f32,
    dir: f32,
    axis: Axis,
) {
    let dim = axis.index();
    let n = *count;
    if n == 0 {
        return;
    }

    let mut all_in = true;
    let mut all_out = true;
    for p in &polygon[..n] {
        if dir * (p[dim] - pos) < 0.0 {
            all_in = false;
        } else {
            all_out = false;
        }
    }
    if all_in {
        return;
    }
    if all_out {
        *count = 0;
        return;
    }

    let mut v1 = polygon[0];
    let mut d1 = dir * (v1[dim] - pos);
    let mut inside = d1 >= 0.0;
    let mut out = 0;

    for i in 0..n {
        let v2 = polygon[(i + 1) % n];
        let d2 = dir * (v2[dim] - pos);

        if inside && d2 >= 0.0 {
            temp[out] = v2;
            out += 1;
        } else if !inside && d2 >= 0.0 {
            let mut vc = v1 + (v2 - v1) * (d1 / (d1 - d2));
            vc[dim] = pos;
            temp[out] = vc;
            temp[out + 1] = v2;
            out += 2;
            inside = true;
        } else if inside && d2 < 0.0 {
            let mut vc = v2 + (v1 - v2) * (d2 / (d2 - d1));
            vc[dim] = pos;
            temp[out] = vc;
            out += 1;
            inside = false;
        }
        v1 = v2;
        d1 = d2;
    }

    // Drop vertices that coincide with their predecessor.
    let mut kept = 0;
    for i in 0..out {
        let prev = temp[(i + out - 1) % out];
        if (temp[i] - prev).norm() > ZERO_TOLERANCE {
            polygon[kept] = temp[i];
            kept += 1;
        }
    }
    *count = kept;
}

/// Split `aabb` by `plane` into `(left, right)`.
///
/// The plane position is clamped to the box, so a plane outside the box
/// yields one flat child. Both children share the clamped position.
pub fn split_aabb(aabb: &Aabb, plane: &SplitPlane) -> (Aabb, Aabb) {
    let d = plane.axis.index();
    let p = plane.position.max(aabb.minv[d]).min(aabb.maxv[d]);
    let mut left = *aabb;
    let mut right = *aabb;
    left.maxv[d] = p;
    right.minv[d] = p;
    (left, right)
}

/// Whether `p` lies inside or on the boundary of `aabb`.
#[inline]
pub fn is_point_inside(aabb: &Aabb, p: &Point3) -> bool {
    p.x >= aabb.minv.x
        && p.y >= aabb.minv.y
        && p.z >= aabb.minv.z
        && p.x <= aabb.maxv.x
        && p.y <= aabb.maxv.y
        && p.z <= aabb.maxv.z
}

/// Exact triangle/box overlap using the separating axis theorem.
///
/// Tests the 9 edge-cross-axis directions, the three box normals, and the
/// triangle normal (Akenine-Möller, 2001).
pub fn triangle_overlaps(aabb: &Aabb, v0: &Point3, v1: &Point3, v2: &Point3) -> bool {
    let center = aabb.center();
    let half = aabb.extent() * 0.5;

    let t = [*v0 - center, *v1 - center, *v2 - center];
    let edges = [t[1] - t[0], t[2] - t[1], t[0] - t[2]];

    // Edge x box-axis directions.
    for e in &edges {
        for axis in Axis::ALL {
            let mut n = Vec3::zeros();
            n[axis.index()] = 1.0;
            let l = e.cross(&n);
            let p0 = l.dot(&t[0]);
            let p1 = l.dot(&t[1]);
            let p2 = l.dot(&t[2]);
            let min_p = p0.min(p1).min(p2);
            let max_p = p0.max(p1).max(p2);
            let rad = half.x * l.x.abs() + half.y * l.y.abs() + half.z * l.z.abs();
            if min_p > rad || max_p < -rad {
                return false;
            }
        }
    }

    // Box face normals.
    for d in 0..3 {
        let min_p = t[0][d].min(t[1][d]).min(t[2][d]);
        let max_p = t[0][d].max(t[1][d]).max(t[2][d]);
        if min_p > half[d] || max_p < -half[d] {
            return false;
        }
    }

    plane_box_overlap(&edges[0].cross(&edges[1]), &t[0], &half)
}

fn plane_box_overlap(normal: &Vec3, vertex: &Vec3, half: &Vec3) -> bool {
    let mut vmin = Vec3::zeros();
    let mut vmax = Vec3::zeros();
    for d in 0..3 {
        let v = vertex[d];
        if normal[d] > 0.0 {
            vmin[d] = -half[d] - v;
            vmax[d] = half[d] - v;
        } else {
            vmin[d] = half[d] - v;
            vmax[d] = -half[d] - v;
        }
    }
    if normal.dot(&vmin) > 0.0 {
        return false;
    }
    normal.dot(&vmax) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_clip_ray_hit() {
        let mut ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(clip_ray(&unit_box(), &mut ray));
        assert_relative_eq!(ray.tnear, 5.0, epsilon = 1e-5);
        assert_relative_eq!(ray.tfar, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_ray_miss_leaves_ray() {
        let mut ray = Ray::with_interval(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0), 0.1, 50.0);
        assert!(!clip_ray(&unit_box(), &mut ray));
        assert_eq!(ray.tnear, 0.1);
        assert_eq!(ray.tfar, 50.0);
    }

    #[test]
    fn test_clip_ray_behind() {
        let mut ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(!clip_ray(&unit_box(), &mut ray));
    }

    #[test]
    fn test_clip_ray_inside_keeps_interval() {
        // Interval entirely inside the box is not changed.
        let mut ray = Ray::with_interval(Point3::new(0.1, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0), 0.1, 0.5);
        assert!(clip_ray(&unit_box(), &mut ray));
        assert_eq!(ray.tnear, 0.1);
        assert_eq!(ray.tfar, 0.5);
    }

    #[test]
    fn test_clip_ray_parallel_to_slab() {
        // Zero x direction with the origin between the x planes.
        let mut ray = Ray::new(Point3::new(0.5, 0.5, -1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(clip_ray(&unit_box(), &mut ray));
        assert_relative_eq!(ray.tnear, 1.0, epsilon = 1e-6);
        assert_relative_eq!(ray.tfar, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_triangle_inside_is_tight() {
        let v0 = Point3::new(0.2, 0.2, 0.5);
        let v1 = Point3::new(0.8, 0.2, 0.5);
        let v2 = Point3::new(0.2, 0.8, 0.5);
        let clipped = clip_triangle(&v0, &v1, &v2, &unit_box());
        assert_eq!(clipped, Aabb::from_points(&[v0, v1, v2]));
        assert!(clipped.is_planar(Axis::Z));
    }

    #[test]
    fn test_clip_triangle_partial() {
        let v0 = Point3::new(-1.0, 0.5, 0.5);
        let v1 = Point3::new(2.0, 0.5, 0.5);
        let v2 = Point3::new(0.5, 3.0, 0.5);
        let clipped = clip_triangle(&v0, &v1, &v2, &unit_box());
        assert!(!clipped.is_degenerate());
        assert_relative_eq!(clipped.minv.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(clipped.maxv.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(clipped.minv.y, 0.5, epsilon = 1e-6);
        assert_relative_eq!(clipped.maxv.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_triangle_outside() {
        let clipped = clip_triangle(
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::new(3.0, 2.0, 2.0),
            &Point3::new(2.0, 3.0, 2.0),
            &unit_box(),
        );
        assert!(clipped.is_degenerate());
    }

    #[test]
    fn test_clip_triangle_corner_cut() {
        // Large triangle crossing a box corner produces many clip vertices.
        let b = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let clipped = clip_triangle(
            &Point3::new(-1.0, 0.5, 2.0),
            &Point3::new(2.0, -1.0, 0.5),
            &Point3::new(0.5, 2.0, -1.0),
            &b,
        );
        assert!(!clipped.is_degenerate());
        for d in 0..3 {
            assert!(clipped.minv[d] >= -1e-6);
            assert!(clipped.maxv[d] <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_split_aabb() {
        let (left, right) = split_aabb(&unit_box(), &SplitPlane::new(Axis::Y, 0.25));
        assert_eq!(left.maxv.y, 0.25);
        assert_eq!(right.minv.y, 0.25);
        assert_eq!(left.minv, unit_box().minv);
        assert_eq!(right.maxv, unit_box().maxv);

        let mut union = left;
        union.expand_by_box(&right);
        assert_eq!(union, unit_box());
    }

    #[test]
    fn test_split_aabb_clamps() {
        let (left, right) = split_aabb(&unit_box(), &SplitPlane::new(Axis::X, 3.0));
        assert_eq!(left, unit_box());
        assert_eq!(right.minv.x, 1.0);
        assert!(right.is_planar(Axis::X));

        let (left, right) = split_aabb(&unit_box(), &SplitPlane::new(Axis::X, -3.0));
        assert_eq!(right, unit_box());
        assert_eq!(left.maxv.x, unit_box().minv.x);
        assert!(left.is_planar(Axis::X));

        for position in [-3.0, -0.5, 0.0, 0.5, 1.0, 3.0] {
            for axis in Axis::ALL {
                let d = axis.index();
                let (left, right) = split_aabb(&unit_box(), &SplitPlane::new(axis, position));
                assert_eq!(left.maxv[d], right.minv[d]);
                assert!(left.minv[d] <= left.maxv[d]);
                assert!(right.minv[d] <= right.maxv[d]);

                let mut union = left;
                union.expand_by_box(&right);
                assert_eq!(union, unit_box());
            }
        }
    }

    #[test]
    fn test_point_inside() {
        assert!(is_point_inside(&unit_box(), &Point3::new(1.0, 0.0, 0.5)));
        assert!(!is_point_inside(&unit_box(), &Point3::new(1.01, 0.0, 0.5)));
    }

    #[test]
    fn test_triangle_overlaps() {
        let b = unit_box();
        // Fully inside.
        assert!(triangle_overlaps(
            &b,
            &Point3::new(0.2, 0.2, 0.2),
            &Point3::new(0.4, 0.2, 0.2),
            &Point3::new(0.2, 0.4, 0.2)
        ));
        // Large triangle cutting through the box.
        assert!(triangle_overlaps(
            &b,
            &Point3::new(-5.0, -5.0, 0.5),
            &Point3::new(5.0, -5.0, 0.5),
            &Point3::new(0.0, 5.0, 0.5)
        ));
        // Plane of the triangle misses the box.
        assert!(!triangle_overlaps(
            &b,
            &Point3::new(-5.0, -5.0, 2.0),
            &Point3::new(5.0, -5.0, 2.0),
            &Point3::new(0.0, 5.0, 2.0)
        ));
        // Entirely beyond the x = 1 face.
        assert!(!triangle_overlaps(
            &b,
            &Point3::new(1.5, -0.5, 0.5),
            &Point3::new(2.5, 0.5, 0.5),
            &Point3::new(1.5, 1.5, 0.5)
        ));
        // Bounding boxes overlap, but the triangle passes by a corner.
        assert!(!triangle_overlaps(
            &b,
            &Point3::new(0.9, 1.6, 0.5),
            &Point3::new(1.6, 0.9, 0.5),
            &Point3::new(1.6, 1.6, 0.5)
        ));
    }
}
