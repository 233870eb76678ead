//! Triangle geometry, primitive assembly and instances.

use std::sync::Arc;

use kdtrace_math::{Point3, Transform};

use crate::aabb::{Aabb, PLANAR_TOLERANCE};
use crate::accel::{AccStruct, BruteForce};
use crate::error::{AccelError, Result};
use crate::intersect::TriAccel;

/// Vertex indices and material handle of one triangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriDesc {
    /// Indices into [`Geometry::vertices`].
    pub v: [u32; 3],
    /// Opaque material handle owned by the shading layer.
    pub material: u32,
}

/// A triangle mesh with its intersection data and acceleration structure.
///
/// Only triangles with a valid [`TriAccel`] are stored, so `tri_desc[i]`
/// and `tri_accel[i]` describe the same triangle and
/// `tri_accel[i].triangle_id == i`.
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle descriptors.
    pub tri_desc: Vec<TriDesc>,
    /// Precomputed intersection records, parallel to `tri_desc`.
    pub tri_accel: Vec<TriAccel>,
    /// Acceleration structure over `tri_accel`.
    pub accel: AccStruct,
}

impl Geometry {
    fn with_vertices(vertices: Vec<Point3>) -> Self {
        let bbox = Aabb::from_points(&vertices);
        Self {
            vertices,
            tri_desc: Vec::new(),
            tri_accel: Vec::new(),
            accel: AccStruct::BruteForce(BruteForce::new(bbox)),
        }
    }

    /// Geometry from a vertex array and index triples sharing one material.
    ///
    /// Degenerate triangles are skipped. The attached structure is a
    /// linear scan until an [`AccelBuilder`](crate::AccelBuilder) replaces it.
    pub fn from_indexed(vertices: Vec<Point3>, triangles: &[[u32; 3]], material: u32) -> Result<Self> {
        let vertex_count = vertices.len();
        if let Some(&index) = triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(AccelError::VertexIndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let mut geometry = Self::with_vertices(vertices);
        for &v in triangles {
            geometry.push_triangle(v, material);
        }
        Ok(geometry)
    }

    /// Store triangle `v` if its intersection record is valid.
    fn push_triangle(&mut self, v: [u32; 3], material: u32) -> bool {
        let [a, b, c] = v.map(|i| self.vertices[i as usize]);
        let id = self.tri_accel.len() as u32;
        let acc = TriAccel::build_from(&a, &b, &c, id);
        if !acc.valid() {
            log::trace!("dropping degenerate triangle {v:?}");
            return false;
        }
        self.tri_accel.push(acc);
        self.tri_desc.push(TriDesc { v, material });
        true
    }

    /// Number of stored triangles.
    pub fn triangle_count(&self) -> usize {
        self.tri_desc.len()
    }

    /// Corner positions of triangle `index`.
    pub fn triangle(&self, index: usize) -> [Point3; 3] {
        self.tri_desc[index].v.map(|i| self.vertices[i as usize])
    }

    /// Corner positions of every stored triangle.
    pub fn triangles(&self) -> Vec<[Point3; 3]> {
        (0..self.triangle_count()).map(|i| self.triangle(i)).collect()
    }

    /// Bounds of the vertex array.
    pub fn vertex_bbox(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Bounds of the attached acceleration structure.
    pub fn bbox(&self) -> &Aabb {
        self.accel.bbox()
    }
}

/// How [`GeometryBuilder::end`] turns buffered vertices into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    /// Every three vertices form a triangle.
    Triangles,
    /// Each vertex after the second forms a triangle with the previous two.
    TriangleStrip,
    /// Each vertex after the second forms a triangle with the first and the
    /// previous vertex.
    TriangleFan,
    /// Convex polygon, triangulated as a fan.
    Polygon,
}

/// Incremental geometry assembly from primitive streams.
///
/// ```
/// use kdtrace_accel::{GeometryBuilder, PrimitiveMode};
/// use kdtrace_math::Point3;
///
/// let mut builder = GeometryBuilder::new();
/// builder.begin(PrimitiveMode::TriangleStrip);
/// for (x, y) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
///     builder.add_vertex(Point3::new(x, y, 0.0));
/// }
/// builder.end();
/// let geometry = builder.build();
/// assert_eq!(geometry.triangle_count(), 2);
/// ```
#[derive(Debug)]
pub struct GeometryBuilder {
    geometry: Geometry,
    transform: Transform,
    material: u32,
    open: Option<(PrimitiveMode, usize)>,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryBuilder {
    /// Empty builder with identity transform and material 0.
    pub fn new() -> Self {
        Self {
            geometry: Geometry::with_vertices(Vec::new()),
            transform: Transform::identity(),
            material: 0,
            open: None,
        }
    }

    /// Material handle for triangles assembled from now on.
    pub fn set_material(&mut self, material: u32) -> &mut Self {
        self.material = material;
        self
    }

    /// Transform applied to vertices added from now on.
    pub fn set_transform(&mut self, transform: Transform) -> &mut Self {
        self.transform = transform;
        self
    }

    /// Start a primitive, closing any open one.
    pub fn begin(&mut self, mode: PrimitiveMode) -> &mut Self {
        self.end();
        self.open = Some((mode, self.geometry.vertices.len()));
        self
    }

    /// Append a vertex to the open primitive.
    ///
    /// Vertices added outside `begin`/`end` are stored but never used.
    pub fn add_vertex(&mut self, p: Point3) -> &mut Self {
        self.geometry.vertices.push(self.transform.apply_point(&p));
        self
    }

    /// Close the open primitive and assemble its triangles.
    ///
    /// Vertices that do not complete a triangle are ignored.
    pub fn end(&mut self) -> &mut Self {
        let Some((mode, start)) = self.open.take() else {
            return self;
        };
        let count = self.geometry.vertices.len() - start;
        let s = start as u32;
        let material = self.material;

        match mode {
            PrimitiveMode::Triangles => {
                for i in (0..count / 3).map(|t| s + 3 * t as u32) {
                    self.geometry.push_triangle([i, i + 1, i + 2], material);
                }
            }
            PrimitiveMode::TriangleStrip => {
                for t in 0..count.saturating_sub(2) as u32 {
                    let i = s + t;
                    // Odd triangles flip to keep a consistent winding.
                    let v = if t % 2 == 0 {
                        [i, i + 1, i + 2]
                    } else {
                        [i + 2, i + 1, i]
                    };
                    self.geometry.push_triangle(v, material);
                }
            }
            PrimitiveMode::TriangleFan | PrimitiveMode::Polygon => {
                for t in 1..count.saturating_sub(1) as u32 {
                    self.geometry.push_triangle([s, s + t, s + t + 1], material);
                }
            }
        }
        self
    }

    /// Finish assembly. The result carries a linear-scan structure.
    pub fn build(mut self) -> Geometry {
        self.end();
        let bbox = self.geometry.vertex_bbox();
        self.geometry.accel = AccStruct::BruteForce(BruteForce::new(bbox));
        self.geometry
    }
}

/// A placement of a shared geometry in the world.
#[derive(Debug, Clone)]
pub struct Instance {
    geometry: Arc<Geometry>,
    transform: Transform,
    bbox: Aabb,
}

impl Instance {
    /// Place `geometry` with `transform`.
    ///
    /// The world box is the box of the geometry's transformed structure
    /// corners, grown by `bbox_scale` of its extent per axis.
    pub fn new(geometry: Arc<Geometry>, transform: Transform, bbox_scale: f32) -> Result<Self> {
        if !transform.is_invertible() {
            return Err(AccelError::SingularTransform);
        }
        let bbox = world_bbox(geometry.bbox(), &transform, bbox_scale);
        Ok(Self {
            geometry,
            transform,
            bbox,
        })
    }

    /// Replace the transform and recompute the world box.
    pub fn set_transform(&mut self, transform: Transform, bbox_scale: f32) -> Result<()> {
        if !transform.is_invertible() {
            return Err(AccelError::SingularTransform);
        }
        self.bbox = world_bbox(self.geometry.bbox(), &transform, bbox_scale);
        self.transform = transform;
        Ok(())
    }

    /// The instanced geometry.
    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// Local-to-world transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World-space bounds.
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }
}

fn world_bbox(local: &Aabb, transform: &Transform, scale: f32) -> Aabb {
    if local.is_degenerate() {
        return *local;
    }
    let corners = local.vertices().map(|p| transform.apply_point(&p));
    let mut bbox = Aabb::from_points(&corners);
    bbox.scale_by(scale, PLANAR_TOLERANCE);
    bbox
}
