//! Uniform grid over the triangles of one geometry.
//!
//! Construction picks a resolution proportional to the cube root of the
//! triangle density and bins every triangle into the cells its bounding box
//! covers. Queries walk the cells along the ray with a 3D-DDA (Amanatides
//! and Woo) and stop at the first cell that produces a hit.

use kdtrace_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::aabb::{Aabb, PLANAR_TOLERANCE};
use crate::clip::triangle_overlaps;
use crate::config::{GridConfig, GridOverlap};
use crate::intersect::{hit_wald, TriAccel};
use crate::ray::{Hit, Ray};

/// Build statistics of a uniform grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Cells along each axis.
    pub resolution: [usize; 3],
    /// Total number of cells.
    pub cell_count: usize,
    /// Cells without triangles.
    pub empty_cells: usize,
    /// Fewest triangles in any cell.
    pub min_occupancy: usize,
    /// Most triangles in any cell.
    pub max_occupancy: usize,
    /// Mean triangles per cell.
    pub average_occupancy: f32,
    /// Total triangle references over all cells.
    pub references: usize,
}

/// A regular 3D grid of triangle id lists.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    bbox: Aabb,
    resolution: [usize; 3],
    cell_size: Vec3,
    inv_cell_size: Vec3,
    /// Flat cell array, x varies fastest.
    cells: Vec<Vec<u32>>,
}

impl UniformGrid {
    /// Build a grid over `triangles`, bounded by `bbox` grown by
    /// `config.bbox_scale`.
    ///
    /// Cell element ids are indices into `triangles`.
    pub fn build(bbox: &Aabb, triangles: &[[Point3; 3]], config: &GridConfig) -> Self {
        let mut bbox = *bbox;
        bbox.scale_by(config.bbox_scale, PLANAR_TOLERANCE);

        let resolution = if triangles.is_empty() || bbox.is_degenerate() {
            [1; 3]
        } else {
            let diagonal = bbox.extent();
            let volume = diagonal.x * diagonal.y * diagonal.z;
            let factor = (config.occupancy * triangles.len() as f32 / volume).cbrt();
            // NaN casts to 0 and infinity saturates, both caught by the clamp.
            [0, 1, 2].map(|d| ((diagonal[d] * factor).ceil() as usize).clamp(1, config.max_resolution))
        };

        let extent = bbox.extent();
        let cell_size = Vec3::new(
            extent.x / resolution[0] as f32,
            extent.y / resolution[1] as f32,
            extent.z / resolution[2] as f32,
        );
        let mut grid = Self {
            bbox,
            resolution,
            cell_size,
            inv_cell_size: cell_size.map(|c| 1.0 / c),
            cells: vec![Vec::new(); resolution[0] * resolution[1] * resolution[2]],
        };

        for (id, tri) in triangles.iter().enumerate() {
            grid.insert(id as u32, tri, config.overlap);
        }

        let stats = grid.stats();
        log::debug!(
            "uniform grid {:?}: {} cells, {} empty, occupancy min {} max {} avg {:.4}",
            stats.resolution,
            stats.cell_count,
            stats.empty_cells,
            stats.min_occupancy,
            stats.max_occupancy,
            stats.average_occupancy
        );
        grid
    }

    fn insert(&mut self, id: u32, tri: &[Point3; 3], overlap: GridOverlap) {
        let tri_box = Aabb::from_points(tri);
        let lo = [0, 1, 2].map(|d| self.world_to_voxel(tri_box.minv[d], d));
        let hi = [0, 1, 2].map(|d| self.world_to_voxel(tri_box.maxv[d], d));

        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    if overlap == GridOverlap::Exact
                        && !triangle_overlaps(&self.cell_box(x, y, z), &tri[0], &tri[1], &tri[2])
                    {
                        continue;
                    }
                    let index = self.cell_index(x, y, z);
                    self.cells[index].push(id);
                }
            }
        }
    }

    /// Grid bounds.
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// Cells along each axis.
    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    /// Size of one cell.
    pub fn cell_size(&self) -> &Vec3 {
        &self.cell_size
    }

    /// Triangle ids of cell `(x, y, z)`.
    pub fn cell(&self, x: usize, y: usize, z: usize) -> &[u32] {
        &self.cells[self.cell_index(x, y, z)]
    }

    #[inline]
    fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.resolution[0] * (y + self.resolution[1] * z)
    }

    /// Cell coordinate of `value` along axis `d`, clamped to the grid.
    #[inline]
    pub fn world_to_voxel(&self, value: f32, d: usize) -> usize {
        let v = ((value - self.bbox.minv[d]) * self.inv_cell_size[d]) as isize;
        v.clamp(0, self.resolution[d] as isize - 1) as usize
    }

    /// World coordinate of the lower boundary of cell `voxel` along axis `d`.
    #[inline]
    pub fn voxel_to_world(&self, voxel: usize, d: usize) -> f32 {
        self.bbox.minv[d] + voxel as f32 * self.cell_size[d]
    }

    fn cell_box(&self, x: usize, y: usize, z: usize) -> Aabb {
        let minv = Point3::new(
            self.voxel_to_world(x, 0),
            self.voxel_to_world(y, 1),
            self.voxel_to_world(z, 2),
        );
        Aabb::new(minv, minv + self.cell_size)
    }

    /// Occupancy statistics.
    pub fn stats(&self) -> GridStats {
        let references: usize = self.cells.iter().map(Vec::len).sum();
        GridStats {
            resolution: self.resolution,
            cell_count: self.cells.len(),
            empty_cells: self.cells.iter().filter(|c| c.is_empty()).count(),
            min_occupancy: self.cells.iter().map(Vec::len).min().unwrap_or(0),
            max_occupancy: self.cells.iter().map(Vec::len).max().unwrap_or(0),
            average_occupancy: references as f32 / self.cells.len() as f32,
            references,
        }
    }

    /// Nearest hit among `triangles` along a ray already clipped to the grid.
    ///
    /// Accepts only hits closer than `best`. Returns whether one was found.
    pub fn trace_nearest(&self, triangles: &[TriAccel], ray: &Ray, hit: &mut Hit, best: &mut f32) -> bool {
        let mut found = false;
        self.walk(ray, |elements, cell_tfar| {
            let mut cell_ray = *ray;
            cell_ray.tfar = cell_tfar;
            for &id in elements {
                if hit_wald(&triangles[id as usize], &cell_ray, hit, best) {
                    found = true;
                }
            }
            found
        })
    }

    /// Whether any of `triangles` blocks a ray already clipped to the grid.
    pub fn trace_any(&self, triangles: &[TriAccel], ray: &Ray) -> bool {
        let mut hit = Hit::default();
        let mut best = f32::MAX;
        self.walk(ray, |elements, _| {
            elements
                .iter()
                .any(|&id| hit_wald(&triangles[id as usize], ray, &mut hit, &mut best))
        })
    }

    /// Visit the non-empty cells pierced by `ray` in order until `visit`
    /// returns true.
    ///
    /// `visit` receives the cell's triangle ids and the ray parameter where
    /// the ray leaves the cell, capped at `ray.tfar`.
    fn walk(&self, ray: &Ray, mut visit: impl FnMut(&[u32], f32) -> bool) -> bool {
        let entry = ray.at(ray.tnear);

        let mut cell = [0isize; 3];
        let mut step = [0isize; 3];
        let mut out = [0isize; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];

        for d in 0..3 {
            let c = self.world_to_voxel(entry[d], d);
            cell[d] = c as isize;
            match ray.dir_signs[d] {
                1 => {
                    step[d] = 1;
                    out[d] = self.resolution[d] as isize;
                    t_max[d] = (self.voxel_to_world(c + 1, d) - ray.orig[d]) * ray.inv_dir[d];
                    t_delta[d] = self.cell_size[d] * ray.inv_dir[d];
                }
                -1 => {
                    step[d] = -1;
                    out[d] = -1;
                    t_max[d] = (self.voxel_to_world(c, d) - ray.orig[d]) * ray.inv_dir[d];
                    t_delta[d] = -self.cell_size[d] * ray.inv_dir[d];
                }
                _ => {}
            }
        }

        loop {
            let cell_exit = t_max[0].min(t_max[1]).min(t_max[2]);
            let elements = &self.cells[self.cell_index(cell[0] as usize, cell[1] as usize, cell[2] as usize)];
            if !elements.is_empty() && visit(elements, cell_exit.min(ray.tfar)) {
                return true;
            }
            if cell_exit >= ray.tfar {
                return false;
            }

            let axis = if t_max[0] < t_max[1] {
                if t_max[0] < t_max[2] {
                    0
                } else {
                    2
                }
            } else if t_max[1] < t_max[2] {
                1
            } else {
                2
            };
            if step[axis] == 0 {
                return false;
            }

            cell[axis] += step[axis];
            if cell[axis] == out[axis] {
                return false;
            }
            t_max[axis] += t_delta[axis];
        }
    }
}
