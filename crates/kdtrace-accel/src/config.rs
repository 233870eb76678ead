//! Build and query parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AccelError, Result};
use crate::kdtree::MAX_STACK_SIZE;

/// Which acceleration structure a scene builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccelKind {
    /// Linear scan over everything.
    BruteForce,
    /// Uniform grid per geometry; instances are scanned linearly.
    UniformGrid,
    /// SAH kd-tree per geometry and a heuristic kd-tree over instances.
    KdTree,
}

/// How the uniform grid decides which cells a triangle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridOverlap {
    /// Every cell touched by the triangle's bounding box.
    BoundingBox,
    /// Bounding-box candidates refined by an exact triangle/box test.
    Exact,
}

/// Uniform grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Target number of triangles per cell (`k` in the resolution formula).
    pub occupancy: f32,
    /// Upper bound on cells along each axis.
    pub max_resolution: usize,
    /// Triangle binning policy.
    pub overlap: GridOverlap,
    /// Relative enlargement of the grid bounds around the vertices.
    pub bbox_scale: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            occupancy: 6.0,
            max_resolution: 512,
            overlap: GridOverlap::BoundingBox,
            bbox_scale: 0.01,
        }
    }
}

/// SAH kd-tree parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeConfig {
    /// Cost of one traversal step.
    pub traversal_cost: f32,
    /// Cost of one ray-triangle test.
    pub intersection_cost: f32,
    /// Cost factor for splits that cut off empty space, scaled up towards
    /// 1.0 by the width of the non-empty side.
    pub empty_space_bonus: f32,
    /// Nodes at this depth become leaves.
    pub max_depth: usize,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self {
            traversal_cost: 1.0,
            intersection_cost: 1.4,
            empty_space_bonus: 0.8,
            max_depth: 64,
        }
    }
}

/// Top-level configuration.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// accel = "uniform-grid"
///
/// [grid]
/// occupancy = 4.0
/// overlap = "exact"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelConfig {
    /// Structure used for geometries and instances.
    pub accel: AccelKind,
    /// Start of the parametric interval for primary rays.
    pub ray_epsilon: f32,
    /// Relative enlargement of instance world bounds.
    pub instance_bbox_scale: f32,
    /// Uniform grid parameters.
    pub grid: GridConfig,
    /// Kd-tree parameters.
    pub kdtree: KdTreeConfig,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            accel: AccelKind::KdTree,
            ray_epsilon: 2e-4,
            instance_bbox_scale: 0.01,
            grid: GridConfig::default(),
            kdtree: KdTreeConfig::default(),
        }
    }
}

impl AccelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.ray_epsilon >= 0.0) {
            return Err(AccelError::InvalidConfig(
                "ray_epsilon must be non-negative".into(),
            ));
        }
        if !(self.instance_bbox_scale >= 0.0) {
            return Err(AccelError::InvalidConfig(
                "instance_bbox_scale must be non-negative".into(),
            ));
        }
        if !(self.grid.occupancy > 0.0) {
            return Err(AccelError::InvalidConfig(
                "grid.occupancy must be positive".into(),
            ));
        }
        if self.grid.max_resolution == 0 {
            return Err(AccelError::InvalidConfig(
                "grid.max_resolution must be at least 1".into(),
            ));
        }
        if !(self.grid.bbox_scale >= 0.0) {
            return Err(AccelError::InvalidConfig(
                "grid.bbox_scale must be non-negative".into(),
            ));
        }
        if !(self.kdtree.traversal_cost > 0.0) || !(self.kdtree.intersection_cost > 0.0) {
            return Err(AccelError::InvalidConfig(
                "kdtree costs must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.kdtree.empty_space_bonus) {
            return Err(AccelError::InvalidConfig(
                "kdtree.empty_space_bonus must be between 0 and 1".into(),
            ));
        }
        if self.kdtree.max_depth == 0 || self.kdtree.max_depth > MAX_STACK_SIZE {
            return Err(AccelError::InvalidConfig(format!(
                "kdtree.max_depth must be between 1 and {MAX_STACK_SIZE}"
            )));
        }
        Ok(())
    }
}
