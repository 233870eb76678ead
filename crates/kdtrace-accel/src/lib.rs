#![warn(missing_docs)]

//! Ray tracing acceleration structures for triangle scenes.
//!
//! Scenes are two-level: geometries own their triangles and an
//! acceleration structure in local space, instances place a shared
//! geometry in the world, and a scene-level structure over instance
//! bounds finds the candidates for each ray.
//!
//! # Architecture
//!
//! - [`Aabb`] and [`clip`] - Bounding boxes and box/ray/triangle predicates
//! - [`intersect`] - Wald's precomputed ray-triangle test and a Möller-Trumbore reference
//! - [`Stack`] - Fixed-capacity traversal stack
//! - [`AccStruct`] - Brute force, [`UniformGrid`] or [`KdTree`], queried through one interface
//! - [`kdtree`] - SAH triangle trees, instance trees, compaction and traversal
//! - [`AccelBuilder`] - Builds structures for geometries and instance sets
//! - [`Scene`] - Geometries, instances and lazy scene-level rebuilds
//!
//! # Example
//!
//! ```
//! use kdtrace_accel::{AccelConfig, Geometry, Sample, Scene};
//! use kdtrace_math::{Point3, Transform, Vec3};
//!
//! let triangle = Geometry::from_indexed(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[[0, 1, 2]],
//!     0,
//! )?;
//!
//! let mut scene = Scene::new(AccelConfig::default())?;
//! let id = scene.add_geometry(triangle);
//! scene.instantiate(id, Transform::translation(0.0, 0.0, 2.0))?;
//!
//! let view = scene.commit();
//! let mut sample = Sample::new(Point3::new(0.25, 0.25, 0.0), Vec3::new(0.0, 0.0, 1.0));
//! assert!(view.trace_nearest(&mut sample));
//! assert!((sample.hit.distance - 2.0).abs() < 1e-4);
//! # Ok::<(), kdtrace_accel::AccelError>(())
//! ```

mod aabb;
mod accel;
mod builder;
pub mod clip;
mod config;
mod error;
mod geometry;
mod grid;
pub mod intersect;
pub mod kdtree;
mod ray;
mod scene;
mod stack;

pub use aabb::{Aabb, SplitPlane, PLANAR_TOLERANCE};
pub use accel::{AccStruct, BruteForce};
pub use builder::AccelBuilder;
pub use config::{AccelConfig, AccelKind, GridConfig, GridOverlap, KdTreeConfig};
pub use error::{AccelError, Result};
pub use geometry::{Geometry, GeometryBuilder, Instance, PrimitiveMode, TriDesc};
pub use grid::{GridStats, UniformGrid};
pub use kdtree::{KdTree, KdTreeStats};
pub use ray::{Hit, Ray, Sample};
pub use scene::{BuildReport, GeometryReport, Scene, SceneView};
pub use stack::Stack;
