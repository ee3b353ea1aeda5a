//! Core mesh types for envelope construction.
//!
//! This crate provides the data types shared by the level-set and envelope
//! crates:
//!
//! - [`PolygonMesh`] - An indexed polygon mesh with per-face vertex counts
//! - [`InputMesh`] / [`SurfaceData`] - Aliases naming the pipeline's input and output
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Units
//!
//! Coordinates are unit-agnostic. Mesh points are stored as `f32` to match
//! the precision of the voxel grids built from them; geometric helpers
//! ([`Triangle`], [`Aabb`]) compute in `f64`.
//!
//! # Winding
//!
//! Faces are **counter-clockwise (CCW) when viewed from outside**, so normals
//! point outward by the right-hand rule. Closed meshes wound this way have a
//! positive [`PolygonMesh::signed_volume`].
//!
//! # Example
//!
//! ```
//! use mesh_types::{box_mesh, MeshBounds, Point3};
//!
//! let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
//! assert_eq!(mesh.point_count(), 8);
//! assert_eq!(mesh.face_count(), 6);
//! assert!((mesh.signed_volume() - 2.0).abs() < 1e-9);
//! assert!((mesh.bounds().size().x - 2.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bounds;
mod polygon;
mod traits;
mod triangle;

pub use bounds::Aabb;
pub use polygon::{Faces, InputMesh, PolygonMesh, SurfaceData, box_mesh};
pub use traits::MeshBounds;
pub use triangle::Triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
