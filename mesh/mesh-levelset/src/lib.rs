//! Sparse narrow-band level sets for watertight surface reconstruction.
//!
//! This crate turns polygon meshes into signed distance fields stored only
//! in a band around the surface, combines them, repairs them, and turns them
//! back into meshes.
//!
//! # Overview
//!
//! - [`NarrowBandGrid`] - Block-sparse signed distance field (negative inside)
//! - [`mesh_to_level_set`] - Rasterize a polygon mesh into a grid
//! - [`csg_union`] / [`union_all`] - Boolean union by pointwise minimum
//! - [`dilate`], [`erode`], [`rebuild`], [`close`] - Morphological operations
//! - [`extract_surface`] - Surface nets iso-surface extraction
//!
//! # Band width
//!
//! Every grid carries [`LevelSetParams`]: a voxel size and a band half-width
//! in voxels. Values are stored exactly within the band and clamped to
//! `±half_width * voxel_size` outside it. Offsetting a surface by `d` needs a
//! half-width of at least `d / voxel_size + 3` (see [`required_half_width`]).
//!
//! # Example
//!
//! ```
//! use mesh_levelset::{close, extract_surface, mesh_to_level_set, union_all, LevelSetParams};
//! use mesh_types::{box_mesh, Point3};
//!
//! let params = LevelSetParams::for_closing(0.5, 1.0).unwrap();
//! let parts = [
//!     box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0)),
//!     box_mesh(Point3::new(3.5, 0.0, 0.0), Point3::new(6.5, 3.0, 3.0)),
//! ];
//!
//! let grids = parts.iter().map(|m| mesh_to_level_set(m, params)).collect();
//! let merged = union_all(params, grids, false).unwrap();
//! let closed = close(merged, 1.0).unwrap();
//! let surface = extract_surface(&closed);
//!
//! assert!(!surface.is_empty());
//! assert!(surface.is_consistent());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod csg;
mod error;
mod grid;
mod morphology;
mod params;
mod query;
mod rasterize;
mod surface_nets;

pub use csg::{csg_union, union_all};
pub use error::{LevelSetError, LevelSetResult};
pub use grid::{BLOCK_DIM, BLOCK_LOG2, BLOCK_VOXELS, Coord, NarrowBandGrid, block_of};
pub use morphology::{close, dilate, erode, rebuild};
pub use params::{BAND_MARGIN_VOXELS, LevelSetParams, MIN_HALF_WIDTH, required_half_width};
pub use query::{
    ClosestPoint, TriangleFeature, closest_point_on_triangle,
};
pub use rasterize::{Primitive, mesh_to_level_set, polygon_primitives};
pub use surface_nets::{SurfaceNetsConfig, extract_surface, extract_surface_with};
