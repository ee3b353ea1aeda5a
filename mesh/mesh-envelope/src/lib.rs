//! Watertight outer envelopes of multiple polygon meshes.
//!
//! Given a set of possibly overlapping, possibly open meshes, this crate
//! produces a closed, manifold surface enclosing all of them, with gaps and
//! holes up to a chosen width sealed. Bodies that stay apart after sealing
//! get one shell each. It is the input stage for volume meshing and
//! simulation domain setup.
//!
//! # Pipeline
//!
//! 1. Rasterize every mesh into a narrow-band level set ([`mesh_levelset`])
//! 2. Merge the level sets by union
//! 3. Close gaps narrower than the hole threshold (dilate, then erode
//!    without separating what the dilation joined)
//! 4. Extract the zero crossing with surface nets
//!
//! All grids share one voxel size and a band wide enough for the closing
//! offset: `hole_threshold / voxel_size + 3` voxels, at least 3.
//!
//! # Example
//!
//! ```
//! use mesh_envelope::{EnvelopeBuilder, EnvelopeConfig};
//! use mesh_types::{box_mesh, Point3};
//!
//! // Two boxes separated by a narrow slot
//! let meshes = vec![
//!     box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0)),
//!     box_mesh(Point3::new(4.5, 0.0, 0.0), Point3::new(8.5, 4.0, 4.0)),
//! ];
//!
//! let config = EnvelopeConfig::new(0.5, 1.0).with_parallel(false);
//! let output = EnvelopeBuilder::new(config).unwrap().build(&meshes).unwrap();
//!
//! assert!(output.stats.closing_applied);
//! assert!(output.surface.is_consistent());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod envelope;
mod error;
mod surface;

pub use config::EnvelopeConfig;
pub use envelope::{EnvelopeBuilder, EnvelopeOutput, EnvelopeStats, build_envelope};
pub use error::{EnvelopeError, EnvelopeResult};
pub use surface::{merge_meshes, surface_bounds};

// Re-export the types callers need to assemble inputs
pub use mesh_types::{InputMesh, SurfaceData};
