//! The envelope pipeline: rasterize, merge, close, extract.

use mesh_levelset::{
    NarrowBandGrid, SurfaceNetsConfig, close, extract_surface_with, mesh_to_level_set, union_all,
};
use mesh_types::{InputMesh, SurfaceData};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::EnvelopeConfig;
use crate::error::EnvelopeResult;

/// Counters collected while building an envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvelopeStats {
    /// Number of meshes passed in.
    pub input_meshes: usize,
    /// Meshes that produced a non-empty level set.
    pub rasterized_meshes: usize,
    /// Meshes with no usable geometry.
    pub skipped_meshes: usize,
    /// Active voxels in the merged field.
    pub active_voxels: usize,
    /// Active voxels after closing (equal to `active_voxels` if skipped).
    pub active_voxels_after_closing: usize,
    /// True if the closing stage ran.
    pub closing_applied: bool,
    /// Band half-width in voxels used for every grid.
    pub half_width: f64,
    /// Points in the output surface.
    pub output_points: usize,
    /// Faces in the output surface.
    pub output_faces: usize,
}

impl std::fmt::Display for EnvelopeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} meshes, {} active voxels ({} after closing), {} points, {} faces",
            self.rasterized_meshes,
            self.input_meshes,
            self.active_voxels,
            self.active_voxels_after_closing,
            self.output_points,
            self.output_faces
        )
    }
}

/// Result of [`EnvelopeBuilder::build`].
#[derive(Debug, Clone)]
pub struct EnvelopeOutput {
    /// The watertight outer surface.
    pub surface: SurfaceData,
    /// Pipeline statistics.
    pub stats: EnvelopeStats,
}

/// Builds watertight envelopes around sets of meshes.
///
/// The builder validates its [`EnvelopeConfig`] once and can then be reused
/// for any number of inputs.
///
/// # Example
///
/// ```
/// use mesh_envelope::{EnvelopeBuilder, EnvelopeConfig};
/// use mesh_types::{box_mesh, Point3};
///
/// let meshes = vec![
///     box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0)),
///     box_mesh(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0)),
/// ];
///
/// let builder = EnvelopeBuilder::new(EnvelopeConfig::new(0.25, 0.0)).unwrap();
/// let output = builder.build(&meshes).unwrap();
///
/// assert_eq!(output.stats.rasterized_meshes, 2);
/// assert!(output.surface.face_count() > 0);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    config: EnvelopeConfig,
}

impl EnvelopeBuilder {
    /// Create a builder after checking `config`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`EnvelopeConfig::validate`].
    pub fn new(config: EnvelopeConfig) -> EnvelopeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this builder runs with.
    #[must_use]
    pub const fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Build the outer envelope of `meshes`.
    ///
    /// Each mesh is rasterized into a narrow-band level set, the sets are
    /// merged by union, gaps up to the hole threshold are closed, and the zero
    /// crossing is extracted as a closed polygon surface. Meshes without
    /// usable faces are skipped. An empty input, or one where every mesh is
    /// skipped, gives an empty surface.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::LevelSet`](crate::EnvelopeError::LevelSet) if
    /// a level-set stage fails.
    pub fn build(&self, meshes: &[InputMesh]) -> EnvelopeResult<EnvelopeOutput> {
        let params = self.config.level_set_params()?;
        let mut stats = EnvelopeStats {
            input_meshes: meshes.len(),
            half_width: params.half_width(),
            ..EnvelopeStats::default()
        };

        if meshes.is_empty() {
            debug!("No input meshes, returning empty surface");
            return Ok(EnvelopeOutput {
                surface: SurfaceData::new(),
                stats,
            });
        }

        info!(
            meshes = meshes.len(),
            voxel_size = params.voxel_size(),
            half_width = params.half_width(),
            hole_threshold = self.config.hole_threshold,
            "Building envelope"
        );

        let rasterized: Vec<NarrowBandGrid> = if self.config.parallel {
            meshes
                .par_iter()
                .map(|mesh| mesh_to_level_set(mesh, params))
                .collect()
        } else {
            meshes
                .iter()
                .map(|mesh| mesh_to_level_set(mesh, params))
                .collect()
        };
        let grids: Vec<NarrowBandGrid> = rasterized.into_iter().filter(|g| !g.is_empty()).collect();
        stats.rasterized_meshes = grids.len();
        stats.skipped_meshes = meshes.len() - grids.len();
        if stats.skipped_meshes > 0 {
            debug!(skipped = stats.skipped_meshes, "Skipped meshes without geometry");
        }

        let merged = union_all(params, grids, self.config.parallel)?;
        stats.active_voxels = merged.active_voxel_count();
        let Some((lo, hi)) = merged.index_bounds() else {
            info!("Nothing to enclose, returning empty surface");
            return Ok(EnvelopeOutput {
                surface: SurfaceData::new(),
                stats,
            });
        };
        debug!(?lo, ?hi, active = stats.active_voxels, "Merged level sets");

        let closed = if self.config.closing_enabled() {
            stats.closing_applied = true;
            close(merged, self.config.hole_threshold)?
        } else {
            merged
        };
        stats.active_voxels_after_closing = closed.active_voxel_count();

        let nets = SurfaceNetsConfig::default().with_split_quads(self.config.split_quads);
        let surface = extract_surface_with(&closed, &nets);
        stats.output_points = surface.point_count();
        stats.output_faces = surface.face_count();

        info!(%stats, "Envelope complete");
        Ok(EnvelopeOutput { surface, stats })
    }
}

/// Build the watertight outer envelope of `meshes` in one call.
///
/// `voxel_size` sets the grid resolution and `hole_threshold` the widest gap
/// to seal (zero disables closing). Rasterization runs in parallel and the
/// output is made of quads.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidVoxelSize`](crate::EnvelopeError::InvalidVoxelSize)
/// or [`EnvelopeError::InvalidHoleThreshold`](crate::EnvelopeError::InvalidHoleThreshold)
/// for bad arguments, and
/// [`EnvelopeError::LevelSet`](crate::EnvelopeError::LevelSet) if a stage fails.
///
/// # Example
///
/// ```
/// use mesh_envelope::build_envelope;
/// use mesh_types::{box_mesh, Point3};
///
/// let cube = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
/// let surface = build_envelope(&[cube], 0.5, 0.0).unwrap();
/// assert!(surface.is_consistent());
/// assert!(!surface.is_empty());
/// ```
pub fn build_envelope(
    meshes: &[InputMesh],
    voxel_size: f64,
    hole_threshold: f64,
) -> EnvelopeResult<SurfaceData> {
    let builder = EnvelopeBuilder::new(EnvelopeConfig::new(voxel_size, hole_threshold))?;
    Ok(builder.build(meshes)?.surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnvelopeError;
    use mesh_types::{Point3, PolygonMesh, box_mesh};

    fn cube(min: f32, size: f32) -> PolygonMesh {
        box_mesh(
            Point3::new(min, min, min),
            Point3::new(min + size, min + size, min + size),
        )
    }

    #[test]
    fn empty_input_gives_empty_surface() {
        let builder = EnvelopeBuilder::new(EnvelopeConfig::default()).unwrap();
        let output = builder.build(&[]).unwrap();
        assert!(output.surface.is_empty());
        assert_eq!(output.stats.input_meshes, 0);
        assert!(!output.stats.closing_applied);
    }

    #[test]
    fn faceless_meshes_are_skipped() {
        let mut bare = PolygonMesh::new();
        bare.points.push(Point3::new(0.0, 0.0, 0.0));
        let builder = EnvelopeBuilder::new(EnvelopeConfig::new(0.5, 0.0)).unwrap();

        let output = builder.build(&[bare.clone(), PolygonMesh::new()]).unwrap();
        assert!(output.surface.is_empty());
        assert_eq!(output.stats.skipped_meshes, 2);

        let output = builder.build(&[bare, cube(0.0, 3.0)]).unwrap();
        assert_eq!(output.stats.skipped_meshes, 1);
        assert_eq!(output.stats.rasterized_meshes, 1);
        assert!(!output.surface.is_empty());
    }

    #[test]
    fn stats_track_pipeline() {
        let builder = EnvelopeBuilder::new(EnvelopeConfig::new(0.5, 1.0)).unwrap();
        let output = builder.build(&[cube(0.0, 3.0)]).unwrap();
        let stats = &output.stats;
        assert!(stats.closing_applied);
        assert!((stats.half_width - 5.0).abs() < 1e-12);
        assert!(stats.active_voxels > 0);
        assert!(stats.active_voxels_after_closing > 0);
        assert_eq!(stats.output_points, output.surface.point_count());
        assert_eq!(stats.output_faces, output.surface.face_count());
        assert!(stats.to_string().contains("1/1 meshes"));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        assert!(matches!(
            EnvelopeBuilder::new(EnvelopeConfig::new(0.0, 0.0)),
            Err(EnvelopeError::InvalidVoxelSize(_))
        ));
        assert!(matches!(
            build_envelope(&[cube(0.0, 1.0)], 0.1, -0.5),
            Err(EnvelopeError::InvalidHoleThreshold(_))
        ));
    }

    #[test]
    fn split_quads_emits_triangles() {
        let config = EnvelopeConfig::new(0.5, 0.0).with_split_quads(true);
        let output = EnvelopeBuilder::new(config).unwrap().build(&[cube(0.0, 3.0)]).unwrap();
        assert!(output.surface.faces().all(|face| face.len() == 3));
    }
}
