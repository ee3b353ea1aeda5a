//! Error types for level-set operations.

use thiserror::Error;

/// Result type for level-set operations.
pub type LevelSetResult<T> = Result<T, LevelSetError>;

/// Errors that can occur while building or combining level sets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelSetError {
    /// Voxel size is zero, negative or not finite.
    #[error("invalid voxel size: {0} (must be finite and > 0)")]
    InvalidVoxelSize(f64),

    /// Band half-width is below the minimum or not finite.
    #[error("invalid band half-width: {actual} voxels (minimum is {minimum})")]
    InvalidHalfWidth {
        /// Minimum allowed half-width in voxels.
        minimum: f64,
        /// Half-width provided.
        actual: f64,
    },

    /// Two grids with different voxel sizes or bands were combined.
    #[error(
        "incompatible grids: voxel size {left_voxel_size} / {right_voxel_size}, \
         half-width {left_half_width} / {right_half_width}"
    )]
    IncompatibleGrids {
        /// Voxel size of the left operand.
        left_voxel_size: f64,
        /// Voxel size of the right operand.
        right_voxel_size: f64,
        /// Half-width of the left operand.
        left_half_width: f64,
        /// Half-width of the right operand.
        right_half_width: f64,
    },

    /// The band is too narrow to hold a morphological offset.
    #[error("band too narrow for closing: need {required} voxels, grid has {actual}")]
    BandTooNarrow {
        /// Half-width the operation needs, in voxels.
        required: f64,
        /// Half-width of the grid, in voxels.
        actual: f64,
    },

    /// Closing distance is negative or not finite.
    #[error("invalid closing distance: {0}")]
    InvalidDistance(f64),
}
