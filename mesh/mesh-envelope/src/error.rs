//! Error types for envelope construction.

use thiserror::Error;

/// Result type for envelope operations.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;

/// Errors that can occur while building an envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    /// Voxel size is zero, negative or not finite.
    #[error("invalid voxel size: {0} (must be finite and > 0)")]
    InvalidVoxelSize(f64),

    /// Hole threshold is negative or not finite.
    #[error("invalid hole threshold: {0} (must be finite and >= 0)")]
    InvalidHoleThreshold(f64),

    /// A level-set stage failed.
    #[error("level set error: {0}")]
    LevelSet(#[from] mesh_levelset::LevelSetError),
}
