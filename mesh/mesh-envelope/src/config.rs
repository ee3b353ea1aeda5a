//! Envelope construction settings.

use mesh_levelset::{LevelSetParams, required_half_width};

use crate::error::{EnvelopeError, EnvelopeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for [`EnvelopeBuilder`](crate::EnvelopeBuilder).
///
/// # Example
///
/// ```
/// use mesh_envelope::EnvelopeConfig;
///
/// let config = EnvelopeConfig::default()
///     .with_voxel_size(0.05)
///     .with_hole_threshold(0.2);
/// assert!(config.validate().is_ok());
/// assert!((config.half_width() - 7.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeConfig {
    /// Edge length of a voxel in world units.
    /// Smaller values follow the input more closely but take longer.
    pub voxel_size: f64,
    /// Widest gap or hole, in world units, that closing should seal.
    /// Zero disables closing.
    pub hole_threshold: f64,
    /// Rasterize and merge meshes on the rayon thread pool.
    pub parallel: bool,
    /// Emit triangles instead of quads.
    pub split_quads: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.1,
            hole_threshold: 0.5,
            parallel: true,
            split_quads: false,
        }
    }
}

impl EnvelopeConfig {
    /// Create a configuration with the given resolution and closing distance.
    #[must_use]
    pub fn new(voxel_size: f64, hole_threshold: f64) -> Self {
        Self {
            voxel_size,
            hole_threshold,
            ..Self::default()
        }
    }

    /// Set the voxel size.
    #[must_use]
    pub const fn with_voxel_size(mut self, voxel_size: f64) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    /// Set the hole threshold.
    #[must_use]
    pub const fn with_hole_threshold(mut self, hole_threshold: f64) -> Self {
        self.hole_threshold = hole_threshold;
        self
    }

    /// Enable or disable parallel rasterization.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable triangle output.
    #[must_use]
    pub const fn with_split_quads(mut self, split_quads: bool) -> Self {
        self.split_quads = split_quads;
        self
    }

    /// Coarse settings for interactive preview.
    #[must_use]
    pub fn preview() -> Self {
        Self {
            voxel_size: 0.5,
            hole_threshold: 1.0,
            ..Self::default()
        }
    }

    /// Fine settings for final output.
    #[must_use]
    pub fn high_quality() -> Self {
        Self {
            voxel_size: 0.025,
            hole_threshold: 0.25,
            ..Self::default()
        }
    }

    /// Check that the settings describe a buildable grid.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidVoxelSize`] if the voxel size is not a
    /// finite positive number, or [`EnvelopeError::InvalidHoleThreshold`] if
    /// the hole threshold is negative or not finite.
    pub fn validate(&self) -> EnvelopeResult<()> {
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(EnvelopeError::InvalidVoxelSize(self.voxel_size));
        }
        if !self.hole_threshold.is_finite() || self.hole_threshold < 0.0 {
            return Err(EnvelopeError::InvalidHoleThreshold(self.hole_threshold));
        }
        Ok(())
    }

    /// True if the pipeline will run the closing stage.
    #[must_use]
    pub fn closing_enabled(&self) -> bool {
        self.hole_threshold > 0.0
    }

    /// Band half-width in voxels: `hole_threshold / voxel_size + 3` when
    /// closing, otherwise the minimum of 3.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        required_half_width(self.voxel_size, self.hole_threshold)
    }

    /// Level-set parameters for this configuration.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`validate`](Self::validate).
    pub fn level_set_params(&self) -> EnvelopeResult<LevelSetParams> {
        self.validate()?;
        Ok(LevelSetParams::new(self.voxel_size, self.half_width())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults() {
        let config = EnvelopeConfig::default();
        assert_relative_eq!(config.voxel_size, 0.1);
        assert_relative_eq!(config.hole_threshold, 0.5);
        assert!(config.parallel);
        assert!(!config.split_quads);
        assert!(config.closing_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn half_width_rule() {
        assert_relative_eq!(EnvelopeConfig::new(0.1, 0.0).half_width(), 3.0);
        assert_relative_eq!(EnvelopeConfig::new(0.5, 1.0).half_width(), 5.0);
        assert_relative_eq!(EnvelopeConfig::new(0.25, 2.0).half_width(), 11.0);
    }

    #[test]
    fn presets_are_valid() {
        assert!(EnvelopeConfig::preview().validate().is_ok());
        assert!(EnvelopeConfig::high_quality().validate().is_ok());
        assert!(EnvelopeConfig::preview().voxel_size > EnvelopeConfig::high_quality().voxel_size);
    }

    #[test]
    fn rejects_bad_values() {
        for vs in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                EnvelopeConfig::new(vs, 0.0).validate(),
                Err(EnvelopeError::InvalidVoxelSize(_))
            ));
        }
        assert!(matches!(
            EnvelopeConfig::new(0.1, -1.0).validate(),
            Err(EnvelopeError::InvalidHoleThreshold(_))
        ));
        assert!(matches!(
            EnvelopeConfig::new(0.1, f64::NAN).level_set_params(),
            Err(EnvelopeError::InvalidHoleThreshold(_))
        ));
    }

    #[test]
    fn builders_chain() {
        let config = EnvelopeConfig::default()
            .with_voxel_size(0.2)
            .with_hole_threshold(0.0)
            .with_parallel(false)
            .with_split_quads(true);
        assert!(!config.closing_enabled());
        assert!(!config.parallel);
        assert!(config.split_quads);
        let params = config.level_set_params().unwrap();
        assert_relative_eq!(params.voxel_size(), 0.2);
        assert_relative_eq!(params.half_width(), 3.0);
    }
}
