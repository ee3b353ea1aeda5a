//! Grid resolution and narrow-band width.

use crate::error::{LevelSetError, LevelSetResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest band half-width, in voxels, that surface extraction and
/// re-rasterization can work with.
pub const MIN_HALF_WIDTH: f64 = 3.0;

/// Extra voxels kept beyond a morphological offset distance.
pub const BAND_MARGIN_VOXELS: f64 = 3.0;

/// Voxel size and band half-width shared by every stage of a pipeline run.
///
/// Grids only combine when their parameters match exactly.
///
/// # Example
///
/// ```
/// use mesh_levelset::LevelSetParams;
///
/// // Closing gaps of 0.5 units at 0.1 resolution needs a band of 5 + 3 voxels.
/// let params = LevelSetParams::for_closing(0.1, 0.5).unwrap();
/// assert!((params.half_width() - 8.0).abs() < 1e-9);
/// assert!((params.background() - 0.8).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSetParams {
    voxel_size: f64,
    half_width: f64,
}

impl LevelSetParams {
    /// Validate and create parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LevelSetError::InvalidVoxelSize`] if `voxel_size` is not a
    /// finite positive number, or [`LevelSetError::InvalidHalfWidth`] if
    /// `half_width` is below [`MIN_HALF_WIDTH`] or not finite.
    pub fn new(voxel_size: f64, half_width: f64) -> LevelSetResult<Self> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(LevelSetError::InvalidVoxelSize(voxel_size));
        }
        if !half_width.is_finite() || half_width < MIN_HALF_WIDTH {
            return Err(LevelSetError::InvalidHalfWidth {
                minimum: MIN_HALF_WIDTH,
                actual: half_width,
            });
        }
        Ok(Self {
            voxel_size,
            half_width,
        })
    }

    /// Parameters wide enough to close gaps of `closing_distance` world units.
    ///
    /// # Errors
    ///
    /// Returns [`LevelSetError::InvalidVoxelSize`] for a bad voxel size and
    /// [`LevelSetError::InvalidDistance`] for a negative or non-finite
    /// distance.
    pub fn for_closing(voxel_size: f64, closing_distance: f64) -> LevelSetResult<Self> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(LevelSetError::InvalidVoxelSize(voxel_size));
        }
        if !closing_distance.is_finite() || closing_distance < 0.0 {
            return Err(LevelSetError::InvalidDistance(closing_distance));
        }
        Self::new(voxel_size, required_half_width(voxel_size, closing_distance))
    }

    /// Edge length of a voxel in world units.
    #[inline]
    #[must_use]
    pub const fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// Band half-width in voxels.
    #[inline]
    #[must_use]
    pub const fn half_width(&self) -> f64 {
        self.half_width
    }

    /// Background value: the band half-width in world units.
    #[inline]
    #[must_use]
    pub fn background(&self) -> f64 {
        self.half_width * self.voxel_size
    }
}

/// Half-width in voxels needed to offset a surface by `distance` and still
/// resolve it afterwards.
///
/// ```
/// use mesh_levelset::required_half_width;
///
/// assert!((required_half_width(0.1, 0.0) - 3.0).abs() < 1e-12);
/// assert!((required_half_width(0.5, 1.0) - 5.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn required_half_width(voxel_size: f64, distance: f64) -> f64 {
    if distance > 0.0 {
        (distance / voxel_size + BAND_MARGIN_VOXELS).max(MIN_HALF_WIDTH)
    } else {
        MIN_HALF_WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_bad_voxel_size() {
        for vs in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                LevelSetParams::new(vs, 3.0),
                Err(LevelSetError::InvalidVoxelSize(_))
            ));
        }
    }

    #[test]
    fn rejects_narrow_band() {
        assert!(matches!(
            LevelSetParams::new(0.1, 2.0),
            Err(LevelSetError::InvalidHalfWidth { .. })
        ));
        assert!(LevelSetParams::new(0.1, 3.0).is_ok());
    }

    #[test]
    fn closing_band_grows_with_distance() {
        let narrow = LevelSetParams::for_closing(0.25, 0.0).unwrap();
        let wide = LevelSetParams::for_closing(0.25, 1.0).unwrap();
        assert_relative_eq!(narrow.half_width(), 3.0);
        assert_relative_eq!(wide.half_width(), 7.0);
        assert_relative_eq!(wide.background(), 1.75);
    }

    #[test]
    fn closing_rejects_negative_distance() {
        assert!(matches!(
            LevelSetParams::for_closing(0.1, -1.0),
            Err(LevelSetError::InvalidDistance(_))
        ));
    }
}
