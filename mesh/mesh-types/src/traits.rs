//! Shared mesh traits.

use crate::Aabb;
use nalgebra::Point3;

/// Geometry with an axis-aligned extent.
pub trait MeshBounds {
    /// Bounding box of all points; empty when there are none.
    fn bounds(&self) -> Aabb;

    /// Bounding box, or `None` when there are no points.
    fn bounds_opt(&self) -> Option<Aabb> {
        let b = self.bounds();
        if b.is_empty() { None } else { Some(b) }
    }

    /// Midpoint of the bounding box.
    fn center(&self) -> Point3<f64> {
        self.bounds().center()
    }
}
