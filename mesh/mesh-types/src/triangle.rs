//! Triangle type for geometric calculations.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Area below which a triangle is treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-20;

/// Three corner positions in double precision.
///
/// The normal follows the right-hand rule over `v0 → v1 → v2`, so a face
/// wound counter-clockwise seen from outside has an outward normal.
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// );
///
/// assert!((tri.area() - 0.5).abs() < 1e-10);
/// let normal = tri.normal().unwrap();
/// assert!((normal.z - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`.
    ///
    /// The magnitude equals twice the triangle's area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit face normal, or `None` for a degenerate triangle.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        if self.is_degenerate() {
            return None;
        }
        self.normal_unnormalized().try_normalize(0.0)
    }

    /// Triangle area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// True if the triangle has (numerically) zero area.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.area() <= DEGENERATE_AREA
    }

    /// Interior angles in radians at `v0`, `v1` and `v2`.
    ///
    /// Angles at a vertex whose adjacent edge has zero length are `0.0`.
    #[must_use]
    pub fn angles(&self) -> [f64; 3] {
        let corner = |apex: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>| {
            match ((a - apex).try_normalize(0.0), (b - apex).try_normalize(0.0)) {
                (Some(u), Some(v)) => u.dot(&v).clamp(-1.0, 1.0).acos(),
                _ => 0.0,
            }
        };
        [
            corner(&self.v0, &self.v1, &self.v2),
            corner(&self.v1, &self.v2, &self.v0),
            corner(&self.v2, &self.v0, &self.v1),
        ]
    }
}
