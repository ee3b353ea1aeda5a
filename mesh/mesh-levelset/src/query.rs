//! Point-triangle proximity queries.

use nalgebra::Point3;

/// The part of a triangle a closest point lies on.
///
/// Edges are numbered by their first vertex: edge 0 is `v0 → v1`, edge 1 is
/// `v1 → v2`, edge 2 is `v2 → v0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriangleFeature {
    /// One of the three corners.
    Vertex(u8),
    /// The interior of one of the three edges.
    Edge(u8),
    /// The interior of the face.
    Face,
}

/// Closest point on a triangle and the feature it lies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// The closest point.
    pub point: Point3<f64>,
    /// The feature containing it.
    pub feature: TriangleFeature,
}

/// Compute the closest point on triangle `(v0, v1, v2)` to `point`.
///
/// Voronoi-region walk from "Real-Time Collision Detection" (Ericson),
/// extended to report which feature the result lies on so callers can pick
/// the matching pseudonormal.
#[must_use]
pub fn closest_point_on_triangle(
    point: &Point3<f64>,
    v0: &Point3<f64>,
    v1: &Point3<f64>,
    v2: &Point3<f64>,
) -> ClosestPoint {
    let done = |point, feature| ClosestPoint { point, feature };

    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return done(*v0, TriangleFeature::Vertex(0));
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return done(*v1, TriangleFeature::Vertex(1));
    }

    let vc = d1.mul_add(d4, -(d3 * d2));
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return done(v0 + ab * t, TriangleFeature::Edge(0));
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return done(*v2, TriangleFeature::Vertex(2));
    }

    let vb = d5.mul_add(d2, -(d1 * d6));
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return done(v0 + ac * t, TriangleFeature::Edge(2));
    }

    let va = d3.mul_add(d6, -(d5 * d4));
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return done(v1 + (v2 - v1) * t, TriangleFeature::Edge(1));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    done(v0 + ab * v + ac * w, TriangleFeature::Face)
}
