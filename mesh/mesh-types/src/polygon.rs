//! Indexed polygon mesh with mixed face arities.

use crate::{Aabb, MeshBounds};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A polygon mesh stored as flat point, count and index arrays.
///
/// Face `f` uses `face_vertex_counts[f]` consecutive entries of
/// `face_vertex_indices`, starting after the entries of all earlier faces.
/// Triangles, quads and larger polygons may be mixed freely.
///
/// The layout matches common interchange formats (USD `points` /
/// `faceVertexCounts` / `faceVertexIndices`), so surfaces can be handed to
/// exporters without conversion.
///
/// # Example
///
/// ```
/// use mesh_types::{PolygonMesh, Point3};
///
/// let mut mesh = PolygonMesh::new();
/// mesh.points.extend([
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ]);
/// mesh.push_face(&[0, 1, 2, 3]);
///
/// assert_eq!(mesh.face_count(), 1);
/// assert!(mesh.is_consistent());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolygonMesh {
    /// Vertex positions.
    pub points: Vec<Point3<f32>>,
    /// Number of vertices of each face.
    pub face_vertex_counts: Vec<u32>,
    /// Concatenated vertex indices of all faces.
    pub face_vertex_indices: Vec<u32>,
}

/// A mesh handed to the envelope pipeline.
pub type InputMesh = PolygonMesh;

/// A surface produced by the envelope pipeline.
pub type SurfaceData = PolygonMesh;

impl PolygonMesh {
    /// Create an empty mesh.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            face_vertex_counts: Vec::new(),
            face_vertex_indices: Vec::new(),
        }
    }

    /// Create an empty mesh with room for `points` points, `faces` faces and
    /// `indices` face-vertex indices.
    #[must_use]
    pub fn with_capacity(points: usize, faces: usize, indices: usize) -> Self {
        Self {
            points: Vec::with_capacity(points),
            face_vertex_counts: Vec::with_capacity(faces),
            face_vertex_indices: Vec::with_capacity(indices),
        }
    }

    /// Build a mesh from its three arrays without validation.
    ///
    /// Use [`is_consistent`](Self::is_consistent) to check the result.
    #[must_use]
    pub const fn from_parts(
        points: Vec<Point3<f32>>,
        face_vertex_counts: Vec<u32>,
        face_vertex_indices: Vec<u32>,
    ) -> Self {
        Self {
            points,
            face_vertex_counts,
            face_vertex_indices,
        }
    }

    /// Build a triangle-only mesh.
    #[must_use]
    pub fn from_triangles(points: Vec<Point3<f32>>, triangles: &[[u32; 3]]) -> Self {
        Self {
            points,
            face_vertex_counts: vec![3; triangles.len()],
            face_vertex_indices: triangles.iter().flatten().copied().collect(),
        }
    }

    /// Append one face given by its vertex indices.
    pub fn push_face(&mut self, indices: &[u32]) {
        let count = u32::try_from(indices.len()).unwrap_or(u32::MAX);
        self.face_vertex_counts.push(count);
        self.face_vertex_indices.extend_from_slice(indices);
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// True if the mesh has no points or no faces.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() || self.face_vertex_counts.is_empty()
    }

    /// Iterate over faces as index slices.
    ///
    /// Iteration stops early if the count array claims more indices than the
    /// index array holds.
    #[must_use]
    pub fn faces(&self) -> Faces<'_> {
        Faces {
            counts: self.face_vertex_counts.iter(),
            indices: &self.face_vertex_indices,
        }
    }

    /// Check the structural invariants of the mesh.
    ///
    /// Every face has at least three vertices, the counts sum to the index
    /// array length, and every index refers to an existing point.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let total: u64 = self.face_vertex_counts.iter().map(|&c| u64::from(c)).sum();
        let n = self.points.len();
        self.face_vertex_counts.iter().all(|&c| c >= 3)
            && usize::try_from(total).is_ok_and(|t| t == self.face_vertex_indices.len())
            && self.face_vertex_indices.iter().all(|&i| (i as usize) < n)
    }

    /// Append another mesh, offsetting its indices past the current points.
    pub fn append(&mut self, other: &Self) {
        let offset = u32::try_from(self.points.len()).unwrap_or(u32::MAX);
        self.points.extend_from_slice(&other.points);
        self.face_vertex_counts
            .extend_from_slice(&other.face_vertex_counts);
        self.face_vertex_indices
            .extend(other.face_vertex_indices.iter().map(|&i| i.saturating_add(offset)));
    }

    /// Signed enclosed volume, by fan-triangulating every face.
    ///
    /// Positive for closed meshes with outward (CCW) winding, negative for
    /// inside-out meshes. Faces with out-of-range indices are ignored.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        let point = |i: u32| self.points.get(i as usize).map(|p| p.cast::<f64>());
        let mut volume = 0.0;
        for face in self.faces() {
            let Some(anchor) = face.first().and_then(|&i| point(i)) else {
                continue;
            };
            for pair in face[1..].windows(2) {
                let (Some(v1), Some(v2)) = (point(pair[0]), point(pair[1])) else {
                    continue;
                };
                let cross = Vector3::new(
                    v1.y.mul_add(v2.z, -(v1.z * v2.y)),
                    v1.z.mul_add(v2.x, -(v1.x * v2.z)),
                    v1.x.mul_add(v2.y, -(v1.y * v2.x)),
                );
                volume += anchor
                    .z
                    .mul_add(cross.z, anchor.x.mul_add(cross.x, anchor.y * cross.y));
            }
        }
        volume / 6.0
    }
}

impl MeshBounds for PolygonMesh {
    fn bounds(&self) -> Aabb {
        self.points.iter().fold(Aabb::empty(), |mut aabb, p| {
            aabb.expand_to_include(&p.cast::<f64>());
            aabb
        })
    }
}

/// Iterator over the faces of a [`PolygonMesh`].
#[derive(Debug, Clone)]
pub struct Faces<'a> {
    counts: std::slice::Iter<'a, u32>,
    indices: &'a [u32],
}

impl<'a> Iterator for Faces<'a> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        let count = *self.counts.next()? as usize;
        if count > self.indices.len() {
            self.indices = &[];
            return None;
        }
        let (face, rest) = self.indices.split_at(count);
        self.indices = rest;
        Some(face)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.counts.len()))
    }
}

/// Build an axis-aligned box of six outward-wound quads.
///
/// # Example
///
/// ```
/// use mesh_types::{box_mesh, Point3};
///
/// let cube = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
/// assert!(cube.is_consistent());
/// assert!(cube.face_vertex_counts.iter().all(|&c| c == 4));
/// assert!(cube.signed_volume() > 0.0);
/// ```
#[must_use]
pub fn box_mesh(min: Point3<f32>, max: Point3<f32>) -> PolygonMesh {
    let points = vec![
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];
    let quads: [[u32; 4]; 6] = [
        [0, 3, 2, 1], // -z
        [4, 5, 6, 7], // +z
        [0, 1, 5, 4], // -y
        [3, 7, 6, 2], // +y
        [0, 4, 7, 3], // -x
        [1, 2, 6, 5], // +x
    ];
    PolygonMesh {
        points,
        face_vertex_counts: vec![4; quads.len()],
        face_vertex_indices: quads.iter().flatten().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> PolygonMesh {
        box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn empty_mesh() {
        let mesh = PolygonMesh::new();
        assert!(mesh.is_empty());
        assert!(mesh.is_consistent());
        assert_eq!(mesh.faces().count(), 0);
        assert!(mesh.bounds_opt().is_none());
        assert_relative_eq!(mesh.signed_volume(), 0.0);
    }

    #[test]
    fn points_without_faces_is_empty() {
        let mesh = PolygonMesh::from_parts(vec![Point3::origin()], vec![], vec![]);
        assert!(mesh.is_empty());
    }

    #[test]
    fn box_volume_and_bounds() {
        let mesh = box_mesh(Point3::new(1.0, 2.0, 3.0), Point3::new(3.0, 5.0, 7.0));
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-9);
        let b = mesh.bounds();
        assert_relative_eq!(b.min, Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(b.max, Point3::new(3.0, 5.0, 7.0));
        assert_relative_eq!(mesh.center(), Point3::new(2.0, 3.5, 5.0));
    }

    #[test]
    fn reversed_box_has_negative_volume() {
        let mut mesh = unit_box();
        let mut reversed = Vec::new();
        for face in mesh.faces() {
            reversed.extend(face.iter().rev().copied());
        }
        mesh.face_vertex_indices = reversed;
        assert_relative_eq!(mesh.signed_volume(), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn faces_of_mixed_arity() {
        let mut mesh = PolygonMesh::new();
        mesh.points = (0..6).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        mesh.push_face(&[0, 1, 2]);
        mesh.push_face(&[0, 1, 2, 3, 4, 5]);
        mesh.push_face(&[5, 4, 3, 2]);

        let faces: Vec<&[u32]> = mesh.faces().collect();
        assert_eq!(faces.len(), 3);
        assert_eq!(faces[1], &[0, 1, 2, 3, 4, 5]);
        assert_eq!(faces[2], &[5, 4, 3, 2]);
        assert!(mesh.is_consistent());
    }

    #[test]
    fn truncated_index_array_stops_iteration() {
        let mesh = PolygonMesh::from_parts(
            vec![Point3::origin(); 4],
            vec![3, 4],
            vec![0, 1, 2, 0, 1],
        );
        assert_eq!(mesh.faces().count(), 1);
        assert!(!mesh.is_consistent());
    }

    #[test]
    fn inconsistent_meshes_detected() {
        let out_of_range = PolygonMesh::from_triangles(vec![Point3::origin(); 3], &[[0, 1, 3]]);
        assert!(!out_of_range.is_consistent());

        let two_gon = PolygonMesh::from_parts(vec![Point3::origin(); 2], vec![2], vec![0, 1]);
        assert!(!two_gon.is_consistent());
    }

    #[test]
    fn append_offsets_indices() {
        let mut a = unit_box();
        let b = box_mesh(Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 1.0, 1.0));
        a.append(&b);

        assert_eq!(a.point_count(), 16);
        assert_eq!(a.face_count(), 12);
        assert!(a.is_consistent());
        assert_eq!(a.faces().nth(6), Some(&[8, 11, 10, 9][..]));
        assert_relative_eq!(a.signed_volume(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(a.bounds().max.x, 6.0);
    }
}
