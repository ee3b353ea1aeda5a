//! Mesh-level helpers that need no voxel grid.

use mesh_types::{Aabb, MeshBounds, PolygonMesh, SurfaceData};

/// Concatenate meshes into one surface, offsetting face indices.
///
/// No geometry is merged: overlapping inputs stay overlapping. Use
/// [`build_envelope`](crate::build_envelope) for a watertight union.
///
/// # Example
///
/// ```
/// use mesh_envelope::merge_meshes;
/// use mesh_types::{box_mesh, Point3};
///
/// let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
/// let b = box_mesh(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
/// let merged = merge_meshes(&[a, b]);
///
/// assert_eq!(merged.point_count(), 16);
/// assert_eq!(merged.face_count(), 12);
/// assert!(merged.is_consistent());
/// ```
#[must_use]
pub fn merge_meshes(meshes: &[PolygonMesh]) -> SurfaceData {
    let mut merged = SurfaceData::with_capacity(
        meshes.iter().map(PolygonMesh::point_count).sum(),
        meshes.iter().map(PolygonMesh::face_count).sum(),
        meshes.iter().map(|m| m.face_vertex_indices.len()).sum(),
    );
    for mesh in meshes {
        merged.append(mesh);
    }
    merged
}

/// Axis-aligned bounds of a surface's points.
///
/// Empty for a surface without points.
#[must_use]
pub fn surface_bounds(surface: &SurfaceData) -> Aabb {
    surface.bounds()
}
