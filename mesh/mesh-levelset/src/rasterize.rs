//! Polygon mesh to narrow-band signed distance conversion.
//!
//! Distances are exact Euclidean distances to the nearest triangle. Signs
//! come from angle-weighted pseudonormals (Bærentzen & Aanæs), which classify
//! points correctly near edges and corners where a plain face normal fails.

#![allow(clippy::cast_possible_truncation)]

use hashbrown::HashMap;
use mesh_types::{PolygonMesh, Triangle};
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

use crate::grid::{Coord, NarrowBandGrid};
use crate::params::LevelSetParams;
use crate::query::{TriangleFeature, closest_point_on_triangle};

/// A face after arity normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Three vertex indices.
    Triangle([u32; 3]),
    /// Four vertex indices, kept whole.
    Quad([u32; 4]),
}

impl Primitive {
    /// Triangles covering the primitive. Quads split along `a-c`.
    #[must_use]
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> {
        let pair = match *self {
            Self::Triangle(t) => [Some(t), None],
            Self::Quad([a, b, c, d]) => [Some([a, b, c]), Some([a, c, d])],
        };
        pair.into_iter().flatten()
    }
}

/// Normalise the faces of `mesh` into triangles and quads.
///
/// Faces with more than four vertices are fan-triangulated from their first
/// vertex. Faces with fewer than three vertices or with out-of-range indices
/// are skipped with a warning.
#[must_use]
pub fn polygon_primitives(mesh: &PolygonMesh) -> Vec<Primitive> {
    let point_count = mesh.point_count();
    let mut out = Vec::with_capacity(mesh.face_count());
    let mut skipped = 0usize;

    for face in mesh.faces() {
        if face.len() < 3 || face.iter().any(|&i| i as usize >= point_count) {
            skipped += 1;
            continue;
        }
        match *face {
            [a, b, c] => out.push(Primitive::Triangle([a, b, c])),
            [a, b, c, d] => out.push(Primitive::Quad([a, b, c, d])),
            _ => {
                let v0 = face[0];
                out.extend(
                    face[1..]
                        .windows(2)
                        .map(|w| Primitive::Triangle([v0, w[0], w[1]])),
                );
            }
        }
    }

    let declared = mesh.face_count();
    let walked = mesh.faces().count();
    if walked < declared {
        skipped += declared - walked;
    }
    if skipped > 0 {
        warn!(
            skipped,
            faces = declared,
            "Skipped malformed faces (fewer than 3 vertices or bad indices)"
        );
    }
    out
}

/// Triangle soup with welded vertices and sign tables.
struct SignedSoup {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
    face_normals: Vec<Vector3<f64>>,
    vertex_normals: Vec<Vector3<f64>>,
    edge_normals: HashMap<(u32, u32), Vector3<f64>>,
    inside_out: bool,
}

impl SignedSoup {
    fn build(mesh: &PolygonMesh) -> Self {
        let mut weld: HashMap<[u32; 3], u32> = HashMap::new();
        let mut positions = Vec::new();
        let remap: Vec<u32> = mesh
            .points
            .iter()
            .map(|p| {
                // `+ 0.0` folds -0.0 into 0.0 so both weld together.
                let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
                *weld.entry(key).or_insert_with(|| {
                    positions.push(p.cast::<f64>());
                    u32::try_from(positions.len() - 1).unwrap_or(u32::MAX)
                })
            })
            .collect();

        let mut triangles = Vec::new();
        let mut face_normals = Vec::new();
        let mut degenerate = 0usize;
        for prim in polygon_primitives(mesh) {
            for [a, b, c] in prim.triangles() {
                let t = [remap[a as usize], remap[b as usize], remap[c as usize]];
                let tri = Triangle::new(
                    positions[t[0] as usize],
                    positions[t[1] as usize],
                    positions[t[2] as usize],
                );
                match tri.normal() {
                    Some(n) if t[0] != t[1] && t[1] != t[2] && t[2] != t[0] => {
                        triangles.push(t);
                        face_normals.push(n);
                    }
                    _ => degenerate += 1,
                }
            }
        }
        if degenerate > 0 {
            debug!(degenerate, "Dropped zero-area triangles");
        }

        let mut vertex_normals = vec![Vector3::zeros(); positions.len()];
        let mut edge_normals: HashMap<(u32, u32), Vector3<f64>> = HashMap::new();
        let mut volume = 0.0;
        for (t, n) in triangles.iter().zip(&face_normals) {
            let tri = Triangle::new(
                positions[t[0] as usize],
                positions[t[1] as usize],
                positions[t[2] as usize],
            );
            for (corner, angle) in t.iter().zip(tri.angles()) {
                vertex_normals[*corner as usize] += n * angle;
            }
            for e in 0..3 {
                *edge_normals
                    .entry(edge_key(t[e], t[(e + 1) % 3]))
                    .or_insert_with(Vector3::zeros) += n;
            }
            volume += tri.v0.coords.dot(&tri.v1.coords.cross(&tri.v2.coords));
        }

        Self {
            positions,
            triangles,
            face_normals,
            vertex_normals,
            edge_normals,
            inside_out: volume < 0.0,
        }
    }

    fn corners(&self, tri: usize) -> [Point3<f64>; 3] {
        self.triangles[tri].map(|v| self.positions[v as usize])
    }

    fn pseudonormal(&self, tri: usize, feature: TriangleFeature) -> Vector3<f64> {
        let t = self.triangles[tri];
        match feature {
            TriangleFeature::Face => self.face_normals[tri],
            TriangleFeature::Vertex(i) => self.vertex_normals[t[usize::from(i)] as usize],
            TriangleFeature::Edge(i) => {
                let i = usize::from(i);
                self.edge_normals
                    .get(&edge_key(t[i], t[(i + 1) % 3]))
                    .copied()
                    .unwrap_or(self.face_normals[tri])
            }
        }
    }
}

#[inline]
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Nearest triangle found so far for one voxel.
#[derive(Clone, Copy)]
struct Nearest {
    dist_sq: f64,
    tri: usize,
    closest: Point3<f64>,
    feature: TriangleFeature,
}

/// Convert a polygon mesh into a narrow-band signed distance grid.
///
/// Every voxel within the band of at least one triangle receives its exact
/// signed distance; the rest of each touched block gets its sign by flood
/// fill, and enclosed empty blocks become interior tiles. Inside is negative.
///
/// Meshes with negative signed volume are treated as inside-out. Empty meshes
/// and meshes whose faces are all malformed or degenerate give an empty grid.
///
/// # Example
///
/// ```
/// use mesh_levelset::{mesh_to_level_set, LevelSetParams};
/// use mesh_types::{box_mesh, Point3};
///
/// let cube = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
/// let params = LevelSetParams::new(0.5, 3.0).unwrap();
/// let grid = mesh_to_level_set(&cube, params);
///
/// assert!(grid.value([4, 4, 4]) < 0.0);
/// assert!(grid.value([12, 4, 4]) > 0.0);
/// assert!(grid.value([8, 4, 4]).abs() < 1e-6);
/// ```
#[must_use]
pub fn mesh_to_level_set(mesh: &PolygonMesh, params: LevelSetParams) -> NarrowBandGrid {
    let mut grid = NarrowBandGrid::new(params);
    if mesh.is_empty() {
        return grid;
    }
    let soup = SignedSoup::build(mesh);
    if soup.triangles.is_empty() {
        debug!("Mesh has no usable triangles, level set is empty");
        return grid;
    }

    let vs = params.voxel_size();
    let band = params.background();
    let band_sq = band * band;
    let mut nearest: HashMap<Coord, Nearest> = HashMap::new();

    for tri in 0..soup.triangles.len() {
        let [a, b, c] = soup.corners(tri);
        let lo = a.inf(&b).inf(&c);
        let hi = a.sup(&b).sup(&c);
        let first = (lo.coords.add_scalar(-band) / vs).map(|x| x.floor() as i32);
        let last = (hi.coords.add_scalar(band) / vs).map(|x| x.ceil() as i32);

        for i in first.x..=last.x {
            for j in first.y..=last.y {
                for k in first.z..=last.z {
                    let ijk = [i, j, k];
                    let p = grid.index_to_world(ijk);
                    let hit = closest_point_on_triangle(&p, &a, &b, &c);
                    let dist_sq = (p - hit.point).norm_squared();
                    if dist_sq >= band_sq {
                        continue;
                    }
                    let candidate = Nearest {
                        dist_sq,
                        tri,
                        closest: hit.point,
                        feature: hit.feature,
                    };
                    nearest
                        .entry(ijk)
                        .and_modify(|n| {
                            if dist_sq < n.dist_sq {
                                *n = candidate;
                            }
                        })
                        .or_insert(candidate);
                }
            }
        }
    }

    for (ijk, n) in &nearest {
        let p = grid.index_to_world(*ijk);
        let normal = soup.pseudonormal(n.tri, n.feature);
        let outside = (p - n.closest).dot(&normal) >= 0.0;
        let outside = outside != soup.inside_out;
        let d = n.dist_sq.sqrt();
        let signed = if outside { d } else { -d };
        grid.set_value(*ijk, signed as f32);
    }
    grid.signed_flood_fill();

    debug!(
        triangles = soup.triangles.len(),
        stamped = nearest.len(),
        leaves = grid.leaf_count(),
        tiles = grid.tile_count(),
        inside_out = soup.inside_out,
        "Rasterized mesh"
    );
    grid
}
