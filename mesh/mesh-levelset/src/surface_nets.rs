//! Surface extraction by dual contouring of sign changes (surface nets).
//!
//! A cell is the cube between eight neighbouring voxels. The crossed edges
//! of a cell are joined into surface pieces along its faces, and each piece
//! gets one vertex at the mean of its interpolated crossings. On a face with
//! two diagonal inside corners the corners are kept apart, so inside voxels
//! connect only through shared faces. Every voxel edge crossing the iso value
//! gets one quad joining the four cells around it. On a closed band the
//! result is a closed quad mesh in which every edge joins exactly two faces.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use hashbrown::HashMap;
use mesh_types::{Point3, SurfaceData};
use tracing::debug;

use crate::grid::{BLOCK_DIM, BLOCK_LOG2, Block, Coord, NarrowBandGrid};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for surface extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceNetsConfig {
    /// Field value of the extracted surface.
    pub iso_value: f32,
    /// Split every quad into two triangles along its shorter diagonal.
    pub split_quads: bool,
}

impl Default for SurfaceNetsConfig {
    fn default() -> Self {
        Self {
            iso_value: 0.0,
            split_quads: false,
        }
    }
}

impl SurfaceNetsConfig {
    /// Emit triangles instead of quads.
    #[must_use]
    pub const fn triangulated() -> Self {
        Self {
            iso_value: 0.0,
            split_quads: true,
        }
    }

    /// Set the iso value.
    #[must_use]
    pub const fn with_iso_value(mut self, iso_value: f32) -> Self {
        self.iso_value = iso_value;
        self
    }

    /// Enable or disable quad splitting.
    #[must_use]
    pub const fn with_split_quads(mut self, split_quads: bool) -> Self {
        self.split_quads = split_quads;
        self
    }
}

/// Cell corner offsets, bit `a` of the index selects `+1` along axis `a`.
const CORNERS: [Coord; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// The twelve cell edges as corner index pairs.
const CELL_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Corners of each cell face in cyclic order, and the face edges: edge `k`
/// joins corner `k` to corner `k + 1`.
const CELL_FACES: [([usize; 4], [usize; 4]); 6] = [
    ([0, 2, 6, 4], [4, 10, 6, 8]),
    ([1, 3, 7, 5], [5, 11, 7, 9]),
    ([0, 4, 5, 1], [8, 2, 9, 0]),
    ([2, 6, 7, 3], [10, 3, 11, 1]),
    ([0, 1, 3, 2], [0, 5, 1, 4]),
    ([4, 5, 7, 6], [2, 7, 3, 6]),
];

/// Marks a cell edge without a crossing.
const NO_VERTEX: u32 = u32::MAX;

/// For an edge along axis `a`, the two axes spanning the quad around it,
/// ordered so that `u × v = a`.
const QUAD_AXES: [(usize, usize); 3] = [(1, 2), (2, 0), (0, 1)];

#[inline]
fn add(a: Coord, b: Coord) -> Coord {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
fn unit(axis: usize) -> Coord {
    let mut c = [0; 3];
    c[axis] = 1;
    c
}

/// Extract the zero iso-surface as outward-facing quads.
///
/// # Example
///
/// ```
/// use mesh_levelset::{extract_surface, mesh_to_level_set, LevelSetParams};
/// use mesh_types::{box_mesh, Point3};
///
/// let cube = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0));
/// let grid = mesh_to_level_set(&cube, LevelSetParams::new(0.5, 3.0).unwrap());
/// let surface = extract_surface(&grid);
///
/// assert!(surface.face_vertex_counts.iter().all(|&c| c == 4));
/// // Outward winding; sharp edges come out bevelled by up to half a voxel.
/// let volume = surface.signed_volume();
/// assert!(volume > 18.0 && volume <= 27.0);
/// ```
#[must_use]
pub fn extract_surface(grid: &NarrowBandGrid) -> SurfaceData {
    extract_surface_with(grid, &SurfaceNetsConfig::default())
}

/// Extract an iso-surface with explicit configuration.
///
/// Faces wind counter-clockwise seen from the side where the field is above
/// the iso value, so normals point outward. Output order depends only on the
/// field, never on hash order.
#[must_use]
pub fn extract_surface_with(grid: &NarrowBandGrid, config: &SurfaceNetsConfig) -> SurfaceData {
    let iso = config.iso_value;
    let leaves = grid.sorted_leaf_blocks();
    let inside = |ijk: Coord| grid.value(ijk) < iso;

    let mut surface = SurfaceData::new();
    let mut cell_vertices: HashMap<Coord, [u32; 12]> = HashMap::new();

    for_each_leaf_voxel(grid, &leaves, |cell| {
        if let Some(vertices) = cell_vertices_at(grid, cell, iso, &mut surface.points) {
            cell_vertices.insert(cell, vertices);
        }
    });

    let mut missing = 0usize;
    for_each_leaf_voxel(grid, &leaves, |p| {
        let p_inside = inside(p);
        for (axis, &(u, v)) in QUAD_AXES.iter().enumerate() {
            if p_inside == inside(add(p, unit(axis))) {
                continue;
            }
            let Some(quad) = lookup_quad(&cell_vertices, p, axis, u, v) else {
                missing += 1;
                continue;
            };
            let quad = if p_inside {
                quad
            } else {
                [quad[0], quad[3], quad[2], quad[1]]
            };
            push_quad(&mut surface, quad, config.split_quads);
        }
    });

    if missing > 0 {
        debug!(missing, "Skipped crossings at the edge of the band");
    }
    debug!(
        points = surface.point_count(),
        faces = surface.face_count(),
        iso = f64::from(iso),
        "Extracted surface"
    );
    surface
}

/// Visit every voxel of every leaf, leaves in sorted order.
fn for_each_leaf_voxel(grid: &NarrowBandGrid, leaves: &[Coord], mut f: impl FnMut(Coord)) {
    for key in leaves {
        if !matches!(grid.blocks.get(key), Some(Block::Leaf(_))) {
            continue;
        }
        let origin = key.map(|c| c << BLOCK_LOG2);
        for x in 0..BLOCK_DIM {
            for y in 0..BLOCK_DIM {
                for z in 0..BLOCK_DIM {
                    f([origin[0] + x, origin[1] + y, origin[2] + z]);
                }
            }
        }
    }
}

/// Place the vertices of the cell with minimum corner `cell` in `points`.
///
/// Returns, for each of the twelve cell edges, the index of the vertex of
/// the surface piece crossing it, or `None` if the cell has no crossing.
fn cell_vertices_at(
    grid: &NarrowBandGrid,
    cell: Coord,
    iso: f32,
    points: &mut Vec<Point3<f32>>,
) -> Option<[u32; 12]> {
    let values = CORNERS.map(|c| grid.value(add(cell, c)));
    let inside = values.map(|v| v < iso);
    if inside.iter().all(|&b| b) || !inside.iter().any(|&b| b) {
        return None;
    }
    let crossed = CELL_EDGES.map(|(a, b)| inside[a] != inside[b]);

    let mut pieces = EdgeSets::new();
    for (corners, edges) in &CELL_FACES {
        let mut hits = edges.iter().copied().filter(|&e| crossed[e]);
        match (hits.next(), hits.next(), hits.next()) {
            (Some(a), Some(b), None) => pieces.join(a, b),
            (Some(_), Some(_), Some(_)) => {
                // Cut around each of the two diagonal inside corners.
                let k = usize::from(!inside[corners[0]]);
                pieces.join(edges[(k + 3) % 4], edges[k]);
                pieces.join(edges[k + 1], edges[k + 2]);
            }
            _ => {}
        }
    }

    let mut sums = [[0.0f64; 4]; 12];
    for (edge, &(a, b)) in CELL_EDGES.iter().enumerate() {
        if !crossed[edge] {
            continue;
        }
        let (va, vb) = (values[a], values[b]);
        let t = f64::from((iso - va) / (vb - va)).clamp(0.0, 1.0);
        let sum = &mut sums[pieces.find(edge)];
        for axis in 0..3 {
            let ca = f64::from(CORNERS[a][axis]);
            let cb = f64::from(CORNERS[b][axis]);
            sum[axis] += ca + (cb - ca) * t;
        }
        sum[3] += 1.0;
    }

    let vs = grid.voxel_size();
    let mut piece_vertex = [NO_VERTEX; 12];
    let mut vertices = [NO_VERTEX; 12];
    for edge in (0..12).filter(|&e| crossed[e]) {
        let root = pieces.find(edge);
        if piece_vertex[root] == NO_VERTEX {
            let sum = sums[root];
            let world = |axis: usize| ((f64::from(cell[axis]) + sum[axis] / sum[3]) * vs) as f32;
            piece_vertex[root] = u32::try_from(points.len()).unwrap_or(NO_VERTEX);
            points.push(Point3::new(world(0), world(1), world(2)));
        }
        vertices[edge] = piece_vertex[root];
    }
    Some(vertices)
}

/// Disjoint sets over the twelve edges of a cell.
struct EdgeSets([usize; 12]);

impl EdgeSets {
    fn new() -> Self {
        Self(std::array::from_fn(|e| e))
    }

    fn find(&mut self, mut e: usize) -> usize {
        while self.0[e] != e {
            self.0[e] = self.0[self.0[e]];
            e = self.0[e];
        }
        e
    }

    fn join(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        self.0[ra.max(rb)] = ra.min(rb);
    }
}

/// Index into `CELL_EDGES` of the edge leaving `corner` along `axis`.
fn edge_from(corner: usize, axis: usize) -> Option<usize> {
    CELL_EDGES
        .iter()
        .position(|&(a, b)| a == corner && b == corner | (1 << axis))
}

/// Vertices of the quad around the voxel edge from `p` along `axis`.
///
/// The four cells are visited in the order `p`, `p - u`, `p - u - v`,
/// `p - v`; in each, the edge starts at the corner matching `p`.
fn lookup_quad(
    cell_vertices: &HashMap<Coord, [u32; 12]>,
    p: Coord,
    axis: usize,
    u: usize,
    v: usize,
) -> Option<[u32; 4]> {
    let mut du = [0; 3];
    du[u] = -1;
    let mut dv = [0; 3];
    dv[v] = -1;
    let (bu, bv) = (1 << u, 1 << v);
    let cells = [
        (p, 0),
        (add(p, du), bu),
        (add(add(p, du), dv), bu | bv),
        (add(p, dv), bv),
    ];

    let mut quad = [NO_VERTEX; 4];
    for (slot, (cell, corner)) in quad.iter_mut().zip(cells) {
        let vertex = cell_vertices.get(&cell)?[edge_from(corner, axis)?];
        if vertex == NO_VERTEX {
            return None;
        }
        *slot = vertex;
    }
    Some(quad)
}

fn push_quad(surface: &mut SurfaceData, quad: [u32; 4], split: bool) {
    if !split {
        surface.push_face(&quad);
        return;
    }
    let p = |i: usize| surface.points[quad[i] as usize];
    let d02 = (p(2) - p(0)).norm_squared();
    let d13 = (p(3) - p(1)).norm_squared();
    if d02 <= d13 {
        surface.push_face(&[quad[0], quad[1], quad[2]]);
        surface.push_face(&[quad[0], quad[2], quad[3]]);
    } else {
        surface.push_face(&[quad[0], quad[1], quad[3]]);
        surface.push_face(&[quad[1], quad[2], quad[3]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::LevelSetParams;
    use approx::assert_relative_eq;
    use std::collections::HashMap as StdHashMap;

    fn sphere_grid(radius: f64) -> NarrowBandGrid {
        let params = LevelSetParams::new(0.25, 3.0).unwrap();
        let r = (radius / 0.25).ceil() as i32 + 5;
        NarrowBandGrid::from_fn(params, [-r; 3], [r; 3], |p| p.coords.norm() - radius)
    }

    fn edge_uses(surface: &SurfaceData) -> StdHashMap<(u32, u32), i32> {
        let mut uses = StdHashMap::new();
        for face in surface.faces() {
            for i in 0..face.len() {
                let (a, b) = (face[i], face[(i + 1) % face.len()]);
                *uses.entry((a, b)).or_insert(0) += 1;
            }
        }
        uses
    }

    #[test]
    fn empty_grid_gives_empty_surface() {
        let grid = NarrowBandGrid::new(LevelSetParams::new(0.5, 3.0).unwrap());
        let surface = extract_surface(&grid);
        assert!(surface.is_empty());
        assert_eq!(surface.point_count(), 0);
    }

    #[test]
    fn sphere_is_closed_and_oriented() {
        let surface = extract_surface(&sphere_grid(2.0));
        assert!(surface.is_consistent());
        assert_closed(&surface);
    }

    #[test]
    fn sphere_points_lie_near_radius() {
        let surface = extract_surface(&sphere_grid(2.0));
        for p in &surface.points {
            let r = f64::from(p.coords.norm());
            assert!((r - 2.0).abs() < 0.25 * 0.5, "point at radius {r}");
        }
    }

    #[test]
    fn sphere_volume_is_positive_and_close() {
        let surface = extract_surface(&sphere_grid(2.0));
        let expected = 4.0 / 3.0 * std::f64::consts::PI * 8.0;
        let volume = surface.signed_volume();
        assert!(volume > 0.0);
        assert_relative_eq!(volume, expected, max_relative = 0.05);
    }

    #[test]
    fn split_quads_produces_triangles_with_same_volume() {
        let grid = sphere_grid(1.5);
        let quads = extract_surface(&grid);
        let tris = extract_surface_with(&grid, &SurfaceNetsConfig::triangulated());
        assert_eq!(tris.face_count(), quads.face_count() * 2);
        assert!(tris.face_vertex_counts.iter().all(|&c| c == 3));
        assert_eq!(tris.points, quads.points);
        assert_relative_eq!(tris.signed_volume(), quads.signed_volume(), max_relative = 0.02);
    }

    #[test]
    fn iso_value_shifts_surface() {
        let grid = sphere_grid(2.0);
        let config = SurfaceNetsConfig::default().with_iso_value(0.25);
        let surface = extract_surface_with(&grid, &config);
        let mean = surface
            .points
            .iter()
            .map(|p| f64::from(p.coords.norm()))
            .sum::<f64>()
            / surface.point_count() as f64;
        assert!((mean - 2.25).abs() < 0.1, "mean radius {mean}");
    }

    /// Grid with `-0.5` at each voxel in `inside`, outside everywhere else.
    fn voxel_grid(inside: &[Coord]) -> NarrowBandGrid {
        let mut grid = NarrowBandGrid::new(LevelSetParams::new(1.0, 3.0).unwrap());
        for &ijk in inside {
            grid.set_value(ijk, -0.5);
        }
        grid
    }

    fn assert_closed(surface: &SurfaceData) {
        let uses = edge_uses(surface);
        for (&(a, b), &n) in &uses {
            assert_eq!(n, 1, "directed edge {a}->{b} used {n} times");
            assert_eq!(uses.get(&(b, a)), Some(&1), "edge {a}-{b} has no twin");
        }
    }

    #[test]
    fn diagonal_inside_voxels_get_separate_shells() {
        // Diagonal across a face, then across the cell body.
        for q in [[4, 4, 3], [4, 4, 4]] {
            let surface = extract_surface(&voxel_grid(&[[3, 3, 3], q]));
            assert_eq!(surface.face_count(), 12, "neighbour {q:?}");
            // Eight cells per voxel; shared cells hold one vertex per shell.
            assert_eq!(surface.point_count(), 16, "neighbour {q:?}");
            assert_closed(&surface);
            assert!(surface.signed_volume() > 0.0);
        }
    }

    #[test]
    fn face_neighbours_share_one_shell() {
        let surface = extract_surface(&voxel_grid(&[[3, 3, 3], [4, 3, 3]]));
        assert_eq!(surface.face_count(), 10);
        assert_eq!(surface.point_count(), 12);
        assert_closed(&surface);
    }

    #[test]
    fn checkerboard_face_with_deep_inside_corners_is_manifold() {
        // The face centre reads inside here, but the corners still stay apart.
        let mut grid = NarrowBandGrid::new(LevelSetParams::new(1.0, 3.0).unwrap());
        for j in 2..=5 {
            for k in 2..=5 {
                grid.set_value([3, j, k], 0.1);
            }
        }
        grid.set_value([3, 3, 3], -2.9);
        grid.set_value([3, 4, 4], -2.9);
        let surface = extract_surface(&grid);
        assert_eq!(surface.point_count(), 16);
        assert_closed(&surface);
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = extract_surface(&sphere_grid(1.75));
        let b = extract_surface(&sphere_grid(1.75));
        assert_eq!(a, b);
    }
}
