//! Sparse narrow-band signed distance grid.
//!
//! Space is divided into blocks of 8×8×8 voxels. Blocks near the surface are
//! stored densely as leaves; blocks entirely inside the surface collapse to
//! interior tiles; everything else is absent and reads as the positive
//! background value.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::collections::VecDeque;

use hashbrown::HashMap;
use nalgebra::Point3;

use crate::params::LevelSetParams;

/// Integer voxel coordinate `[i, j, k]`.
pub type Coord = [i32; 3];

/// Log2 of the block edge length.
pub const BLOCK_LOG2: i32 = 3;
/// Voxels along one block edge.
pub const BLOCK_DIM: i32 = 1 << BLOCK_LOG2;
/// Voxels in one block.
pub const BLOCK_VOXELS: usize = (BLOCK_DIM * BLOCK_DIM * BLOCK_DIM) as usize;

const BLOCK_MASK: i32 = BLOCK_DIM - 1;

const NEIGHBORS_6: [Coord; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// Block coordinate containing voxel `ijk`.
#[inline]
#[must_use]
pub const fn block_of(ijk: Coord) -> Coord {
    [
        ijk[0] >> BLOCK_LOG2,
        ijk[1] >> BLOCK_LOG2,
        ijk[2] >> BLOCK_LOG2,
    ]
}

/// Offset of voxel `ijk` inside its block's value array.
#[inline]
const fn local_offset(ijk: Coord) -> usize {
    let x = (ijk[0] & BLOCK_MASK) as usize;
    let y = (ijk[1] & BLOCK_MASK) as usize;
    let z = (ijk[2] & BLOCK_MASK) as usize;
    (x << (2 * BLOCK_LOG2)) | (y << BLOCK_LOG2) | z
}

/// Local coordinate of a value-array offset.
#[inline]
const fn local_coord(offset: usize) -> Coord {
    let m = BLOCK_MASK as usize;
    [
        ((offset >> (2 * BLOCK_LOG2)) & m) as i32,
        ((offset >> BLOCK_LOG2) & m) as i32,
        (offset & m) as i32,
    ]
}

/// Dense 8³ block of distance values with an active-voxel mask.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Leaf {
    pub(crate) values: [f32; BLOCK_VOXELS],
    active: [u64; BLOCK_VOXELS / 64],
}

impl Leaf {
    fn filled(value: f32) -> Self {
        Self {
            values: [value; BLOCK_VOXELS],
            active: [0; BLOCK_VOXELS / 64],
        }
    }

    #[inline]
    pub(crate) const fn is_active(&self, offset: usize) -> bool {
        self.active[offset >> 6] & (1 << (offset & 63)) != 0
    }

    #[inline]
    fn set_active(&mut self, offset: usize, on: bool) {
        if on {
            self.active[offset >> 6] |= 1 << (offset & 63);
        } else {
            self.active[offset >> 6] &= !(1 << (offset & 63));
        }
    }

    fn active_count(&self) -> usize {
        self.active.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Store `value` (already clamped) and update the mask.
    #[inline]
    pub(crate) fn store(&mut self, offset: usize, value: f32, background: f32) {
        self.values[offset] = value;
        self.set_active(offset, value.abs() < background);
    }
}

/// One 8³ block of the grid.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    /// Voxel data near the surface.
    Leaf(Box<Leaf>),
    /// Uniform interior region at `-background`.
    Tile,
}

/// Sparse signed distance field restricted to a band around the surface.
///
/// Values are clamped to `[-background, background]`. A voxel is active when
/// its magnitude is strictly below the background; active voxels carry true
/// signed distances, inactive voxels only their sign. Negative is inside.
///
/// Voxel `(i, j, k)` sits at world position `(i, j, k) * voxel_size`.
///
/// # Example
///
/// ```
/// use mesh_levelset::{LevelSetParams, NarrowBandGrid};
///
/// let params = LevelSetParams::new(0.5, 3.0).unwrap();
/// let mut grid = NarrowBandGrid::new(params);
/// assert!(grid.is_empty());
///
/// grid.set_value([0, 0, 0], -0.2);
/// assert!(grid.is_active([0, 0, 0]));
/// assert!((grid.value([0, 0, 0]) + 0.2).abs() < 1e-6);
///
/// // Far away from any block the grid reads as outside.
/// assert!((grid.value([100, 0, 0]) - 1.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct NarrowBandGrid {
    params: LevelSetParams,
    background: f32,
    pub(crate) blocks: HashMap<Coord, Block>,
}

impl NarrowBandGrid {
    /// Create an empty grid: every voxel reads as `+background`.
    #[must_use]
    pub fn new(params: LevelSetParams) -> Self {
        Self {
            params,
            background: params.background() as f32,
            blocks: HashMap::new(),
        }
    }

    /// Sample an analytic signed distance function over the voxel box
    /// `[min, max]` (inclusive).
    ///
    /// Only samples inside the band are stored; signs elsewhere are restored
    /// by [`signed_flood_fill`](Self::signed_flood_fill). The box must enclose
    /// the zero set with at least a band's margin.
    ///
    /// ```
    /// use mesh_levelset::{LevelSetParams, NarrowBandGrid};
    ///
    /// let params = LevelSetParams::new(0.25, 3.0).unwrap();
    /// let sphere = |p: mesh_types::Point3<f64>| p.coords.norm() - 2.0;
    /// let grid = NarrowBandGrid::from_fn(params, [-14; 3], [14; 3], sphere);
    ///
    /// assert!(grid.value([0, 0, 0]) < 0.0);
    /// assert!(grid.value([13, 0, 0]) > 0.0);
    /// ```
    #[must_use]
    pub fn from_fn<F>(params: LevelSetParams, min: Coord, max: Coord, f: F) -> Self
    where
        F: Fn(Point3<f64>) -> f64,
    {
        let mut grid = Self::new(params);
        let bg = params.background();
        for i in min[0]..=max[0] {
            for j in min[1]..=max[1] {
                for k in min[2]..=max[2] {
                    let d = f(grid.index_to_world([i, j, k]));
                    if d.abs() < bg {
                        grid.set_value([i, j, k], d as f32);
                    }
                }
            }
        }
        grid.signed_flood_fill();
        grid
    }

    /// Voxel size and band of this grid.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> LevelSetParams {
        self.params
    }

    /// Edge length of a voxel in world units.
    #[inline]
    #[must_use]
    pub const fn voxel_size(&self) -> f64 {
        self.params.voxel_size()
    }

    /// Background magnitude (band half-width in world units).
    #[inline]
    #[must_use]
    pub const fn background(&self) -> f32 {
        self.background
    }

    /// True if the grid has no leaves and no tiles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of dense leaf blocks.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.blocks
            .values()
            .filter(|b| matches!(b, Block::Leaf(_)))
            .count()
    }

    /// Number of interior tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.blocks
            .values()
            .filter(|b| matches!(b, Block::Tile))
            .count()
    }

    /// Number of active voxels.
    #[must_use]
    pub fn active_voxel_count(&self) -> usize {
        self.blocks
            .values()
            .map(|b| match b {
                Block::Leaf(leaf) => leaf.active_count(),
                Block::Tile => 0,
            })
            .sum()
    }

    /// Signed distance at voxel `ijk`.
    #[must_use]
    pub fn value(&self, ijk: Coord) -> f32 {
        match self.blocks.get(&block_of(ijk)) {
            Some(Block::Leaf(leaf)) => leaf.values[local_offset(ijk)],
            Some(Block::Tile) => -self.background,
            None => self.background,
        }
    }

    /// True if voxel `ijk` is inside the band.
    #[must_use]
    pub fn is_active(&self, ijk: Coord) -> bool {
        match self.blocks.get(&block_of(ijk)) {
            Some(Block::Leaf(leaf)) => leaf.is_active(local_offset(ijk)),
            _ => false,
        }
    }

    /// Write a signed distance, clamping it to the band.
    ///
    /// Allocates a leaf if needed; a leaf created inside an interior tile
    /// starts out filled with `-background`. NaN is ignored.
    pub fn set_value(&mut self, ijk: Coord, value: f32) {
        if value.is_nan() {
            return;
        }
        let bg = self.background;
        let block = self
            .blocks
            .entry(block_of(ijk))
            .or_insert_with(|| Block::Leaf(Box::new(Leaf::filled(bg))));
        if matches!(block, Block::Tile) {
            *block = Block::Leaf(Box::new(Leaf::filled(-bg)));
        }
        if let Block::Leaf(leaf) = block {
            leaf.store(local_offset(ijk), value.clamp(-bg, bg), bg);
        }
    }

    /// World position of voxel `ijk`.
    #[inline]
    #[must_use]
    pub fn index_to_world(&self, ijk: Coord) -> Point3<f64> {
        let vs = self.voxel_size();
        Point3::new(
            f64::from(ijk[0]) * vs,
            f64::from(ijk[1]) * vs,
            f64::from(ijk[2]) * vs,
        )
    }

    /// Inclusive voxel bounds of all stored blocks, or `None` if empty.
    #[must_use]
    pub fn index_bounds(&self) -> Option<(Coord, Coord)> {
        let mut keys = self.blocks.keys();
        let first = *keys.next()?;
        let (lo, hi) = keys.fold((first, first), |(mut lo, mut hi), b| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(b[axis]);
                hi[axis] = hi[axis].max(b[axis]);
            }
            (lo, hi)
        });
        Some((
            lo.map(|c| c << BLOCK_LOG2),
            hi.map(|c| (c << BLOCK_LOG2) + BLOCK_MASK),
        ))
    }

    /// Block coordinates of all leaves, sorted.
    pub(crate) fn sorted_leaf_blocks(&self) -> Vec<Coord> {
        let mut keys: Vec<Coord> = self
            .blocks
            .iter()
            .filter_map(|(k, b)| matches!(b, Block::Leaf(_)).then_some(*k))
            .collect();
        keys.sort_unstable();
        keys
    }

    /// All active voxels with their values, sorted by coordinate.
    #[must_use]
    pub fn active_voxels(&self) -> Vec<(Coord, f32)> {
        let mut out = Vec::with_capacity(self.active_voxel_count());
        for key in self.sorted_leaf_blocks() {
            let Some(Block::Leaf(leaf)) = self.blocks.get(&key) else {
                continue;
            };
            let origin = key.map(|c| c << BLOCK_LOG2);
            for offset in 0..BLOCK_VOXELS {
                if leaf.is_active(offset) {
                    let l = local_coord(offset);
                    let ijk = [origin[0] + l[0], origin[1] + l[1], origin[2] + l[2]];
                    out.push((ijk, leaf.values[offset]));
                }
            }
        }
        out.sort_unstable_by_key(|(ijk, _)| *ijk);
        out
    }

    /// Apply `f` to every leaf value, re-clamping and refreshing the mask.
    ///
    /// Tiles and absent blocks are untouched, so they keep their sign.
    pub(crate) fn map_leaf_values(&mut self, f: impl Fn(f32) -> f32) {
        let bg = self.background;
        for block in self.blocks.values_mut() {
            if let Block::Leaf(leaf) = block {
                for offset in 0..BLOCK_VOXELS {
                    let v = f(leaf.values[offset]).clamp(-bg, bg);
                    leaf.store(offset, v, bg);
                }
            }
        }
    }

    /// Drop leaves without active voxels.
    ///
    /// Interior leaves become tiles; exterior leaves are removed.
    pub fn prune(&mut self) {
        self.blocks.retain(|_, block| {
            let Block::Leaf(leaf) = block else {
                return true;
            };
            if leaf.active_count() > 0 {
                return true;
            }
            let inside = leaf.values[0] < 0.0;
            if inside {
                *block = Block::Tile;
            }
            inside
        });
    }

    /// Propagate inside/outside signs to every inactive voxel.
    ///
    /// Within each leaf, inactive voxels take the sign of the nearest active
    /// voxel (breadth-first over face neighbours). Between leaves, empty
    /// blocks on an x-row bracketed by two leaves whose facing voxels are
    /// inside become interior tiles.
    pub fn signed_flood_fill(&mut self) {
        let bg = self.background;
        for block in self.blocks.values_mut() {
            if let Block::Leaf(leaf) = block {
                flood_leaf(leaf, bg);
            }
        }
        self.fill_interior_tiles();
    }

    fn fill_interior_tiles(&mut self) {
        let mut rows: HashMap<[i32; 2], Vec<i32>> = HashMap::new();
        for (key, block) in &self.blocks {
            if matches!(block, Block::Leaf(_)) {
                rows.entry([key[1], key[2]]).or_default().push(key[0]);
            }
        }

        let last = BLOCK_DIM - 1;
        let mut tiles = Vec::new();
        for ([by, bz], mut xs) in rows {
            xs.sort_unstable();
            for pair in xs.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if b - a < 2 {
                    continue;
                }
                let (Some(Block::Leaf(left)), Some(Block::Leaf(right))) =
                    (self.blocks.get(&[a, by, bz]), self.blocks.get(&[b, by, bz]))
                else {
                    continue;
                };
                let left_face = left.values[local_offset([last, 0, 0])];
                let right_face = right.values[local_offset([0, 0, 0])];
                if left_face < 0.0 && right_face < 0.0 {
                    tiles.extend((a + 1..b).map(|x| [x, by, bz]));
                }
            }
        }
        for key in tiles {
            self.blocks.entry(key).or_insert(Block::Tile);
        }
    }
}

/// Breadth-first sign propagation from active voxels inside one leaf.
fn flood_leaf(leaf: &mut Leaf, background: f32) {
    let mut visited = [false; BLOCK_VOXELS];
    let mut queue = VecDeque::new();
    for (offset, seen) in visited.iter_mut().enumerate() {
        if leaf.is_active(offset) {
            *seen = true;
            queue.push_back(offset);
        }
    }
    if queue.is_empty() {
        return;
    }

    while let Some(offset) = queue.pop_front() {
        let inside = leaf.values[offset] < 0.0;
        let l = local_coord(offset);
        for d in NEIGHBORS_6 {
            let n = [l[0] + d[0], l[1] + d[1], l[2] + d[2]];
            if n.iter().any(|&c| !(0..BLOCK_DIM).contains(&c)) {
                continue;
            }
            let next = local_offset(n);
            if visited[next] {
                continue;
            }
            visited[next] = true;
            let value = if inside { -background } else { background };
            leaf.store(next, value, background);
            queue.push_back(next);
        }
    }
}
