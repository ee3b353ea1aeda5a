//! Morphological operations on narrow-band level sets.
//!
//! Offsetting a signed distance field by a constant moves its zero set along
//! the surface normal. The shifted values are no longer distances, so every
//! offset is followed by a rebuild that re-derives a proper band around the
//! new zero crossing.
//!
//! Erosion moves the surface in half-voxel steps and only lets a voxel leave
//! the interior when that keeps the topology of the inside and the outside.
//! Bodies that the dilation fused therefore stay fused after closing.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use tracing::{debug, info};

use crate::error::{LevelSetError, LevelSetResult};
use crate::grid::{Coord, NarrowBandGrid};
use crate::params::required_half_width;
use crate::rasterize::mesh_to_level_set;
use crate::surface_nets::extract_surface;

/// Index of the centre voxel in a 3×3×3 neighbourhood.
const CENTER: usize = 13;

/// Neighbours sharing a face with the centre.
const FACE_MASK: u32 = neighbours_at(1);

/// Neighbours sharing only a corner with the centre.
const CORNER_MASK: u32 = neighbours_at(3);

/// All 26 neighbours.
const ALL_MASK: u32 = ((1 << 27) - 1) & !(1 << CENTER);

/// Offset of neighbourhood index `n`, laid out as `9x + 3y + z` over `-1..=1`.
const fn neighbour_offset(n: usize) -> Coord {
    [(n / 9) as i32 - 1, (n / 3 % 3) as i32 - 1, (n % 3) as i32 - 1]
}

/// Bit mask of the neighbours at Manhattan distance `d` from the centre.
const fn neighbours_at(d: i32) -> u32 {
    let mut mask = 0;
    let mut n = 0;
    while n < 27 {
        let o = neighbour_offset(n);
        if o[0].abs() + o[1].abs() + o[2].abs() == d {
            mask |= 1 << n;
        }
        n += 1;
    }
    mask
}

/// Grow the surface outward by `distance` world units.
///
/// Leaf values drop by `distance` and are re-clamped to the band; interior
/// tiles and the exterior background keep their sign. Call [`rebuild`]
/// afterwards to restore true distances.
pub fn dilate(grid: &mut NarrowBandGrid, distance: f64) {
    let d = distance as f32;
    grid.map_leaf_values(|v| v - d);
}

/// Shrink the surface inward by `distance` world units without changing
/// its topology.
///
/// The surface moves in steps of at most half a voxel. After each step the
/// voxels that crossed to the outside are released one at a time, farthest
/// out first. A voxel whose release would split the inside, or punch a
/// cavity or tunnel into it, is held just below zero instead. On shapes
/// without such thin necks this is a plain shift of every leaf value.
///
/// Returns the number of voxels still held after the last step. Call
/// [`rebuild`] afterwards to restore true distances.
pub fn erode(grid: &mut NarrowBandGrid, distance: f64) -> usize {
    if !distance.is_finite() || distance <= 0.0 {
        return 0;
    }
    let max_step = 0.5 * grid.voxel_size();
    let mut remaining = distance;
    let mut held = 0;
    while remaining > 0.0 {
        let step = remaining.min(max_step);
        remaining -= step;
        held = erode_step(grid, step as f32);
    }
    held
}

/// One erosion step of `step` world units.
fn erode_step(grid: &mut NarrowBandGrid, step: f32) -> usize {
    let mut crossing: Vec<(Coord, f32)> = grid
        .active_voxels()
        .into_iter()
        .filter_map(|(ijk, v)| (v < 0.0 && v + step >= 0.0).then_some((ijk, v + step)))
        .collect();
    grid.map_leaf_values(|v| v + step);
    for &(ijk, _) in &crossing {
        grid.set_value(ijk, -step);
    }

    crossing.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut held = 0;
    for (ijk, value) in crossing {
        if is_simple(grid, ijk) {
            grid.set_value(ijk, value);
        } else {
            held += 1;
        }
    }
    held
}

/// True if moving inside voxel `ijk` to the outside changes neither the
/// face-connected components of the inside nor the 26-connected components
/// of the outside.
fn is_simple(grid: &NarrowBandGrid, ijk: Coord) -> bool {
    let mut inside = 0u32;
    for n in 0..27 {
        let o = neighbour_offset(n);
        if n != CENTER && grid.value([ijk[0] + o[0], ijk[1] + o[1], ijk[2] + o[2]]) < 0.0 {
            inside |= 1 << n;
        }
    }
    // Inside parts are counted within the 18-neighbourhood, and only those
    // touching a face of the centre.
    let inside_parts = components(inside & !CORNER_MASK, 1)
        .into_iter()
        .filter(|part| part & FACE_MASK != 0)
        .count();
    inside_parts == 1 && components(ALL_MASK & !inside, 3).len() == 1
}

/// Connected components of the neighbourhood voxels in `set`, as masks.
///
/// Two voxels are adjacent when their offsets differ by at most one along
/// each axis and by at most `reach` in total.
fn components(mut set: u32, reach: i32) -> Vec<u32> {
    let mut parts = Vec::new();
    while set != 0 {
        let seed = set.trailing_zeros() as usize;
        let mut part = 1u32 << seed;
        set &= !part;
        let mut stack = vec![seed];
        while let Some(n) = stack.pop() {
            let a = neighbour_offset(n);
            let mut rest = set;
            while rest != 0 {
                let m = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                let b = neighbour_offset(m);
                let d = [0, 1, 2].map(|axis| (a[axis] - b[axis]).abs());
                if d.iter().all(|&c| c <= 1) && d.iter().sum::<i32>() <= reach {
                    part |= 1 << m;
                    set &= !(1 << m);
                    stack.push(m);
                }
            }
        }
        parts.push(part);
    }
    parts
}

/// Rebuild a valid narrow band around the zero crossing of `grid`.
///
/// The zero set is meshed and the mesh rasterized again with the grid's own
/// voxel size and band width.
#[must_use]
pub fn rebuild(grid: &NarrowBandGrid) -> NarrowBandGrid {
    let surface = extract_surface(grid);
    debug!(
        points = surface.point_count(),
        faces = surface.face_count(),
        "Rebuilding band from zero crossing"
    );
    mesh_to_level_set(&surface, grid.params())
}

/// Morphological closing: dilate, rebuild, erode, rebuild.
///
/// Gaps and holes narrower than about twice `distance` are filled while
/// features wider than that keep their shape. Bodies whose dilated surfaces
/// touch end up joined, at least by a thin bridge, since [`erode`] never
/// separates them again. A `distance` of zero or less returns the grid
/// unchanged.
///
/// # Errors
///
/// Returns [`LevelSetError::BandTooNarrow`] if the grid's band cannot hold an
/// offset of `distance` plus the safety margin, and
/// [`LevelSetError::InvalidDistance`] if `distance` is not finite.
///
/// # Example
///
/// ```
/// use mesh_levelset::{close, mesh_to_level_set, LevelSetParams};
/// use mesh_types::{Point3, box_mesh};
///
/// let params = LevelSetParams::for_closing(0.5, 1.0).unwrap();
/// let mut merged = mesh_to_level_set(
///     &box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0)),
///     params,
/// );
/// let right = mesh_to_level_set(
///     &box_mesh(Point3::new(4.5, 0.0, 0.0), Point3::new(8.5, 4.0, 4.0)),
///     params,
/// );
/// mesh_levelset::csg_union(&mut merged, right).unwrap();
/// assert!(merged.value([8, 4, 4]) >= 0.0); // gap at x = 4.25 is open
///
/// let closed = close(merged, 1.0).unwrap();
/// assert!(closed.value([8, 4, 4]) < 0.0); // and now bridged
/// ```
pub fn close(grid: NarrowBandGrid, distance: f64) -> LevelSetResult<NarrowBandGrid> {
    if distance.is_nan() || distance.is_infinite() {
        return Err(LevelSetError::InvalidDistance(distance));
    }
    if distance <= 0.0 {
        return Ok(grid);
    }
    let params = grid.params();
    let required = required_half_width(params.voxel_size(), distance);
    if params.half_width() < required {
        return Err(LevelSetError::BandTooNarrow {
            required,
            actual: params.half_width(),
        });
    }
    if grid.is_empty() {
        return Ok(grid);
    }

    info!(
        distance,
        voxels = distance / params.voxel_size(),
        "Closing gaps"
    );
    let mut grid = grid;
    dilate(&mut grid, distance);
    let mut grid = rebuild(&grid);
    debug!(active = grid.active_voxel_count(), "Dilated");
    let held = erode(&mut grid, distance);
    let grid = rebuild(&grid);
    debug!(active = grid.active_voxel_count(), held, "Eroded");
    Ok(grid)
}
