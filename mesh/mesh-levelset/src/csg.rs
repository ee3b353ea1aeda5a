//! Boolean union of level sets.
//!
//! The union of two signed distance fields is their pointwise minimum. This is
//! exact outside both operands. Inside, near the seam where the operands
//! intersect, an operand's nearest surface may be buried in the other one, so
//! the stored depth can fall short of the distance to the merged surface. The
//! sign, and with it the zero set, is always right.

use hashbrown::hash_map::Entry;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{LevelSetError, LevelSetResult};
use crate::grid::{BLOCK_VOXELS, Block, NarrowBandGrid};
use crate::params::LevelSetParams;

fn check_compatible(a: LevelSetParams, b: LevelSetParams) -> LevelSetResult<()> {
    if a == b {
        Ok(())
    } else {
        Err(LevelSetError::IncompatibleGrids {
            left_voxel_size: a.voxel_size(),
            right_voxel_size: b.voxel_size(),
            left_half_width: a.half_width(),
            right_half_width: b.half_width(),
        })
    }
}

/// Merge `other` into `target` so that `target` becomes the union of both.
///
/// Blocks present in only one operand are taken as they are. Interior tiles
/// absorb whatever they overlap. Overlapping leaves keep the smaller value per
/// voxel. Leaves left without active voxels are pruned.
///
/// # Errors
///
/// Returns [`LevelSetError::IncompatibleGrids`] if the grids differ in voxel
/// size or band half-width. `target` is unchanged in that case.
///
/// # Example
///
/// ```
/// use mesh_levelset::{csg_union, mesh_to_level_set, LevelSetParams};
/// use mesh_types::{Point3, box_mesh};
///
/// let params = LevelSetParams::new(0.5, 3.0).unwrap();
/// let a = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
/// let b = box_mesh(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 2.0, 2.0));
///
/// let mut merged = mesh_to_level_set(&a, params);
/// csg_union(&mut merged, mesh_to_level_set(&b, params)).unwrap();
///
/// assert!(merged.value([1, 2, 2]) < 0.0);
/// assert!(merged.value([5, 2, 2]) < 0.0);
/// ```
pub fn csg_union(target: &mut NarrowBandGrid, other: NarrowBandGrid) -> LevelSetResult<()> {
    check_compatible(target.params(), other.params())?;
    let bg = target.background();

    for (key, incoming) in other.blocks {
        match target.blocks.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => merge_block(slot.get_mut(), incoming, bg),
        }
    }
    target.prune();
    Ok(())
}

fn merge_block(existing: &mut Block, incoming: Block, background: f32) {
    match (existing, incoming) {
        (Block::Tile, _) => {}
        (existing, Block::Tile) => *existing = Block::Tile,
        (Block::Leaf(ours), Block::Leaf(theirs)) => {
            for offset in 0..BLOCK_VOXELS {
                let v = ours.values[offset].min(theirs.values[offset]);
                ours.store(offset, v, background);
            }
        }
    }
}

/// Union of any number of grids sharing `params`.
///
/// With `parallel` set, pairs are merged level by level on the rayon pool;
/// otherwise grids are folded left to right. Both orders give the same field.
/// An empty list yields an empty grid.
///
/// # Errors
///
/// Returns [`LevelSetError::IncompatibleGrids`] if any grid was built with
/// different parameters.
pub fn union_all(
    params: LevelSetParams,
    grids: Vec<NarrowBandGrid>,
    parallel: bool,
) -> LevelSetResult<NarrowBandGrid> {
    for grid in &grids {
        check_compatible(params, grid.params())?;
    }
    let count = grids.len();
    let merged = if parallel {
        tree_reduce_parallel(grids)?
    } else {
        fold_sequential(grids)?
    };
    let merged = merged.unwrap_or_else(|| NarrowBandGrid::new(params));
    debug!(
        grids = count,
        leaves = merged.leaf_count(),
        tiles = merged.tile_count(),
        active = merged.active_voxel_count(),
        "Merged level sets"
    );
    Ok(merged)
}

fn fold_sequential(grids: Vec<NarrowBandGrid>) -> LevelSetResult<Option<NarrowBandGrid>> {
    let mut iter = grids.into_iter();
    let Some(mut acc) = iter.next() else {
        return Ok(None);
    };
    for grid in iter {
        csg_union(&mut acc, grid)?;
    }
    Ok(Some(acc))
}

fn tree_reduce_parallel(mut grids: Vec<NarrowBandGrid>) -> LevelSetResult<Option<NarrowBandGrid>> {
    while grids.len() > 1 {
        let mut pairs = Vec::with_capacity(grids.len().div_ceil(2));
        let mut iter = grids.into_iter();
        while let Some(left) = iter.next() {
            pairs.push((left, iter.next()));
        }

        grids = pairs
            .into_par_iter()
            .map(|(mut left, right)| -> LevelSetResult<NarrowBandGrid> {
                if let Some(right) = right {
                    csg_union(&mut left, right)?;
                }
                Ok(left)
            })
            .collect::<LevelSetResult<Vec<_>>>()?;
    }
    Ok(grids.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::mesh_to_level_set;
    use mesh_types::{Point3, box_mesh};

    fn params() -> LevelSetParams {
        LevelSetParams::new(0.5, 3.0).unwrap()
    }

    fn cube_at(x: f32) -> NarrowBandGrid {
        let mesh = box_mesh(Point3::new(x, 0.0, 0.0), Point3::new(x + 3.0, 3.0, 3.0));
        mesh_to_level_set(&mesh, params())
    }

    #[test]
    fn union_is_pointwise_min() {
        let a = cube_at(0.0);
        let b = cube_at(2.0);
        let mut u = a.clone();
        csg_union(&mut u, b.clone()).unwrap();

        for ijk in [[0, 3, 3], [3, 3, 3], [5, 3, 3], [9, 3, 3], [12, 3, 3], [-4, 3, 3]] {
            let expected = a.value(ijk).min(b.value(ijk));
            assert!((u.value(ijk) - expected).abs() < 1e-6, "voxel {ijk:?}");
        }
    }

    #[test]
    fn disjoint_union_keeps_both() {
        let a = cube_at(0.0);
        let b = cube_at(20.0);
        let mut u = a.clone();
        csg_union(&mut u, b.clone()).unwrap();
        assert_eq!(
            u.active_voxel_count(),
            a.active_voxel_count() + b.active_voxel_count()
        );
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = cube_at(0.0);
        let mut u = a.clone();
        csg_union(&mut u, NarrowBandGrid::new(params())).unwrap();
        assert_eq!(u.active_voxels(), a.active_voxels());

        let mut e = NarrowBandGrid::new(params());
        csg_union(&mut e, a.clone()).unwrap();
        assert_eq!(e.active_voxels(), a.active_voxels());
    }

    #[test]
    fn mismatched_params_rejected() {
        let mut a = cube_at(0.0);
        let other = NarrowBandGrid::new(LevelSetParams::new(0.25, 3.0).unwrap());
        let before = a.active_voxel_count();
        assert!(matches!(
            csg_union(&mut a, other),
            Err(LevelSetError::IncompatibleGrids { .. })
        ));
        assert_eq!(a.active_voxel_count(), before);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let grids: Vec<_> = [0.0, 2.0, 7.0, 30.0, 31.5].iter().map(|&x| cube_at(x)).collect();
        let seq = union_all(params(), grids.clone(), false).unwrap();
        let par = union_all(params(), grids, true).unwrap();
        assert_eq!(seq.active_voxels(), par.active_voxels());
        assert_eq!(seq.tile_count(), par.tile_count());
    }

    #[test]
    fn union_all_of_nothing_is_empty() {
        assert!(union_all(params(), Vec::new(), true).unwrap().is_empty());
    }
}
