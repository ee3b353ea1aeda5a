//! Benchmarks for level-set construction and extraction.
//!
//! Run with: cargo bench -p mesh-levelset

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mesh_levelset::{
    LevelSetParams, NarrowBandGrid, close, extract_surface, mesh_to_level_set, union_all,
};
use mesh_types::{Point3, PolygonMesh, box_mesh};

// =============================================================================
// Inputs
// =============================================================================

fn row_of_boxes(count: usize, gap: f32) -> Vec<PolygonMesh> {
    (0..count)
        .map(|i| {
            let x = i as f32 * (2.0 + gap);
            box_mesh(Point3::new(x, 0.0, 0.0), Point3::new(x + 2.0, 2.0, 2.0))
        })
        .collect()
}

fn sphere_field(voxel_size: f64) -> NarrowBandGrid {
    let params = LevelSetParams::new(voxel_size, 3.0).unwrap();
    let r = (1.5 / voxel_size).ceil() as i32 + 4;
    NarrowBandGrid::from_fn(params, [-r; 3], [r; 3], |p| p.coords.norm() - 1.0)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 4.0));
    for voxel_size in [0.2, 0.1, 0.05] {
        let params = LevelSetParams::new(voxel_size, 3.0).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(voxel_size),
            &params,
            |b, &params| b.iter(|| mesh_to_level_set(black_box(&mesh), params)),
        );
    }
    group.finish();
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("union_all");
    let params = LevelSetParams::new(0.1, 3.0).unwrap();
    let grids: Vec<_> = row_of_boxes(8, -0.5)
        .iter()
        .map(|m| mesh_to_level_set(m, params))
        .collect();
    for parallel in [false, true] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if parallel { "parallel" } else { "sequential" }),
            &parallel,
            |b, &parallel| b.iter(|| union_all(params, black_box(grids.clone()), parallel)),
        );
    }
    group.finish();
}

fn bench_close(c: &mut Criterion) {
    let params = LevelSetParams::for_closing(0.1, 0.3).unwrap();
    let grids: Vec<_> = row_of_boxes(3, 0.2)
        .iter()
        .map(|m| mesh_to_level_set(m, params))
        .collect();
    let merged = union_all(params, grids, false).unwrap();
    c.bench_function("close_0.3", |b| {
        b.iter(|| close(black_box(merged.clone()), 0.3).unwrap());
    });
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_surface");
    for voxel_size in [0.1, 0.05, 0.025] {
        let grid = sphere_field(voxel_size);
        group.bench_with_input(BenchmarkId::from_parameter(voxel_size), &grid, |b, grid| {
            b.iter(|| extract_surface(black_box(grid)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rasterize, bench_union, bench_close, bench_extract);
criterion_main!(benches);
