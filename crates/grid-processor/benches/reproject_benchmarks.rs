//! Benchmarks for nearest-neighbour reprojection.
//!
//! Run with: cargo bench --package grid-processor --bench reproject_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_processor::{reproject, ReprojectionConfig};
use projection::KdTree;
use test_utils::{fixtures, lambert_field};

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_build");
    for stride in [8usize, 4, 2] {
        let field = lambert_field(stride, 10.0);
        group.throughput(Throughput::Elements(field.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stride), &field, |b, f| {
            b.iter(|| KdTree::from_coordinates(black_box(&f.lat), black_box(&f.lon)))
        });
    }
    group.finish();
}

fn bench_reproject(c: &mut Criterion) {
    let mut group = c.benchmark_group("reproject");
    group.sample_size(10);
    let grid = fixtures::grid::conus_small();
    for stride in [8usize, 4] {
        let field = lambert_field(stride, 10.0);
        let config = ReprojectionConfig::new(0.05 * stride as f64);
        group.throughput(Throughput::Elements(grid.cell_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stride), &field, |b, f| {
            b.iter(|| reproject(black_box(f), &grid, &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_build, bench_reproject);
criterion_main!(benches);
