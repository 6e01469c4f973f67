//! Accumulator Benchmarks
//!
//! Throughput of batched box construction and line chunking

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use surgeryvis_core::Vec3;
use surgeryvis_geometry::{BoxMeshAccumulator, FaceMask, LineBatch, SegmentedBoxGeometry};

fn bench_add_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator_add_box");

    for count in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut acc = BoxMeshAccumulator::new(count * 36).unwrap();
                for i in 0..count {
                    let position = Vec3::new((i % 64) as f32, (i / 64) as f32, 0.0);
                    acc.add_box(FaceMask::ALL, position, Vec3::ONE).unwrap();
                }
                black_box(acc.finalize())
            });
        });
    }

    group.finish();
}

fn bench_partial_masks(c: &mut Criterion) {
    c.bench_function("accumulator_partial_masks", |b| {
        b.iter(|| {
            let mut acc = BoxMeshAccumulator::new(64 * 36).unwrap();
            for bits in 0..64u32 {
                let position = Vec3::splat(bits as f32);
                acc.add_box(FaceMask::from_raw(bits), position, Vec3::ONE)
                    .unwrap();
            }
            black_box(acc.vertex_count())
        });
    });
}

fn bench_segmented_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmented_box");
    let dimensions = Vec3::new(1.0, 2.0, 3.0);

    for grid in [1u32, 8, 32].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(grid), grid, |b, &grid| {
            let segments = [grid; 3];
            b.iter(|| SegmentedBoxGeometry::all_faces(dimensions, segments));
        });
    }

    group.finish();
}

fn bench_line_chunks(c: &mut Criterion) {
    let mut batch = LineBatch::new();
    for i in 0..100_000 {
        let x = i as f32;
        batch.add_segment(Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 1.0));
    }

    c.bench_function("line_batch_chunks", |b| {
        b.iter(|| black_box(batch.chunks(black_box(50_000)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_add_box,
    bench_partial_masks,
    bench_segmented_box,
    bench_line_chunks
);
criterion_main!(benches);
