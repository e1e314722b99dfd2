//! Benchmark for grid function composition and caching.
//!
//! TARGET: materialise a 250x250 composed field in well under 10ms
//!
//! Run with: cargo bench --package landforge_core --bench grid_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use landforge_core::grid::{self, Cache, GridFunction, MaxSelect};

fn composed_field() -> landforge_core::Grid<f64> {
    let base = grid::from_fn(|x, z| (x * 0.05).sin() * (z * 0.07).cos());
    let scaled = grid::transform(base, 1.5);
    grid::rotate(scaled, 125.0, 125.0, 33.0)
}

fn benchmark_composed_sample(c: &mut Criterion) {
    let field = composed_field();

    c.bench_function("composed_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(field.value_at(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_cache_materialise(c: &mut Criterion) {
    let field = composed_field();

    let mut group = c.benchmark_group("cache");
    group.throughput(Throughput::Elements(250 * 250));
    group.sample_size(20);

    group.bench_function("materialise_250x250", |b| {
        b.iter(|| black_box(Cache::new(&*field, 250, 250)));
    });

    group.finish();
}

fn benchmark_max_select(c: &mut Criterion) {
    let candidates = (0..4)
        .map(|i| grid::rotate(composed_field(), 125.0, 125.0, f64::from(i) * 90.0))
        .collect();
    let select = MaxSelect::new(None, candidates, vec![1_u8, 2, 3, 4], 0);

    c.bench_function("max_select_4_candidates", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(select.value_at(black_box(x), black_box(x * 0.3)))
        });
    });
}

criterion_group!(
    benches,
    benchmark_composed_sample,
    benchmark_cache_materialise,
    benchmark_max_select
);
criterion_main!(benches);
