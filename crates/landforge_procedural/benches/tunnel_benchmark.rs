//! Benchmark for tunnel carving.
//!
//! Run with: cargo bench --package landforge_procedural --bench tunnel_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use landforge_core::{GridFunction, RandomSource, WorldSeed};
use landforge_procedural::{NoiseField, NoiseParams, TunnelGenerator, TunnelOutputs};

fn benchmark_open_map(c: &mut Criterion) {
    let generator = TunnelGenerator::default();

    c.bench_function("tunnels_250x250_open", |b| {
        let mut seed = 0;
        b.iter(|| {
            seed += 1;
            black_box(generator.generate(
                250,
                250,
                WorldSeed::new(seed),
                &|_, _| true,
                TunnelOutputs {
                    depths: true,
                    offsets: true,
                },
            ))
        });
    });
}

fn benchmark_noise_mask_validated(c: &mut Criterion) {
    let generator = TunnelGenerator::default();
    let field = NoiseField::new(WorldSeed::new(5), NoiseParams::default());
    let accept = |x: usize, z: usize| field.value_at(x as f64, z as f64) > 0.0;

    let mut group = c.benchmark_group("validated");
    group.sample_size(20);
    group.bench_function("tunnels_250x250_noise_mask", |b| {
        b.iter(|| {
            let mut source = RandomSource::new(WorldSeed::new(9));
            black_box(generator.generate_validated(250, 250, &mut source, &accept, TunnelOutputs::default(), 50))
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_open_map, benchmark_noise_mask_validated);
criterion_main!(benches);
