//! Benchmarks for chord selection strategies.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use string_art::{
    compute::{AnchorLayout, CandidateSet, ChordRasterizer, DarknessMap},
    schema::{IntensityGrid, MemeticConfig, StrategyParams},
    REGISTRY,
};

fn portrait(size: usize) -> DarknessMap {
    let mut image = IntensityGrid::filled(size, size, 255);
    let c = size as f64 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let r = ((x as f64 - c).powi(2) + (y as f64 - c).powi(2)).sqrt();
            let v = (255.0 * (r / c).min(1.0)) as u8;
            image.set(x, y, v);
        }
    }
    DarknessMap::from_intensity(&image)
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_set");
    let darkness = portrait(256);

    for n_anchors in [60, 120, 180] {
        let layout = AnchorLayout::generate(n_anchors, 256, 256, 4.0).unwrap();
        let raster = ChordRasterizer::new(256, 256, 1);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_anchors", n_anchors)),
            &n_anchors,
            |b, _| {
                b.iter(|| CandidateSet::full(black_box(&layout), &raster, &darkness));
            },
        );
    }

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy");
    group.sample_size(10);
    let darkness = portrait(128);

    for key in REGISTRY.keys() {
        let params = StrategyParams {
            algorithm: key.to_string(),
            n_anchors: 60,
            n_strings: 50,
            sample_pairs: 300,
            margin: 2.0,
            seed: Some(1),
            memetic: MemeticConfig {
                population: 10,
                generations: 10,
                ..Default::default()
            },
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(key), &key, |b, _| {
            b.iter(|| REGISTRY.run(black_box(&darkness), &params, None, None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_candidates, bench_strategies);
criterion_main!(benches);
