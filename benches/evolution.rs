//! Bundle extraction and evolution benchmarks on synthetic corridors.
//!
//! Run with: `cargo bench --bench evolution`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bundlemap::synthetic::SyntheticScenario;
use bundlemap::{
    AbortHandle, BundleGenerator, EvolutionConfig, EvolutionDiagramBuilder, ExtractionParams, ExtractionStrategy,
};

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.sample_size(10);
    let abort = AbortHandle::new();
    let params = ExtractionParams::new(20.0, 2, 40.0, 20.0);

    for count in [10, 25, 50] {
        let dataset = SyntheticScenario::with_trajectory_count(count, 400.0, 0.8).generate();
        for strategy in [ExtractionStrategy::FurthestEndpoint, ExtractionStrategy::MaximalLength] {
            let generator = BundleGenerator::new(dataset.trajectories.clone(), strategy, false, true)
                .expect("non-empty dataset");
            group.bench_with_input(BenchmarkId::new(strategy.as_str(), count), &generator, |b, g| {
                b.iter(|| g.generate(black_box(params), &abort).map(|set| set.len()))
            });
        }
    }
    group.finish();
}

fn bench_evolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution");
    group.sample_size(10);
    let config = EvolutionConfig {
        min_eps: 5.0,
        max_eps: 60.0,
        delta_eps: 5.0,
        ..Default::default()
    };

    for (name, scenario) in [
        ("small", SyntheticScenario::small()),
        ("multi_corridor", SyntheticScenario::multi_corridor()),
    ] {
        let trajectories = scenario.generate().trajectories;
        let builder = EvolutionDiagramBuilder::new(config.clone());
        group.bench_function(name, |b| {
            b.iter(|| builder.build(black_box(trajectories.clone())).map(|d| d.num_classes()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extraction, bench_evolution);
criterion_main!(benches);
