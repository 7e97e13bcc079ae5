//! Benchmarks for the offline allocator and the selective deallocator.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_alloc::config::Config;
use grid_alloc::index::AllocationIndex;
use grid_alloc::reallocate::selective_deallocate;
use grid_alloc::types::{Consumer, Source, SourceKind};
use grid_alloc::{allocator, events};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_index(sources: usize, consumers: usize, seed: u64) -> AllocationIndex {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut idx = AllocationIndex::new(1e-3);
    for i in 0..sources {
        let capacity = rng.gen_range(50.0..500.0);
        idx.add_source(Source::new(format!("S{i}"), SourceKind::Solar, capacity));
    }
    for i in 0..consumers {
        let priority = rng.gen_range(1..=5);
        let demand = rng.gen_range(10.0..200.0);
        idx.add_consumer(Consumer::new(format!("C{i}"), priority, demand));
    }
    idx
}

fn bench_offline_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("offline_allocator");

    for (sources, consumers) in [(10, 50), (50, 250), (100, 500)] {
        let base = random_index(sources, consumers, 42);
        group.bench_with_input(
            BenchmarkId::new("sources_consumers", format!("{sources}x{consumers}")),
            &base,
            |b, idx| {
                b.iter_batched(
                    || idx.clone(),
                    |mut idx| black_box(allocator::run(&mut idx).unwrap()),
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_selective_deallocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("selective_deallocate");
    let config = Config::default();

    for consumers in [50, 250, 500] {
        let mut idx = random_index(5, consumers, 7);
        events::bootstrap(&mut idx).unwrap();
        let hi = idx.consumers().next().map(|c| c.id.clone()).unwrap();

        group.bench_with_input(BenchmarkId::new("consumers", consumers), &idx, |b, idx| {
            b.iter_batched(
                || idx.clone(),
                |mut idx| black_box(selective_deallocate(&mut idx, &config, &hi, 50.0).unwrap()),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_offline_allocator, bench_selective_deallocate);
criterion_main!(benches);
