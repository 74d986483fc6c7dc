//! Benchmarks for the per-tick decision paths
//!
//! The classifier and the synchronous trim fallback are the only pieces
//! that run on the tick thread over whole entity tables; they have to stay
//! cheap at full table sizes.
//!
//! Run with: cargo bench --bench decisions

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickshed::metrics::ShedMetrics;
use tickshed::snapshot::{ObserverSnapshot, TrimCandidate};
use tickshed::systems::planner::BackgroundPlanner;
use tickshed::systems::pool::ScratchPools;
use tickshed::systems::{observer, trimmer};
use tickshed::util::vec2::Vec2;
use tickshed::EngineConfig;

fn spread_positions(count: usize, spacing: f32) -> Vec<Vec2> {
    // Deterministic spiral spread, no RNG needed
    (0..count)
        .map(|i| {
            let angle = i as f32 * 0.61803;
            let radius = spacing * (i as f32).sqrt();
            Vec2::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

fn bench_far_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("far_classification");
    for &entity_count in &[200usize, 1000] {
        for &observer_count in &[1usize, 8] {
            let observers: Vec<ObserverSnapshot> = spread_positions(observer_count, 400.0)
                .into_iter()
                .map(|position| ObserverSnapshot { position })
                .collect();
            let entities = spread_positions(entity_count, 120.0);

            group.throughput(Throughput::Elements(entity_count as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{observer_count}_observers"), entity_count),
                &entities,
                |b, entities| {
                    b.iter(|| {
                        let mut far = 0usize;
                        for &position in entities {
                            if observer::is_far_from_all(
                                black_box(position),
                                black_box(&observers),
                                1000.0,
                            ) {
                                far += 1;
                            }
                        }
                        black_box(far)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_trim_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("trim_fallback");
    let config = EngineConfig::default();
    let metrics = Arc::new(ShedMetrics::new());
    let pools = Arc::new(ScratchPools::new());
    let planner = BackgroundPlanner::new(Arc::clone(&pools), Arc::clone(&metrics));

    for &population in &[400usize, 1000] {
        let candidates: Vec<TrimCandidate> = (0..population)
            .map(|slot| TrimCandidate {
                slot,
                time_left: ((slot * 7919) % 3600) as i32,
                important: slot % 10 == 0,
            })
            .collect();

        group.throughput(Throughput::Elements(population as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(population),
            &candidates,
            |b, candidates| {
                b.iter(|| {
                    // No plan published: full synchronous fallback path
                    trimmer::enforce_cap(
                        black_box(candidates),
                        300,
                        &planner,
                        &pools,
                        0,
                        &config,
                        &metrics,
                        |_| false,
                        |slot| {
                            black_box(slot);
                        },
                    )
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_far_classification, bench_trim_fallback);
criterion_main!(benches);
