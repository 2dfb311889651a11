//! Benchmarks for the split engine and the batch evaluator.
//!
//! Run with: `cargo bench --bench splits`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pace_curve::{
    build_target_distances, evaluate_batch, fastest_splits_into, Activity, ActivitySummary,
    Params, Streams, NO_SPLIT, STANDARD_RACE_DISTANCES_MILES,
};

/// 1 Hz run with pace drifting between roughly 4:00 and 6:00 per km.
fn synthetic_run(seconds: usize, phase: f64) -> Streams {
    let mut time = Vec::with_capacity(seconds);
    let mut distance = Vec::with_capacity(seconds);
    let mut d = 0.0;
    for t in 0..seconds {
        time.push(t as i64);
        distance.push(d);
        d += 3.5 + 0.7 * ((t as f64 / 300.0) + phase).sin();
    }
    Streams::new(time, distance)
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("fastest_splits_into");
    for &seconds in &[1_800usize, 7_200, 14_400] {
        let streams = synthetic_run(seconds, 0.0);
        let total = *streams.distance.last().unwrap();
        let targets = build_target_distances(STANDARD_RACE_DISTANCES_MILES, 0.1, total).unwrap();
        let mut out = vec![NO_SPLIT; targets.len()];
        group.bench_with_input(
            BenchmarkId::new("samples", format!("{}_{}targets", seconds, targets.len())),
            &streams,
            |b, s| {
                b.iter(|| {
                    fastest_splits_into(&s.time, &s.distance, black_box(&targets), &mut out)
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let activities: Vec<Activity> = (0..200)
        .map(|i| {
            let streams = synthetic_run(1_800 + (i % 7) * 900, i as f64);
            let total = *streams.distance.last().unwrap();
            Activity::new(ActivitySummary::new(format!("run-{i}"), total * 1.02), Some(streams))
        })
        .collect();
    let targets = build_target_distances(STANDARD_RACE_DISTANCES_MILES, 0.25, 30_000.0).unwrap();

    let mut group = c.benchmark_group("evaluate_batch");
    group.sample_size(20);
    for parallel in [false, true] {
        let params = Params {
            parallel,
            ..Params::default()
        };
        group.bench_function(if parallel { "parallel" } else { "serial" }, |b| {
            b.iter(|| evaluate_batch(black_box(&activities), &targets, &params));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine, bench_batch);
criterion_main!(benches);
