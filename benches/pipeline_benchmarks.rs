use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tricount::engine::LocalExecutor;
use tricount::stages::{degree_job, orient_job, DegreeTable};
use tricount::{EdgeSource, PipelineConfig, TriangleCounter};
use tricount_graphgen::{preferential_attachment, uniform_random};

/// Full pipeline on uniformly random graphs
fn bench_uniform_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_uniform");
    group.sample_size(10);
    let runtime = Runtime::new().unwrap();
    let counter = TriangleCounter::new(PipelineConfig::default()).unwrap();

    for edges in [1_000u64, 10_000, 50_000].iter() {
        let lines = uniform_random(edges / 5, *edges, 1).unwrap().to_lines();
        group.bench_with_input(BenchmarkId::from_parameter(edges), &lines, |b, lines| {
            b.iter(|| {
                runtime
                    .block_on(counter.run(EdgeSource::Lines(lines.clone())))
                    .unwrap()
            });
        });
    }
    group.finish();
}

/// Full pipeline on hub-heavy graphs, where the degree ordering matters
fn bench_skewed_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_skewed");
    group.sample_size(10);
    let runtime = Runtime::new().unwrap();
    let counter = TriangleCounter::new(PipelineConfig::default()).unwrap();

    for vertices in [1_000u64, 10_000].iter() {
        let lines = preferential_attachment(*vertices, 5, 1).unwrap().to_lines();
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &lines, |b, lines| {
            b.iter(|| {
                runtime
                    .block_on(counter.run(EdgeSource::Lines(lines.clone())))
                    .unwrap()
            });
        });
    }
    group.finish();
}

/// Degree and orientation stages alone, across reducer counts
fn bench_orientation(c: &mut Criterion) {
    let mut group = c.benchmark_group("orientation");
    let edges = Arc::new(preferential_attachment(5_000, 4, 7).unwrap().to_lines());

    for reducers in [1usize, 4, 16].iter() {
        let config = PipelineConfig::default().with_reducers(*reducers);
        let executor = LocalExecutor::from_config(&config).unwrap();
        let degrees = executor.run(&degree_job(edges.clone(), &config)).unwrap();
        let table = Arc::new(DegreeTable::from_lines(degrees.lines()));

        group.bench_with_input(BenchmarkId::from_parameter(reducers), reducers, |b, _| {
            b.iter(|| {
                executor
                    .run(&orient_job(edges.clone(), table.clone(), &config))
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_uniform_pipeline,
    bench_skewed_pipeline,
    bench_orientation,
);
criterion_main!(benches);
