//! Criteria parsing, evaluation and aggregate benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvdoc_bench::random_user;
use kvdoc_core::{AggregateProcessor, Criteria, CriteriaEvaluator, PredicateEvaluator};
use serde_json::json;

/// Benchmark parsing criteria of increasing complexity.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let simple = json!({"name": "Gob"});
    let full = json!({
        "where": {
            "or": [{"type": "son"}, {"name": {"startsWith": "Lind"}}],
            "age": {">=": 18, "<": 65},
            "like": {"email": "%bench%"}
        },
        "sort": {"age": -1, "name": 1},
        "skip": 10,
        "limit": 50,
        "select": ["name", "age"]
    });

    group.bench_function("simple", |b| {
        b.iter(|| Criteria::from_json(black_box(&simple)).unwrap());
    });
    group.bench_function("full", |b| {
        b.iter(|| Criteria::from_json(black_box(&full)).unwrap());
    });
    group.finish();
}

/// Benchmark in-memory evaluation over growing record sets.
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let evaluator = PredicateEvaluator::new();
    let criteria = Criteria::from_json(&json!({
        "where": {"age": {">": 30}, "name": {"contains": "b"}},
        "sort": "age desc, name",
        "limit": 25
    }))
    .unwrap();

    for size in [100, 1_000, 10_000] {
        let records: Vec<_> = (0..size).map(random_user).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| evaluator.evaluate(black_box(records.clone()), &criteria).unwrap());
        });
    }
    group.finish();
}

/// Benchmark grouping with every calculation.
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let processor = AggregateProcessor::new();
    let criteria = Criteria::from_json(&json!({
        "groupBy": ["type", "name"],
        "sum": "age",
        "average": "age",
        "min": "age",
        "max": "age"
    }))
    .unwrap();

    for size in [100, 1_000, 10_000] {
        let records: Vec<_> = (0..size).map(random_user).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                processor
                    .process(black_box(records.clone()), &criteria.aggregate)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_aggregate);
criterion_main!(benches);
