use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roundtrip::arb::{ArbitrageDetector, RateGraph, Token};
use roundtrip::sync::GraphAggregator;

/// Generate a fully connected rate graph with noisy but roughly consistent prices.
///
/// Every token gets a random USD price and each directed rate is the price ratio
/// times a spread factor in `[0.97, 1.01)`, so a few cycles end up profitable.
fn generate_benchmark_graph(token_count: usize) -> RateGraph {
    let tokens: Vec<Token> = (0..token_count).map(|i| Token::new(format!("T{i:03}"))).collect();
    let prices: Vec<f64> = (0..token_count).map(|_| 0.01 + fastrand::f64() * 1000.0).collect();

    let mut graph = RateGraph::new();
    for (i, from) in tokens.iter().enumerate() {
        for (j, to) in tokens.iter().enumerate() {
            if i == j {
                continue;
            }
            let spread = 0.97 + fastrand::f64() * 0.04;
            graph
                .insert(from.clone(), to.clone(), prices[i] / prices[j] * spread)
                .unwrap();
        }
    }
    graph
}

/// Benchmark one detection pass over graphs of growing size
fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    group.sample_size(10);

    for token_count in [6, 20, 50, 100] {
        fastrand::seed(token_count as u64);
        let graph = generate_benchmark_graph(token_count);

        let opportunities = ArbitrageDetector::new(&graph).detect();
        println!(
            "{token_count} tokens, {} edges: {} opportunities",
            graph.edge_count(),
            opportunities.len()
        );

        group.throughput(criterion::Throughput::Elements(graph.edge_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(token_count), &graph, |b, graph| {
            b.iter(|| black_box(ArbitrageDetector::new(graph).detect()));
        });
    }

    group.finish();
}

/// Benchmark merging a worker's update and taking a snapshot
fn bench_submit_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_snapshot");

    for token_count in [6, 50] {
        fastrand::seed(token_count as u64);
        let aggregator = GraphAggregator::with_graph(generate_benchmark_graph(token_count));
        let update = generate_benchmark_graph(token_count);

        group.bench_with_input(BenchmarkId::from_parameter(token_count), &update, |b, update| {
            b.iter(|| {
                aggregator.submit(update);
                black_box(aggregator.snapshot())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_detect, bench_submit_snapshot);
criterion_main!(benches);
