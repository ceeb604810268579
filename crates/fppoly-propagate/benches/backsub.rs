//! Criterion benchmarks for back-substitution
//!
//! Run with: cargo bench -p fppoly-propagate
//! HTML reports: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fppoly_propagate::{
    Activation, AffineExpr, AnalysisConfig, FpPoly, LayerKind, ParallelConfig, RoundingConfig,
};
use ndarray::{Array1, Array2};

/// Deterministic dense weights in `[-1, 1]`.
fn make_layer(rows: usize, cols: usize, salt: usize) -> Vec<AffineExpr> {
    let w = Array2::from_shape_fn((rows, cols), |(i, j)| {
        ((i * 31 + j * 17 + salt * 7) % 41) as f64 / 20.0 - 1.0
    });
    let b = Array1::from_shape_fn(rows, |i| ((i + salt) % 5) as f64 / 10.0);
    AffineExpr::dense_rows(w.view(), b.view()).unwrap()
}

fn build(width: usize, depth: usize, activation: Activation, parallel: ParallelConfig) -> FpPoly {
    let inputs = 16;
    let config = AnalysisConfig {
        rounding: RoundingConfig::default(),
        parallel,
        ..AnalysisConfig::default()
    };
    let mut fp = FpPoly::new(vec![-0.1; inputs], vec![0.1; inputs], config).unwrap();
    let mut prev = inputs;
    for d in 0..depth {
        fp.add_layer(LayerKind::Affine, activation, make_layer(width, prev, d))
            .unwrap();
        prev = width;
    }
    fp.add_output_layer(LayerKind::Affine, Activation::None, make_layer(10, prev, depth))
        .unwrap();
    fp
}

// ============================================================================
// Network construction
// ============================================================================

fn bench_relu_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("Backsub/ReLU");
    group.sample_size(10);

    for (width, depth) in [(50, 3), (100, 4), (200, 6)] {
        group.throughput(Throughput::Elements((width * depth) as u64));
        group.bench_with_input(
            BenchmarkId::new("serial", format!("{}x{}", width, depth)),
            &(width, depth),
            |b, &(width, depth)| {
                b.iter(|| {
                    let serial = ParallelConfig {
                        max_threads: Some(1),
                        ..ParallelConfig::default()
                    };
                    black_box(build(width, depth, Activation::Relu, serial))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", format!("{}x{}", width, depth)),
            &(width, depth),
            |b, &(width, depth)| {
                b.iter(|| black_box(build(width, depth, Activation::Relu, ParallelConfig::default())))
            },
        );
    }
    group.finish();
}

fn bench_s_curve_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("Backsub/SCurve");
    group.sample_size(10);

    for activation in [Activation::Sigmoid, Activation::Tanh] {
        group.bench_with_input(
            BenchmarkId::new(format!("{:?}", activation), "100x4"),
            &activation,
            |b, &activation| b.iter(|| black_box(build(100, 4, activation, ParallelConfig::default()))),
        );
    }
    group.finish();
}

// ============================================================================
// Queries
// ============================================================================

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("Backsub/Query");
    let fp = build(100, 4, Activation::Relu, ParallelConfig::default());

    group.bench_function("is_greater", |b| {
        b.iter(|| black_box(fp.is_greater(black_box(0), black_box(1))))
    });
    group.bench_function("output_uexpr", |b| {
        b.iter(|| black_box(fp.uexpr_for_output_neuron(black_box(3))))
    });
    group.finish();
}

criterion_group!(benches, bench_relu_network, bench_s_curve_network, bench_queries);
criterion_main!(benches);
