//! Concurrent load benchmarks.
//!
//! Measures pool checkout under contention and the dense matrix operations.

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use infer_pool::engine::{InferenceEngine, MockBackend, ModelConfig, PredictorPool};
use infer_pool::tensor::{Matrix, Tensor};

fn bench_pool_checkout(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_checkout");

    let pool = PredictorPool::new((0..4).collect::<Vec<usize>>()).unwrap();
    group.throughput(Throughput::Elements(1));
    group.bench_function("uncontended", |b| {
        b.iter(|| {
            let p = pool.get();
            black_box(*p)
        })
    });

    group.finish();
}

fn bench_engine_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_contention");
    const CALLS_PER_THREAD: usize = 100;

    for (name, pool_size, threads) in [("1x4", 1, 4), ("2x8", 2, 8), ("4x8", 4, 8)] {
        let backend = MockBackend::new(&["x"]).with_echo_output("y", "x");
        let engine = Arc::new(
            InferenceEngine::new(&backend, ModelConfig::in_dir("/bench"), pool_size).unwrap(),
        );
        let input = Tensor::from_1d(&[0.5f32; 64]);

        group.throughput(Throughput::Elements((threads * CALLS_PER_THREAD) as u64));
        group.bench_function(BenchmarkId::new("infer", name), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let (engine, input) = (engine.clone(), input.clone());
                        thread::spawn(move || {
                            for _ in 0..CALLS_PER_THREAD {
                                black_box(engine.infer(std::slice::from_ref(&input)).unwrap());
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            })
        });
    }

    group.finish();
}

fn bench_matrix_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_ops");

    for size in [16usize, 64, 256] {
        let data: Vec<f32> = (0..size * size).map(|i| (i % 17) as f32).collect();
        let m = Matrix::new(size, size, &data).unwrap();

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("norm", size), &m, |b, m| {
            b.iter(|| {
                let mut m = m.clone();
                m.norm();
                black_box(m)
            })
        });
        group.bench_with_input(BenchmarkId::new("pad", size), &m, |b, m| {
            b.iter(|| black_box(m.pad(8, 8, 0.0).into_owned()))
        });
        group.bench_with_input(BenchmarkId::new("set_func", size), &m, |b, m| {
            b.iter(|| {
                let mut m = m.clone();
                m.set_func(1..size - 1, 1..size - 1, |x| x * x).unwrap();
                black_box(m)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pool_checkout, bench_engine_contention, bench_matrix_ops);
criterion_main!(benches);
