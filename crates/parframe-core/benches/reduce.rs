//! Criterion benchmarks for the parallel algorithms across executors.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use parframe_core::executor::{
    Executor, ParallelLoopExecutor, Schedule, SequentialExecutor, ThreadPool,
};
use parframe_core::parallel_for::parallel_for;
use parframe_core::parallel_reduce::parallel_reduce;
use parframe_core::partitioned::PartitionedVec;
use parframe_core::reduction::Sum;

const THREADS: usize = 4;

fn reduce_sum<E: Executor>(data: &PartitionedVec<f64>, exec: &E) -> f64 {
    parallel_reduce(data, &Sum::new(), exec).unwrap().get_or_wait()
}

fn bench_reduce(c: &mut Criterion) {
    let sequential = SequentialExecutor::new(THREADS);
    let pool = ThreadPool::with_threads(THREADS).unwrap();
    let dynamic = ParallelLoopExecutor::new(THREADS, Schedule::Dynamic).unwrap();

    let sizes: Vec<usize> = vec![1_000, 100_000, 1_000_000];

    let mut group = c.benchmark_group("parallel_reduce");
    for &len in &sizes {
        let mut data = PartitionedVec::filled(len, 1.0f64);
        data.partition_into(THREADS).unwrap();

        group.bench_with_input(BenchmarkId::new("sequential", len), &data, |b, data| {
            b.iter(|| reduce_sum(data, &sequential));
        });
        group.bench_with_input(BenchmarkId::new("thread-pool", len), &data, |b, data| {
            b.iter(|| reduce_sum(data, &pool));
        });
        group.bench_with_input(BenchmarkId::new("parallel-loop", len), &data, |b, data| {
            b.iter(|| reduce_sum(data, &dynamic));
        });
    }
    group.finish();
}

fn bench_for(c: &mut Criterion) {
    let pool = ThreadPool::with_threads(THREADS).unwrap();

    let mut group = c.benchmark_group("parallel_for");
    for &len in &[10_000usize, 1_000_000] {
        let mut data = PartitionedVec::filled(len, 0.0f64);
        data.partition_into(THREADS).unwrap();
        group.bench_function(BenchmarkId::from_parameter(len), |b| {
            b.iter(|| parallel_for(&mut data, &|x: &mut f64| *x += 1.0, &pool).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reduce, bench_for);
criterion_main!(benches);
