//! Scheduler throughput under criterion.
//!
//! Two load shapes: a recursive range sum that fans out by subdivision,
//! and a flat spread of independently-weighted jobs that forces the
//! thieves to rebalance. Both measure whole frames, arena reset included.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framejob::{FrameScheduler, SchedulerOptions, WorkerContext};
use std::sync::atomic::{AtomicU64, Ordering};

const SUBDIVIDE_THRESHOLD: usize = 256;
const ELEMENTS: usize = 1 << 16;
const FLAT_JOBS: usize = 1_000;

#[derive(Clone, Copy)]
struct RangeSum {
    values: *const u64,
    begin: usize,
    count: usize,
    result: *const AtomicU64,
}

fn range_sum_job(data: *mut (), ctx: &WorkerContext) {
    // SAFETY: payload and slice live in the frame arena until the drain.
    let task = unsafe { &*(data as *const RangeSum) };

    if task.count > SUBDIVIDE_THRESHOLD {
        let half = task.count / 2;
        ctx.spawn_with(
            range_sum_job,
            RangeSum {
                begin: task.begin,
                count: half,
                ..*task
            },
        )
        .expect("subdivision failed");
        ctx.spawn_with(
            range_sum_job,
            RangeSum {
                begin: task.begin + half,
                count: task.count - half,
                ..*task
            },
        )
        .expect("subdivision failed");
        return;
    }

    // SAFETY: the subrange is within the seeded slice.
    let values = unsafe { std::slice::from_raw_parts(task.values.add(task.begin), task.count) };
    let total: u64 = values.iter().sum();
    unsafe { &*task.result }.fetch_add(total, Ordering::Relaxed);
}

fn fibonacci(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }
    let mut a = 0u64;
    let mut b = 1u64;
    for _ in 2..=n {
        let next = a.wrapping_add(b);
        a = b;
        b = next;
    }
    b
}

struct Weighted {
    iterations: u64,
    completed: *const AtomicU64,
}

fn weighted_job(data: *mut (), _ctx: &WorkerContext) {
    // SAFETY: payload lives in the frame arena until the drain.
    let task = unsafe { &*(data as *const Weighted) };
    std::hint::black_box(fibonacci(task.iterations));
    unsafe { &*task.completed }.fetch_add(1, Ordering::Relaxed);
}

fn bench_recursive_sum(c: &mut Criterion) {
    let values: Vec<u64> = (1..=ELEMENTS as u64).collect();
    let expected: u64 = values.iter().sum();

    let mut group = c.benchmark_group("recursive_sum");
    group.throughput(Throughput::Elements(ELEMENTS as u64));

    for workers in [1usize, 2, 4] {
        group.bench_function(BenchmarkId::new("workers", workers), |b| {
            let mut scheduler = FrameScheduler::with_worker_count(1 << 20, workers).unwrap();
            b.iter(|| {
                let result = AtomicU64::new(0);
                scheduler
                    .run_frame(|ctx| {
                        let data = ctx.arena().alloc_slice_copy(&values)?;
                        ctx.spawn_with(
                            range_sum_job,
                            RangeSum {
                                values: data.as_ptr(),
                                begin: 0,
                                count: values.len(),
                                result: &result,
                            },
                        )
                    })
                    .unwrap();
                assert_eq!(result.load(Ordering::Relaxed), expected);
            })
        });
    }

    group.finish();
}

fn bench_imbalanced_jobs(c: &mut Criterion) {
    let mut group = c.benchmark_group("imbalanced_jobs");
    group.throughput(Throughput::Elements(FLAT_JOBS as u64));

    for workers in [1usize, 2, 4] {
        group.bench_function(BenchmarkId::new("workers", workers), |b| {
            let mut scheduler = SchedulerOptions::new(64 * 1024)
                .worker_count(workers)
                .deque_capacity(2048)
                .build()
                .unwrap();
            b.iter(|| {
                let completed = AtomicU64::new(0);
                scheduler
                    .run_frame(|ctx| {
                        for i in 0..FLAT_JOBS {
                            // Every 10th job is heavy, so idle workers only
                            // keep up by stealing around the stragglers.
                            let iterations = if i % 10 == 0 { 1_000 } else { 10 };
                            ctx.spawn_with(
                                weighted_job,
                                Weighted {
                                    iterations,
                                    completed: &completed,
                                },
                            )?;
                        }
                        Ok(())
                    })
                    .unwrap();
                assert_eq!(completed.load(Ordering::Relaxed), FLAT_JOBS as u64);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recursive_sum, bench_imbalanced_jobs);
criterion_main!(benches);
