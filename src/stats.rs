//! Optional per-frame scheduler statistics.
//!
//! Compiled in only with the `stats` feature. Workers tick relaxed
//! counters on their own cache lines; the scheduler folds them into a
//! [`StatsSnapshot`] when the frame drains.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::arena::FrameArena;
use crate::worker::Worker;

/// Relaxed counters owned by one worker.
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    jobs_executed: AtomicU64,
    steals_success: AtomicU64,
    steal_misses: AtomicU64,
}

impl WorkerStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_job(&self) {
        self.jobs_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_steal_success(&self) {
        self.steals_success.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_steal_miss(&self) {
        self.steal_misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Aggregated view of one completed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Jobs executed across all workers, local pops and steals combined.
    pub jobs_executed: u64,
    /// Steal rounds that came back with a job.
    pub steals_success: u64,
    /// Steal rounds that found every victim empty or contended.
    pub steal_misses: u64,
    /// Arena bytes in use at the moment the frame drained.
    pub arena_high_water: usize,
}

impl StatsSnapshot {
    /// Fraction of executed jobs that arrived by stealing.
    pub fn steal_share(&self) -> f64 {
        if self.jobs_executed == 0 {
            0.0
        } else {
            self.steals_success as f64 / self.jobs_executed as f64
        }
    }
}

/// Folds every worker's counters into one snapshot. Called after join,
/// before the arena reset wipes the high-water mark.
pub(crate) fn aggregate(workers: &[Worker], arena: &FrameArena) -> StatsSnapshot {
    let mut snapshot = StatsSnapshot {
        arena_high_water: arena.used(),
        ..StatsSnapshot::default()
    };

    for worker in workers {
        let stats = worker.stats();
        snapshot.jobs_executed += stats.jobs_executed.load(Ordering::Relaxed);
        snapshot.steals_success += stats.steals_success.load(Ordering::Relaxed);
        snapshot.steal_misses += stats.steal_misses.load(Ordering::Relaxed);
    }

    snapshot
}
