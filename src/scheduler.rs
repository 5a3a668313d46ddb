//! The frame driver.
//!
//! One `run_frame` call is one complete work cycle: the caller seeds
//! worker 0's deque, the driver fans out worker threads and takes seat 0
//! itself, everyone searches until the completion counter drains, and the
//! arena is reset for the next frame.

use std::thread;

use tracing::debug;

use crate::arena::FrameArena;
use crate::context::WorkerContext;
use crate::counter::CompletionCounter;
use crate::deque::DEFAULT_DEQUE_CAPACITY;
use crate::error::FrameError;
#[cfg(feature = "stats")]
use crate::stats::{self, StatsSnapshot};
use crate::worker::{self, Worker};

/// Leave one hardware thread for the rest of the process.
fn default_worker_count() -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
    available.saturating_sub(1).max(1)
}

/// Tunables for a [`FrameScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    arena_capacity: usize,
    worker_count: Option<usize>,
    deque_capacity: usize,
    pin_workers: bool,
}

impl SchedulerOptions {
    /// Starts from the defaults: worker count derived from hardware
    /// concurrency, deque capacity [`DEFAULT_DEQUE_CAPACITY`], no pinning.
    pub fn new(arena_capacity: usize) -> Self {
        Self {
            arena_capacity,
            worker_count: None,
            deque_capacity: DEFAULT_DEQUE_CAPACITY,
            pin_workers: false,
        }
    }

    /// Sets the number of workers, clamped to at least one.
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count.max(1));
        self
    }

    /// Sets the per-worker deque capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two.
    pub fn deque_capacity(mut self, capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "deque capacity must be a power of two, got {capacity}"
        );
        self.deque_capacity = capacity;
        self
    }

    /// Pins spawned workers to cores round-robin. The driver thread
    /// (worker 0) is left unpinned so the caller's affinity is untouched.
    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.pin_workers = pin;
        self
    }

    /// Reserves the arena and builds the scheduler.
    pub fn build(self) -> Result<FrameScheduler, FrameError> {
        let arena = FrameArena::new(self.arena_capacity)?;
        let worker_count = self.worker_count.unwrap_or_else(default_worker_count);
        debug!(
            worker_count,
            arena_capacity = self.arena_capacity,
            deque_capacity = self.deque_capacity,
            "scheduler ready"
        );
        Ok(FrameScheduler {
            arena,
            counter: CompletionCounter::new(),
            worker_count,
            deque_capacity: self.deque_capacity,
            pin_workers: self.pin_workers,
            #[cfg(feature = "stats")]
            last_stats: None,
        })
    }
}

/// Owns the arena, the completion counter, and the worker configuration;
/// drives frames to completion.
pub struct FrameScheduler {
    arena: FrameArena,
    counter: CompletionCounter,
    worker_count: usize,
    deque_capacity: usize,
    pin_workers: bool,
    #[cfg(feature = "stats")]
    last_stats: Option<StatsSnapshot>,
}

impl FrameScheduler {
    /// Scheduler over a fresh arena with the default worker count
    /// (`max(1, hardware_concurrency - 1)`).
    pub fn new(arena_capacity: usize) -> Result<Self, FrameError> {
        SchedulerOptions::new(arena_capacity).build()
    }

    /// Scheduler with an explicit worker count.
    pub fn with_worker_count(arena_capacity: usize, workers: usize) -> Result<Self, FrameError> {
        SchedulerOptions::new(arena_capacity)
            .worker_count(workers)
            .build()
    }

    /// Number of workers each frame runs with.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The shared frame arena.
    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    /// The frame's completion counter.
    pub fn counter(&self) -> &CompletionCounter {
        &self.counter
    }

    /// Statistics from the most recent drained frame.
    #[cfg(feature = "stats")]
    pub fn last_frame_stats(&self) -> Option<StatsSnapshot> {
        self.last_stats
    }

    /// Runs one frame to completion.
    ///
    /// `seed` runs on the calling thread, which owns worker 0 for the
    /// whole frame: it allocates initial payloads from the arena and
    /// spawns the initial jobs through the provided context. The driver
    /// then starts `worker_count - 1` threads, works seat 0 itself, joins
    /// everyone once the counter drains, and resets the arena.
    ///
    /// On an error from `seed`, nothing has executed: the partial seed is
    /// scrubbed and the scheduler remains usable. A
    /// [`FrameError::NotDrained`] after join, by contrast, means the
    /// workload's counter accounting is broken and the scheduler should
    /// be discarded.
    pub fn run_frame<F>(&mut self, seed: F) -> Result<(), FrameError>
    where
        F: FnOnce(&WorkerContext) -> Result<(), FrameError>,
    {
        let arena = &self.arena;
        let counter = &self.counter;

        let workers: Vec<Worker> = (0..self.worker_count)
            .map(|id| Worker::new(id, self.deque_capacity))
            .collect();
        let contexts: Vec<WorkerContext> = workers
            .iter()
            .map(|w| WorkerContext::new(arena, counter, w))
            .collect();

        if let Err(err) = seed(&contexts[0]) {
            self.counter.clear();
            // SAFETY: no worker threads exist yet; the seed closure was
            // the only arena user and it has returned.
            unsafe { self.arena.reset() };
            return Err(err);
        }

        debug!(
            seeded = workers[0].deque().len(),
            workers = self.worker_count,
            "frame seeded, starting workers"
        );

        let cores = if self.pin_workers {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        thread::scope(|scope| {
            for index in 1..workers.len() {
                let workers = &workers;
                let contexts = &contexts;
                let core = (!cores.is_empty()).then(|| cores[index % cores.len()]);
                scope.spawn(move || {
                    if let Some(core) = core {
                        core_affinity::set_for_current(core);
                    }
                    worker::worker_loop(index, workers, contexts, counter);
                });
            }
            worker::worker_loop(0, &workers, &contexts, counter);
        });

        let remaining = counter.remaining();
        if remaining != 0 {
            return Err(FrameError::NotDrained { remaining });
        }

        #[cfg(feature = "stats")]
        {
            self.last_stats = Some(stats::aggregate(&workers, arena));
        }

        debug!(arena_used = arena.used(), "frame drained, resetting arena");
        // SAFETY: every worker joined after observing the drained counter;
        // the release decrements happen-before this point and no pointers
        // into the arena survive.
        unsafe { arena.reset() };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DequeFull;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_worker_count_is_at_least_one() {
        assert!(default_worker_count() >= 1);
    }

    #[test]
    fn empty_frame_drains_immediately() {
        let mut scheduler = FrameScheduler::with_worker_count(1024, 2).unwrap();
        scheduler.run_frame(|_| Ok(())).unwrap();
        assert_eq!(scheduler.arena().used(), 0);
        assert!(scheduler.counter().is_drained());
    }

    #[test]
    fn failed_seed_leaves_scheduler_usable() {
        fn bump(data: *mut (), _ctx: &WorkerContext) {
            // SAFETY: test passes a live AtomicUsize.
            let hits = unsafe { &*(data as *const AtomicUsize) };
            hits.fetch_add(1, Ordering::Relaxed);
        }

        let mut scheduler = SchedulerOptions::new(1024)
            .worker_count(2)
            .deque_capacity(2)
            .build()
            .unwrap();

        let hits = AtomicUsize::new(0);
        let data = &hits as *const _ as *mut ();

        let err = scheduler
            .run_frame(|ctx| {
                for _ in 0..3 {
                    ctx.spawn(bump, data)?;
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, FrameError::Deque(DequeFull { capacity: 2 }));
        assert!(scheduler.counter().is_drained());
        assert_eq!(scheduler.arena().used(), 0);

        // The scrubbed scheduler can still run a clean frame.
        scheduler
            .run_frame(|ctx| {
                ctx.spawn(bump, data)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn options_reject_bad_deque_capacity() {
        let _ = SchedulerOptions::new(1024).deque_capacity(100);
    }
}
