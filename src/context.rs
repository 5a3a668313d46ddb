//! Per-worker execution context.
//!
//! Jobs receive the context of the worker running them. It is read-only
//! after setup and gives a job exactly three capabilities: allocate from
//! the shared arena, inspect the frame counter, and spawn children onto
//! its own worker's deque.

use crate::arena::FrameArena;
use crate::counter::CompletionCounter;
use crate::error::{DequeFull, FrameError};
use crate::job::{Job, JobFn};
use crate::worker::Worker;

/// Read-only view of a frame from one worker's seat.
///
/// Holds raw pointers rather than borrows so that the context itself stays
/// a plain value the scheduler can lay out per worker; the scheduler keeps
/// the arena, counter, and worker alive for as long as any context exists.
pub struct WorkerContext {
    arena: *const FrameArena,
    counter: *const CompletionCounter,
    worker: *const Worker,
}

impl WorkerContext {
    pub(crate) fn new(arena: &FrameArena, counter: &CompletionCounter, worker: &Worker) -> Self {
        Self {
            arena,
            counter,
            worker,
        }
    }

    /// The shared frame arena. Child payloads are allocated here.
    pub fn arena(&self) -> &FrameArena {
        // SAFETY: the scheduler owns the arena and outlives every context.
        unsafe { &*self.arena }
    }

    /// The frame's completion counter.
    pub fn counter(&self) -> &CompletionCounter {
        // SAFETY: the scheduler owns the counter and outlives every context.
        unsafe { &*self.counter }
    }

    pub(crate) fn worker(&self) -> &Worker {
        // SAFETY: the worker slice outlives every context borrowing it.
        unsafe { &*self.worker }
    }

    /// Identity of the worker this context belongs to.
    pub fn worker_id(&self) -> usize {
        self.worker().id()
    }

    /// Spawns a counted child job onto this worker's own deque.
    ///
    /// The counter is charged before the push so the frame cannot appear
    /// drained while the child is in flight. If the deque is full, the
    /// charge is rolled back and the error returned; for a well-sized
    /// deque this is fatal workload misdesign rather than backpressure.
    pub fn spawn(&self, func: JobFn, data: *mut ()) -> Result<(), DequeFull> {
        let counter = self.counter();
        counter.add_spawned(1);

        let job = Job::with_counter(func, data, counter);
        // SAFETY: a context is only handed to the thread that owns its
        // worker, so the owner-only push contract holds.
        match unsafe { self.worker().deque().push(job) } {
            Ok(()) => Ok(()),
            Err(full) => {
                // The job was never published; take its unit back.
                counter.complete_one();
                Err(full)
            }
        }
    }

    /// Allocates `payload` in the arena and spawns a job over it.
    pub fn spawn_with<T>(&self, func: JobFn, payload: T) -> Result<(), FrameError> {
        let data = self.arena().alloc_value(payload)?;
        self.spawn(func, data.as_ptr() as *mut ())?;
        Ok(())
    }
}

// SAFETY: the pointed-to arena and counter are Sync, and deque access
// through a context happens only on its owner thread by construction.
unsafe impl Send for WorkerContext {}
unsafe impl Sync for WorkerContext {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bump(data: *mut (), _ctx: &WorkerContext) {
        // SAFETY: test passes a live AtomicUsize.
        let hits = unsafe { &*(data as *const AtomicUsize) };
        hits.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn spawn_charges_counter_and_queues() {
        let arena = FrameArena::new(128).unwrap();
        let counter = CompletionCounter::new();
        let worker = Worker::new(0, 8);
        let ctx = WorkerContext::new(&arena, &counter, &worker);

        let hits = AtomicUsize::new(0);
        ctx.spawn(bump, &hits as *const _ as *mut ()).unwrap();

        assert_eq!(counter.remaining(), 1);
        assert_eq!(worker.deque().len(), 1);
    }

    #[test]
    fn failed_spawn_rolls_the_charge_back() {
        let arena = FrameArena::new(128).unwrap();
        let counter = CompletionCounter::new();
        let worker = Worker::new(0, 2);
        let ctx = WorkerContext::new(&arena, &counter, &worker);

        let hits = AtomicUsize::new(0);
        let data = &hits as *const _ as *mut ();
        ctx.spawn(bump, data).unwrap();
        ctx.spawn(bump, data).unwrap();

        assert_eq!(ctx.spawn(bump, data), Err(DequeFull { capacity: 2 }));
        assert_eq!(counter.remaining(), 2);
    }

    #[test]
    fn spawn_with_places_payload_in_arena() {
        let arena = FrameArena::new(128).unwrap();
        let counter = CompletionCounter::new();
        let worker = Worker::new(0, 8);
        let ctx = WorkerContext::new(&arena, &counter, &worker);

        ctx.spawn_with(|_, _| {}, 7u64).unwrap();
        assert!(arena.used() >= std::mem::size_of::<u64>());
        assert_eq!(counter.remaining(), 1);
    }
}
