//! Workers and the work-search loop.
//!
//! A worker is an identity plus exclusive ownership of one deque's tail.
//! The loop drains local work first, then tries to steal from randomized
//! victims, and exits once the frame counter reads zero.

use rand::Rng;

use crossbeam_utils::Backoff;
use tracing::trace;

use crate::context::WorkerContext;
use crate::counter::CompletionCounter;
use crate::deque::{JobDeque, Steal};
use crate::job::Job;
#[cfg(feature = "stats")]
use crate::stats::WorkerStats;

/// Give up on a contended victim after this many raced steal attempts and
/// move on to the next one.
const STEAL_RETRIES: usize = 3;

/// A scheduling seat: an id in `[0, worker_count)` and the deque whose
/// tail side belongs exclusively to the thread running this seat.
pub struct Worker {
    id: usize,
    deque: JobDeque,
    #[cfg(feature = "stats")]
    stats: WorkerStats,
}

impl Worker {
    pub(crate) fn new(id: usize, deque_capacity: usize) -> Self {
        Self {
            id,
            deque: JobDeque::with_capacity(deque_capacity),
            #[cfg(feature = "stats")]
            stats: WorkerStats::new(),
        }
    }

    /// This worker's identity.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The worker's deque. Stealing through it is allowed from any thread;
    /// pushing and popping only from the owning thread.
    pub fn deque(&self) -> &JobDeque {
        &self.deque
    }

    #[cfg(feature = "stats")]
    pub(crate) fn stats(&self) -> &WorkerStats {
        &self.stats
    }
}

/// Runs worker `index`'s search loop until the frame drains.
///
/// Order per round: local pop, then one randomized pass over the other
/// workers' deques, then the termination check. The backoff between empty
/// rounds keeps the final spin short of a pure busy-wait.
pub(crate) fn worker_loop(
    index: usize,
    workers: &[Worker],
    contexts: &[WorkerContext],
    counter: &CompletionCounter,
) {
    let me = &workers[index];
    let ctx = &contexts[index];
    let mut rng = rand::thread_rng();
    let backoff = Backoff::new();

    trace!(worker = index, "worker online");

    loop {
        // SAFETY: this thread is the owner of `me`'s deque for the whole
        // frame, and payloads stay live until the post-join arena reset.
        if let Some(job) = unsafe { me.deque.pop() } {
            #[cfg(feature = "stats")]
            me.stats.record_job();
            // SAFETY: as above.
            unsafe { job.execute(ctx) };
            backoff.reset();
            continue;
        }

        if workers.len() > 1 {
            if let Some(job) = steal_round(index, workers, &mut rng) {
                trace!(worker = index, "stole a job");
                #[cfg(feature = "stats")]
                {
                    me.stats.record_steal_success();
                    me.stats.record_job();
                }
                // SAFETY: stolen jobs run under the same frame-liveness
                // guarantees as local ones, with this worker's context.
                unsafe { job.execute(ctx) };
                backoff.reset();
                continue;
            }
            #[cfg(feature = "stats")]
            me.stats.record_steal_miss();
        }

        if counter.is_drained() {
            trace!(worker = index, "frame drained, worker exiting");
            return;
        }

        backoff.snooze();
    }
}

/// One pass over the other workers, starting from a random victim.
/// Returns the first job successfully stolen, if any.
fn steal_round(index: usize, workers: &[Worker], rng: &mut impl Rng) -> Option<Job> {
    let count = workers.len();
    let start = rng.gen_range(0..count);

    for offset in 0..count {
        let victim = (start + offset) % count;
        if victim == index {
            continue;
        }

        for _ in 0..STEAL_RETRIES {
            match workers[victim].deque().steal() {
                Steal::Success(job) => return Some(job),
                Steal::Retry => continue,
                Steal::Empty => break,
            }
        }
    }

    None
}
