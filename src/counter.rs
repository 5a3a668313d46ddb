//! Frame-wide completion counter.
//!
//! One counter tracks every outstanding job in a frame. Spawning charges
//! it, finishing pays it back, and a drained counter is the scheduler's
//! termination signal.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Counts jobs that have been spawned but have not finished running.
///
/// A job that subdivides charges the counter once per child before pushing
/// them and then pays back its own unit when its function returns, so
/// `remaining` always equals the number of jobs whose terminal computation
/// has not yet completed. The release decrement paired with the acquire
/// load in [`remaining`](CompletionCounter::remaining) makes every finished
/// job's writes visible to whoever observes zero.
#[derive(Debug, Default)]
pub struct CompletionCounter {
    remaining: CachePadded<AtomicUsize>,
}

impl CompletionCounter {
    /// Creates a counter with no outstanding work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `n` newly spawned jobs. Called before the jobs are pushed,
    /// so the counter can never under-report outstanding work.
    pub fn add_spawned(&self, n: usize) {
        self.remaining.fetch_add(n, Ordering::Relaxed);
    }

    /// Records one finished job, releasing its writes to any thread that
    /// subsequently observes the counter.
    pub fn complete_one(&self) {
        let previous = self.remaining.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "completion counter underflow");
    }

    /// Number of jobs still outstanding, with acquire ordering.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// True once every spawned job has finished.
    pub fn is_drained(&self) -> bool {
        self.remaining() == 0
    }

    /// Forgets all outstanding work. Only used to scrub a frame whose
    /// seeding failed before any worker started.
    pub(crate) fn clear(&self) {
        self.remaining.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_drained() {
        let counter = CompletionCounter::new();
        assert_eq!(counter.remaining(), 0);
        assert!(counter.is_drained());
    }

    #[test]
    fn spawn_and_complete_balance() {
        let counter = CompletionCounter::new();

        counter.add_spawned(3);
        assert_eq!(counter.remaining(), 3);
        assert!(!counter.is_drained());

        counter.complete_one();
        counter.complete_one();
        assert_eq!(counter.remaining(), 1);

        counter.complete_one();
        assert!(counter.is_drained());
    }

    #[test]
    fn subdivision_charges_before_paying_back() {
        let counter = CompletionCounter::new();
        counter.add_spawned(1);

        // A subdividing job converts itself into two children: +2 first,
        // then -1 for its own return. The counter never touches zero in
        // between, which is what keeps idle workers from exiting early.
        counter.add_spawned(2);
        assert_eq!(counter.remaining(), 3);
        counter.complete_one();
        assert_eq!(counter.remaining(), 2);
    }
}
