//! The job record and its execution rule.
//!
//! A job is a plain value: a function pointer, an opaque payload pointer
//! (usually into the frame arena), and the completion counter it is charged
//! against. Plain values copy in and out of deque slots without ownership
//! bookkeeping, which is what lets the whole frame be reclaimed by a single
//! arena reset.

use std::ptr;

use crate::context::WorkerContext;
use crate::counter::CompletionCounter;

/// Signature of a job function.
///
/// `data` is the opaque payload captured at spawn time; `ctx` is the
/// context of the worker currently running the job, through which the job
/// may allocate and [`spawn`](WorkerContext::spawn) children onto its own
/// worker's deque.
pub type JobFn = fn(data: *mut (), ctx: &WorkerContext);

/// A unit of scheduled work.
///
/// Immutable after publication and trivially copyable; deque slots hold
/// these by value.
#[derive(Debug, Clone, Copy)]
pub struct Job {
    func: JobFn,
    data: *mut (),
    counter: *const CompletionCounter,
}

impl Job {
    /// Creates a job that is not charged against any counter.
    ///
    /// Such a job does not hold the frame open: workers may observe a
    /// drained counter and exit before it runs. Counted jobs created
    /// through [`WorkerContext::spawn`] are the normal case.
    pub fn new(func: JobFn, data: *mut ()) -> Self {
        Self {
            func,
            data,
            counter: ptr::null(),
        }
    }

    /// Creates a job charged against `counter`. The caller must have
    /// already recorded the spawn via
    /// [`CompletionCounter::add_spawned`].
    pub fn with_counter(func: JobFn, data: *mut (), counter: &CompletionCounter) -> Self {
        Self {
            func,
            data,
            counter,
        }
    }

    /// The payload pointer this job was built with.
    pub fn data(&self) -> *mut () {
        self.data
    }

    /// Runs the job on the calling thread and pays back its counter unit.
    ///
    /// The function may push children through `ctx` first; because the
    /// children are charged before this job's own decrement, the counter
    /// cannot drain while converted work is still pending.
    ///
    /// # Safety
    ///
    /// `data` must still point to the payload the function expects (the
    /// arena holding it must not have been reset), and `ctx` must belong
    /// to the worker executing this call.
    pub unsafe fn execute(self, ctx: &WorkerContext) {
        (self.func)(self.data, ctx);

        if let Some(counter) = self.counter.as_ref() {
            counter.complete_one();
        }
    }
}

// SAFETY: the payload and counter live in the shared arena or the driver's
// frame state, both of which outlive every worker; jobs migrate between
// threads only through the deque protocol.
unsafe impl Send for Job {}
