//! # framejob — fork/join scheduling over a per-frame bump arena
//!
//! A frame-scoped task scheduler: short-lived job payloads are carved from
//! a shared linear arena, a pool of workers drains per-worker deques under
//! a work-stealing discipline, and a single completion counter detects the
//! moment the whole frame has drained so the arena can be reclaimed in one
//! reset.
//!
//! The two halves are deliberately coupled. Because every payload dies at
//! the frame boundary, jobs can be plain copyable values with raw payload
//! pointers: no per-job free, no reference counts, no destructor chains.
//!
//! ## Architecture
//!
//! - **[`FrameArena`]**: CAS-bumped linear allocator, reset once per frame
//! - **[`Job`]**: function pointer + opaque payload + counter back-pointer
//! - **[`CompletionCounter`]**: outstanding-work count; drained means done
//! - **[`JobDeque`]**: bounded Chase–Lev deque, one per worker
//! - **[`Worker`]** / **[`WorkerContext`]**: seat identity and the
//!   capabilities handed to running jobs (allocate, spawn children)
//! - **[`FrameScheduler`]**: seeds worker 0, fans out threads, joins,
//!   resets
//!
//! ## Example
//!
//! ```
//! use framejob::{FrameScheduler, WorkerContext};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct SumTask {
//!     values: [u64; 3],
//!     result: *const AtomicU64,
//! }
//!
//! fn sum_job(data: *mut (), _ctx: &WorkerContext) {
//!     // SAFETY: the payload lives in the frame arena until the frame drains.
//!     let task = unsafe { &*(data as *const SumTask) };
//!     let total: u64 = task.values.iter().sum();
//!     // SAFETY: the result slot outlives the frame.
//!     unsafe { &*task.result }.store(total, Ordering::Relaxed);
//! }
//!
//! let mut scheduler = FrameScheduler::with_worker_count(4096, 2)?;
//! let result = AtomicU64::new(0);
//!
//! scheduler.run_frame(|ctx| {
//!     ctx.spawn_with(sum_job, SumTask { values: [1, 2, 3], result: &result })
//! })?;
//!
//! assert_eq!(result.load(Ordering::Relaxed), 6);
//! # Ok::<(), framejob::FrameError>(())
//! ```

pub mod arena;
pub mod context;
pub mod counter;
pub mod deque;
pub mod error;
pub mod job;
pub mod scheduler;
#[cfg(feature = "stats")]
pub mod stats;
pub mod worker;

pub use arena::FrameArena;
pub use context::WorkerContext;
pub use counter::CompletionCounter;
pub use deque::{JobDeque, Steal, DEFAULT_DEQUE_CAPACITY};
pub use error::{ArenaError, DequeFull, FrameError};
pub use job::{Job, JobFn};
pub use scheduler::{FrameScheduler, SchedulerOptions};
#[cfg(feature = "stats")]
pub use stats::StatsSnapshot;
pub use worker::Worker;
