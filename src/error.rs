//! Error types for the arena, the worker deques, and the frame driver.

use thiserror::Error;

/// Errors produced by [`FrameArena`](crate::FrameArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The system allocator refused to provide the backing region.
    #[error("system allocator refused a backing region of {capacity} bytes")]
    AllocFailed { capacity: usize },

    /// The arena has no room for the requested allocation. The bump offset
    /// is left unchanged.
    #[error("arena exhausted: {requested} bytes (align {align}) requested, {remaining} free")]
    Exhausted {
        requested: usize,
        align: usize,
        remaining: usize,
    },
}

/// A worker deque was asked to accept a job beyond its fixed capacity.
///
/// This indicates the deque was undersized for the workload and is fatal
/// for the frame: the job that hit it cannot convert itself into children,
/// so the frame's completion accounting can no longer balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker deque full (capacity {capacity})")]
pub struct DequeFull {
    pub capacity: usize,
}

/// Errors surfaced by [`FrameScheduler::run_frame`](crate::FrameScheduler::run_frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Deque(#[from] DequeFull),

    /// All workers exited but the completion counter never reached zero.
    /// This is a counting bug in the workload, not a recoverable state.
    #[error("frame did not drain: {remaining} jobs still outstanding after join")]
    NotDrained { remaining: usize },
}
