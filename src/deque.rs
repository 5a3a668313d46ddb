//! Bounded work-stealing deque, one per worker.
//!
//! Chase–Lev discipline over a fixed power-of-two ring: the owning worker
//! pushes and pops at the tail (LIFO), any other worker competes to
//! advance the head with a CAS (FIFO). Capacity is fixed; overflow on push
//! is reported, never silent.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{fence, AtomicIsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::DequeFull;
use crate::job::Job;

/// Default slot count for a worker deque. Must be a power of two.
pub const DEFAULT_DEQUE_CAPACITY: usize = 64;

/// Result of a steal attempt.
#[derive(Debug)]
pub enum Steal {
    /// The victim's deque had nothing to take.
    Empty,
    /// Lost a race for the head slot; the caller may try another victim.
    Retry,
    /// Took the oldest job from the victim.
    Success(Job),
}

struct Slot(UnsafeCell<MaybeUninit<Job>>);

/// A fixed-capacity double-ended job queue owned by one worker.
///
/// Indices grow monotonically and are reduced modulo the capacity, so
/// `tail - head` is always the live length. Only the owner moves `tail`;
/// thieves move `head` forward via CAS.
pub struct JobDeque {
    head: CachePadded<AtomicIsize>,
    tail: CachePadded<AtomicIsize>,
    slots: Box<[Slot]>,
    mask: usize,
}

impl JobDeque {
    /// Creates a deque with [`DEFAULT_DEQUE_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DEQUE_CAPACITY)
    }

    /// Creates a deque with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "deque capacity must be a power of two, got {capacity}"
        );
        let slots = (0..capacity)
            .map(|_| Slot(UnsafeCell::new(MaybeUninit::uninit())))
            .collect();
        Self {
            head: CachePadded::new(AtomicIsize::new(0)),
            tail: CachePadded::new(AtomicIsize::new(0)),
            slots,
            mask: capacity - 1,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Jobs currently queued. Approximate under concurrent stealing.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        (tail - head).max(0) as usize
    }

    /// True when no jobs are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    unsafe fn read_slot(&self, index: isize) -> Job {
        (*self.slots[index as usize & self.mask].0.get()).assume_init()
    }

    unsafe fn write_slot(&self, index: isize, job: Job) {
        (*self.slots[index as usize & self.mask].0.get()).write(job);
    }

    /// Pushes a job at the tail.
    ///
    /// The slot write is released by the tail store, so a thief that
    /// observes the new tail also observes the fully written job.
    ///
    /// # Errors
    ///
    /// [`DequeFull`] when `tail - head` has reached the capacity. The check
    /// is exact: the tail cannot move under the owner, so the loaded head
    /// was current at the moment of the comparison.
    ///
    /// # Safety
    ///
    /// Owner only: must be called from the thread that owns this deque.
    pub unsafe fn push(&self, job: Job) -> Result<(), DequeFull> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail - head >= self.capacity() as isize {
            return Err(DequeFull {
                capacity: self.capacity(),
            });
        }

        self.write_slot(tail, job);
        self.tail.store(tail + 1, Ordering::Release);
        Ok(())
    }

    /// Pops the most recently pushed job from the tail.
    ///
    /// When a single job remains, the owner races thieves for it with a
    /// CAS on `head`; the loser walks away empty-handed.
    ///
    /// # Safety
    ///
    /// Owner only: must be called from the thread that owns this deque.
    pub unsafe fn pop(&self) -> Option<Job> {
        let tail = self.tail.load(Ordering::Relaxed) - 1;
        self.tail.store(tail, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        let head = self.head.load(Ordering::Relaxed);

        if head > tail {
            // Already empty; undo the speculative decrement.
            self.tail.store(tail + 1, Ordering::Relaxed);
            return None;
        }

        let job = self.read_slot(tail);
        if head < tail {
            return Some(job);
        }

        // Last element: claim it through head like a thief would.
        let won = self
            .head
            .compare_exchange(head, head + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok();
        self.tail.store(tail + 1, Ordering::Relaxed);
        won.then_some(job)
    }

    /// Steals the oldest job. Callable from any thread.
    pub fn steal(&self) -> Steal {
        let head = self.head.load(Ordering::Acquire);
        fence(Ordering::SeqCst);
        let tail = self.tail.load(Ordering::Acquire);

        if head >= tail {
            return Steal::Empty;
        }

        // Read before claiming. If the CAS below fails the slot may have
        // been overwritten mid-read; the torn value is discarded, never
        // returned.
        let job = unsafe { self.read_slot(head) };

        match self
            .head
            .compare_exchange(head, head + 1, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => Steal::Success(job),
            Err(_) => Steal::Retry,
        }
    }
}

impl Default for JobDeque {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: slot accesses are guarded by the head/tail protocol above; jobs
// are plain Send values.
unsafe impl Send for JobDeque {}
unsafe impl Sync for JobDeque {}
