//! Timeline-tracked pooling of reusable GPU resources.
//!
//! Short-lived GPU-side objects such as command buffers, semaphores, and
//! descriptor sets may only be reused once the GPU has finished consuming
//! them. [`TimelinePool`] tracks that lifecycle for one kind of resource
//! handle using the timeline values produced by
//! [`Queues::submit`](crate::queues::Queues::submit).
//!
//! # Lifecycle
//!
//! Every handle owned by a pool is in exactly one of three states:
//!
//! ```text
//!          request()             submit(v)
//!   Free ------------> Recording ----------> Pending (tagged with v)
//!    ^                     |                    |
//!    +------ cancel() -----+                    |
//!    +------------- reset(c) with v <= c -------+
//! ```
//!
//! The pool never creates or destroys the underlying GPU objects. Growth is
//! driven externally: the caller creates a new object through the driver and
//! registers it with [`grow`](TimelinePool::grow). Reclaimed handles are
//! yielded back to the caller from [`reset`](TimelinePool::reset) so it can
//! issue whatever per-handle reset call the resource kind requires before the
//! handle is used again.
//!
//! # Ordering
//!
//! Flight records enter the pending queue in non-decreasing timeline-value
//! order because timeline values are assigned under the submitting queue's
//! lock. That lets [`reset`](TimelinePool::reset) stop at the first record
//! that has not completed instead of scanning the whole queue.
//!
//! # Thread safety
//!
//! A pool is intended to be owned and driven by a single caller; it does no
//! internal locking. Wrap it in a mutex if multiple threads must share one.

use crate::error::Error;
use crate::utils::RingDeque;

/// A handle and the timeline value whose completion makes it reusable.
#[derive(Clone, Copy, Debug)]
struct FlightRecord<T> {
    handle: T,
    value: u64,
}

/// A pool of reusable resource handles keyed by a completion timeline.
///
/// Generic over any trivially-copyable handle type — `vk::CommandBuffer`,
/// `vk::Semaphore`, a descriptor set, an index into caller-owned storage.
pub struct TimelinePool<T: Copy> {
    /// Handles immediately available to `request`.
    free: Vec<T>,
    /// Handles handed out for the current batch, most recent last.
    recording: Vec<T>,
    /// Submitted handles in FIFO submission order.
    pending: RingDeque<FlightRecord<T>>,
    /// Largest timeline value ever passed to `submit`.
    last_submitted: u64,
}

impl<T: Copy> TimelinePool<T> {
    /// Creates an empty pool. Register handles with [`grow`](Self::grow).
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            recording: Vec::new(),
            pending: RingDeque::new(),
            last_submitted: 0,
        }
    }

    /// Creates a pool whose free list holds the given handles.
    pub fn with_handles(handles: impl IntoIterator<Item = T>) -> Self {
        let mut pool = Self::new();
        for handle in handles {
            pool.grow(handle);
        }
        pool
    }

    /// Registers an externally created handle as immediately reusable.
    pub fn grow(&mut self, handle: T) {
        self.free.push(handle);
    }

    /// Obtains a handle for recording.
    ///
    /// Re-requesting during the same batch is idempotent: if a handle is
    /// already recording, the most recent one is returned again. Otherwise a
    /// handle is taken from the free list.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if no handle is free. Recover by reclaiming
    /// with [`reset`](Self::reset) or registering new handles with
    /// [`grow`](Self::grow); the pool never allocates on its own.
    pub fn request(&mut self) -> Result<T, Error> {
        if let Some(&handle) = self.recording.last() {
            return Ok(handle);
        }
        let handle = self.free.pop().ok_or(Error::OutOfMemory)?;
        self.recording.push(handle);
        Ok(handle)
    }

    /// Marks every recording handle as submitted with the given timeline value.
    ///
    /// `timeline_value` must be at least as large as every value previously
    /// passed to `submit` on this pool. Submission order and timeline-value
    /// assignment are coupled at the queue, so this holds naturally when the
    /// value comes from a [`SubmitTicket`](crate::queues::SubmitTicket).
    pub fn submit(&mut self, timeline_value: u64) {
        assert!(
            timeline_value >= self.last_submitted,
            "timeline value {} regressed below {}; pending order would break",
            timeline_value,
            self.last_submitted,
        );
        self.last_submitted = timeline_value;
        for handle in self.recording.drain(..) {
            self.pending.push_back(FlightRecord {
                handle,
                value: timeline_value,
            });
        }
    }

    /// Aborts the current recording batch.
    ///
    /// Pops the most recently requested handle back to the free list without
    /// submitting it. Returns the handle, or `None` if nothing was recording.
    pub fn cancel(&mut self) -> Option<T> {
        let handle = self.recording.pop()?;
        self.free.push(handle);
        Some(handle)
    }

    /// Reclaims every pending handle whose timeline value has completed.
    ///
    /// Pops flight records from the front of the pending queue while their
    /// value is `<= completed_value`, returning each handle to the free list
    /// and yielding it so the caller can reset the underlying object. The
    /// scan stops at the first incomplete record.
    ///
    /// The reclaim happens even if the returned iterator is dropped without
    /// being exhausted.
    pub fn reset(&mut self, completed_value: u64) -> Reclaim<'_, T> {
        Reclaim {
            pool: self,
            completed_value,
        }
    }

    /// Unconditionally drains all pending handles back to the free list.
    ///
    /// Only valid once the caller has independently confirmed that all
    /// submitted work has completed, e.g. after
    /// [`Queues::wait_idle`](crate::queues::Queues::wait_idle). Bypasses the
    /// timeline check entirely.
    pub fn wait_idle(&mut self) -> Reclaim<'_, T> {
        self.reset(u64::MAX)
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn recording_len(&self) -> usize {
        self.recording.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total number of handles owned by the pool, across all three states.
    pub fn capacity(&self) -> usize {
        self.free.len() + self.recording.len() + self.pending.len()
    }
}

impl<T: Copy> Default for TimelinePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Draining iterator over handles reclaimed by [`TimelinePool::reset`].
pub struct Reclaim<'a, T: Copy> {
    pool: &'a mut TimelinePool<T>,
    completed_value: u64,
}

impl<T: Copy> Iterator for Reclaim<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let record = self.pool.pending.front()?;
        if record.value > self.completed_value {
            return None;
        }
        let record = self.pool.pending.pop_front()?;
        self.pool.free.push(record.handle);
        Some(record.handle)
    }
}

impl<T: Copy> Drop for Reclaim<'_, T> {
    fn drop(&mut self) {
        while self.next().is_some() {}
    }
}
