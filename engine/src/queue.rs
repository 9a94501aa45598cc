//! Thread-safe FIFO queue of pending transfer jobs.
//!
//! The queue is the only state shared between workers. The mutex is held
//! only across the append/remove step itself, never across the I/O that
//! follows a pop — the lock must not serialize transfers.

use crate::model::TransferJob;
use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO queue of [`TransferJob`]s, safe to share across worker threads.
///
/// `pop` hands each job to exactly one caller (at-most-once delivery).
/// An empty queue is signaled with `None`, not an error.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<TransferJob>>,
}

impl JobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        JobQueue {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a job to the tail. Never blocks on anything but the lock,
    /// never fails.
    pub fn add(&self, job: TransferJob) {
        self.jobs.lock().unwrap().push_back(job);
    }

    /// Remove and return the head, or `None` if no job is pending.
    pub fn pop(&self) -> Option<TransferJob> {
        self.jobs.lock().unwrap().pop_front()
    }

    /// Current length. Advisory only: may be stale immediately under
    /// concurrent access, so use it for monitoring, not control decisions.
    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}
