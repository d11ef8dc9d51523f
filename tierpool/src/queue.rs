//! # Priority Task Queue
//!
//! Four independent FIFO sub-queues (one per [`TaskPriority`] tier)
//! coordinated by a single lock and condition variable, with an O(1)
//! total-size counter readable without the lock.
//!
//! ## Ordering Guarantees
//! - Strict cross-tier ordering: a `get` never returns a lower-tier item
//!   while a higher tier holds one.
//! - FIFO within each tier.
//!
//! ## Design Trade-off
//! Strict tier order is chosen over weighted-fair scheduling because the
//! task categories this engine serves have a real urgency ordering. The
//! accepted cost is that a sustained flood of high-tier work starves
//! lower tiers for as long as it lasts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::QueueError;
use crate::task::{Task, TaskPriority};

/// Longest single wait on the condition variable. Short enough that a
/// blocked `get` notices queue closure promptly.
const WAIT_SLICE: Duration = Duration::from_millis(100);

struct Tiers {
    queues: [VecDeque<Task>; TaskPriority::COUNT],
    closed: bool,
}

/// Multi-level FIFO queue with condition-variable coordination.
pub struct PriorityTaskQueue {
    tiers: Mutex<Tiers>,
    available: Condvar,
    size: AtomicUsize,
    /// Advisory capacity, surfaced through [`capacity`](Self::capacity)
    /// for monitoring. `put` never blocks on it.
    capacity: usize,
}

impl PriorityTaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            tiers: Mutex::new(Tiers {
                queues: [const { VecDeque::new() }; TaskPriority::COUNT],
                closed: false,
            }),
            available: Condvar::new(),
            size: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Appends `task` to its tier's sub-queue and wakes one waiter.
    ///
    /// Never blocks; the configured capacity is advisory. Fails only once
    /// the queue has been closed.
    pub fn put(&self, task: Task) -> Result<(), QueueError> {
        let mut tiers = self.tiers.lock().unwrap();
        if tiers.closed {
            return Err(QueueError::Closed);
        }
        trace!(task_id = %task.id, priority = %task.priority, "enqueueing task");
        tiers.queues[task.priority.index()].push_back(task);
        self.size.fetch_add(1, Ordering::Relaxed);
        drop(tiers);
        self.available.notify_one();
        Ok(())
    }

    /// Removes and returns the head of the highest non-empty tier.
    ///
    /// When all tiers are empty, waits on the condition variable in short
    /// slices until an item arrives, the deadline passes
    /// ([`QueueError::Timeout`]), or the queue is closed and drained
    /// ([`QueueError::Closed`]). `timeout = None` waits indefinitely.
    pub fn get(&self, timeout: Option<Duration>) -> Result<Task, QueueError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut tiers = self.tiers.lock().unwrap();
        loop {
            // Critical first, Low last.
            for queue in tiers.queues.iter_mut().rev() {
                if let Some(task) = queue.pop_front() {
                    self.size.fetch_sub(1, Ordering::Relaxed);
                    return Ok(task);
                }
            }

            if tiers.closed {
                return Err(QueueError::Closed);
            }

            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        // Unwrap is fine: a deadline implies a timeout was given.
                        return Err(QueueError::Timeout(timeout.unwrap()));
                    }
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            let (guard, _) = self.available.wait_timeout(tiers, wait).unwrap();
            tiers = guard;
        }
    }

    /// Closes the queue: further `put` calls fail, and `get` drains the
    /// remaining items before reporting [`QueueError::Closed`].
    pub fn close(&self) {
        let mut tiers = self.tiers.lock().unwrap();
        tiers.closed = true;
        drop(tiers);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.tiers.lock().unwrap().closed
    }

    /// Total number of queued items across all tiers.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queued items in one tier.
    pub fn len_of(&self, priority: TaskPriority) -> usize {
        self.tiers.lock().unwrap().queues[priority.index()].len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for PriorityTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityTaskQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{BoxedValue, next_task_id};

    fn noop_task(priority: TaskPriority) -> Task {
        Task::new(
            next_task_id(),
            priority,
            Box::new(|| Box::new(()) as BoxedValue),
        )
    }

    #[test]
    fn empty_get_times_out() {
        let queue = PriorityTaskQueue::new(16);
        let started = Instant::now();
        let result = queue.get(Some(Duration::from_millis(50)));
        assert!(matches!(result, Err(QueueError::Timeout(_))));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn put_after_close_is_rejected() {
        let queue = PriorityTaskQueue::new(16);
        queue.close();
        assert!(matches!(
            queue.put(noop_task(TaskPriority::Normal)),
            Err(QueueError::Closed)
        ));
    }

    #[test]
    fn closed_queue_drains_before_reporting_closed() {
        let queue = PriorityTaskQueue::new(16);
        queue.put(noop_task(TaskPriority::Low)).unwrap();
        queue.close();
        assert!(queue.get(Some(Duration::from_millis(10))).is_ok());
        assert!(matches!(
            queue.get(Some(Duration::from_millis(10))),
            Err(QueueError::Closed)
        ));
    }
}
