//! Active-task registry for bulk waiting on executor handles.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Tracks in-flight executor tasks by token so `wait_for_tasks` can wait
/// for everything registered at call time, ignoring later submissions.
#[derive(Debug, Default)]
pub(crate) struct ActiveTasks {
    inner: Mutex<HashSet<u64>>,
    done: Condvar,
    seq: AtomicU64,
}

impl ActiveTasks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new in-flight task and returns its token.
    pub(crate) fn register(&self) -> u64 {
        let token = self.seq.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().unwrap().insert(token);
        token
    }

    /// Marks a task finished and wakes bulk waiters.
    pub(crate) fn complete(&self, token: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.remove(&token);
        drop(inner);
        self.done.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Blocks until every task registered at call time has completed.
    /// Returns false on timeout rather than erroring, so the caller can
    /// proceed with partial results.
    pub(crate) fn wait_all(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut inner = self.inner.lock().unwrap();
        let pending: HashSet<u64> = inner.clone();
        loop {
            if inner.is_disjoint(&pending) {
                return true;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    remaining.min(Duration::from_millis(100))
                }
                None => Duration::from_millis(100),
            };
            let (guard, _) = self.done.wait_timeout(inner, wait).unwrap();
            inner = guard;
        }
    }
}
