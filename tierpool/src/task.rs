//! Task data model: priorities, units of work, and their outcomes.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::{PoolError, TaskError};

/// Type-erased value produced by a task, downcast by the retrieving caller.
pub type BoxedValue = Box<dyn Any + Send>;

/// The boxed closure a task executes. Runs exactly once on exactly one worker.
pub type TaskFn = Box<dyn FnOnce() -> BoxedValue + Send + 'static>;

/// Urgency tier for priority tasks.
///
/// The tier only decides which sub-queue is drained first; it never
/// preempts work that is already running. Sustained high-tier load can
/// starve lower tiers indefinitely, which is the accepted trade-off of
/// strict tiering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl TaskPriority {
    pub const COUNT: usize = 4;

    /// Sub-queue index: Low = 0 .. Critical = 3.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A unit of work while it sits in the queue.
///
/// Ownership moves submitter -> queue -> exactly one worker; the task is
/// destroyed once its result has been recorded.
pub struct Task {
    pub id: String,
    pub priority: TaskPriority,
    pub job: TaskFn,
    pub submitted_at: Instant,
}

impl Task {
    pub fn new(id: String, priority: TaskPriority, job: TaskFn) -> Self {
        Self {
            id,
            priority,
            job,
            submitted_at: Instant::now(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Outcome of one priority task. Exactly one is recorded per submission.
pub struct TaskResult {
    pub task_id: String,
    pub outcome: Result<BoxedValue, TaskError>,
    pub execution_time: Duration,
    pub completed_at: Instant,
}

impl TaskResult {
    pub fn is_err(&self) -> bool {
        self.outcome.is_err()
    }

    /// Consumes the result, downcasting the carried value to `T`.
    pub fn into_value<T: 'static>(self) -> Result<T, PoolError> {
        match self.outcome {
            Ok(value) => value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| PoolError::TypeMismatch),
            Err(err) => Err(err.into()),
        }
    }
}

impl fmt::Debug for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskResult")
            .field("task_id", &self.task_id)
            .field("is_err", &self.is_err())
            .field("execution_time", &self.execution_time)
            .finish()
    }
}

static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generates a process-unique task id.
///
/// The microsecond timestamp keeps ids roughly sortable for humans; the
/// monotonic sequence number is what guarantees uniqueness under load.
pub fn next_task_id() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let seq = TASK_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("task-{}-{}", micros, seq)
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn priority_tiers_are_totally_ordered() {
        assert!(TaskPriority::Low < TaskPriority::Normal);
        assert!(TaskPriority::Normal < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Critical);
    }

    #[test]
    fn task_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| (0..500).map(|_| next_task_id()).collect::<Vec<_>>()))
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate task id generated");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn into_value_downcasts() {
        let result = TaskResult {
            task_id: "t".to_string(),
            outcome: Ok(Box::new(42u32)),
            execution_time: Duration::from_millis(1),
            completed_at: Instant::now(),
        };
        assert_eq!(result.into_value::<u32>().unwrap(), 42);
    }
}
