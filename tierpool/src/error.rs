use std::time::Duration;
use thiserror::Error;

/// Error produced by a submitted closure itself.
///
/// A task failure is data, not control flow: it is captured into the
/// task's result at the worker boundary and surfaces only when the
/// result is retrieved.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Errors related to the priority queue.
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    /// No item became available before the deadline. Distinct from any
    /// "empty value" a task could carry.
    #[error("queue get timed out after {0:?}")]
    Timeout(Duration),
    /// The queue was closed and holds no more items.
    #[error("queue is closed")]
    Closed,
}

/// Errors related to the worker pool and its executors.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("pool is shutting down")]
    ShuttingDown,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    #[error("no result for task {task_id} within {timeout:?}")]
    ResultTimeout { task_id: String, timeout: Duration },
    #[error("handle wait timed out after {0:?}")]
    WaitTimeout(Duration),
    #[error("worker dropped the task before completion")]
    Disconnected,
    #[error("result value was not of the requested type")]
    TypeMismatch,
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Errors related to the async bridge.
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// `run` was called before `start`. Caller misuse, not a task failure.
    #[error("bridge has not been started")]
    NotStarted,
    #[error("failed to start bridge event loop: {0}")]
    StartFailed(String),
    #[error("bridge task timed out after {0:?}")]
    Timeout(Duration),
    /// The scheduled future ended without producing a value (panicked or
    /// was cancelled by shutdown).
    #[error("bridge task failed: {0}")]
    TaskFailed(String),
}

/// Errors surfaced while assembling an [`crate::context::ExecutionContext`].
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
