//! Ergonomic helpers built strictly on the public pool surface.
//!
//! No privileged access: everything here goes through
//! `submit_priority_task`, `get_task_result`, the executor handles, or
//! plain scoped threads.

use std::time::Duration;

use crate::error::PoolError;
use crate::pool::WorkerPool;
use crate::task::{TaskPriority, panic_message};

/// Submit-then-block at the given tier: each call runs as one priority
/// task and the caller waits for its value. Concurrency is observable
/// only relative to other priority work, never to the caller.
pub fn run_with_priority<R, F>(
    pool: &WorkerPool,
    priority: TaskPriority,
    timeout: Option<Duration>,
    f: F,
) -> Result<R, PoolError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let task_id = pool.submit_priority_task(priority, f)?;
    let result = pool.get_task_result(&task_id, timeout)?;
    let value = result.outcome?;
    value
        .downcast::<R>()
        .map(|boxed| *boxed)
        .map_err(|_| PoolError::TypeMismatch)
}

/// Routes a compute-heavy closure through the CPU executor and blocks
/// for its result. The closure and its output cross thread boundaries,
/// hence the `Send + 'static` bounds; no shared mutable state.
pub fn run_cpu<R, F>(pool: &WorkerPool, timeout: Option<Duration>, f: F) -> Result<R, PoolError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    pool.submit_cpu_task(f)?.wait(timeout)
}

/// Runs a blocking closure from async code on the calling runtime's
/// blocking pool, so the event loop is never stalled.
pub async fn unblock<R, F>(f: F) -> Result<R, PoolError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            Err(crate::error::TaskError::Panicked(panic_message(&*payload)).into())
        }
        Err(_) => Err(PoolError::Disconnected),
    }
}

/// Fans independent work out over a throwaway set of scoped worker
/// threads sharing one item channel.
///
/// Results are collected in completion order, not input order; callers
/// needing positional correspondence must embed an index in the payload.
pub fn parallel_map<T, R, F>(f: F, items: Vec<T>, max_workers: usize) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = max_workers.max(1).min(items.len());

    let (item_tx, item_rx) = flume::unbounded();
    for item in items {
        let _ = item_tx.send(item);
    }
    drop(item_tx);

    let (out_tx, out_rx) = flume::unbounded();
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let item_rx = item_rx.clone();
            let out_tx = out_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for item in item_rx.iter() {
                    let _ = out_tx.send(f(item));
                }
            });
        }
        drop(out_tx);
        out_rx.iter().collect()
    })
}
