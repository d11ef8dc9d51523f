//! Bounded executor: a fixed set of OS worker threads fed by a bounded
//! channel, returning one-shot handles for the submitted closures.
//!
//! Two instances back the pool: one general thread executor and one
//! sized to the CPU count for compute-heavy work. Panics inside a
//! submitted closure are captured into the handle; a failing task can
//! never terminate an executor thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::error::{PoolError, TaskError};
use crate::task::panic_message;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// One-shot handle for a task submitted to a [`ThreadExecutor`].
pub struct TaskHandle<R> {
    rx: flume::Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    /// Blocks until the task finishes or the timeout elapses.
    ///
    /// `timeout = None` waits indefinitely. Distinguishes a timeout
    /// ([`PoolError::WaitTimeout`]), executor teardown before the task
    /// ran ([`PoolError::Disconnected`]), and a panic inside the task.
    pub fn wait(self, timeout: Option<Duration>) -> Result<R, PoolError> {
        let outcome = match timeout {
            Some(t) => self.rx.recv_timeout(t).map_err(|e| match e {
                flume::RecvTimeoutError::Timeout => PoolError::WaitTimeout(t),
                flume::RecvTimeoutError::Disconnected => PoolError::Disconnected,
            })?,
            None => self.rx.recv().map_err(|_| PoolError::Disconnected)?,
        };
        outcome.map_err(PoolError::from)
    }

    /// Non-blocking probe; returns the outcome if the task already finished.
    pub fn try_wait(&self) -> Option<Result<R, TaskError>> {
        self.rx.try_recv().ok()
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").finish()
    }
}

/// Fixed-size pool of OS threads draining a bounded job channel.
pub struct ThreadExecutor {
    name: String,
    tx: Mutex<Option<flume::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadExecutor {
    /// Spawns `size` worker threads. Fails loudly if any thread cannot be
    /// created rather than degrading into a partially-initialized pool.
    pub fn new(name: &str, size: usize, queue_capacity: usize) -> Result<Self, PoolError> {
        let (tx, rx) = flume::bounded::<Job>(queue_capacity);
        let mut workers = Vec::with_capacity(size);
        for worker_id in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, worker_id))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        job();
                    }
                })
                .map_err(|e| PoolError::Spawn(e.to_string()))?;
            workers.push(handle);
        }
        debug!(executor = name, size, "thread executor started");
        Ok(Self {
            name: name.to_string(),
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        })
    }

    /// Submits a closure, returning a handle for its result.
    ///
    /// May block while the feed channel is at capacity. Rejected with
    /// [`PoolError::ShuttingDown`] once the executor has been shut down.
    pub fn submit<R, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let guard = self.tx.lock().unwrap();
        let tx = guard.as_ref().ok_or(PoolError::ShuttingDown)?;
        let (done_tx, done_rx) = flume::bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| TaskError::Panicked(panic_message(&*payload)));
            let _ = done_tx.send(outcome);
        });
        tx.send(job).map_err(|_| PoolError::ShuttingDown)?;
        Ok(TaskHandle { rx: done_rx })
    }

    /// Number of jobs waiting in the feed channel.
    pub fn backlog(&self) -> usize {
        self.tx
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.len())
            .unwrap_or(0)
    }

    /// Drops the feed channel so workers exit after draining queued jobs;
    /// if `wait`, joins every worker thread. Idempotent.
    pub fn shutdown(&self, wait: bool) {
        let tx = self.tx.lock().unwrap().take();
        drop(tx);
        if wait {
            let mut workers = self.workers.lock().unwrap();
            for handle in workers.drain(..) {
                if handle.join().is_err() {
                    error!(executor = %self.name, "executor worker thread panicked");
                }
            }
        }
        debug!(executor = %self.name, wait, "thread executor shut down");
    }
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("name", &self.name)
            .field("backlog", &self.backlog())
            .finish()
    }
}

/// Joins `handle` bounded by `timeout`, polling completion in short
/// steps. Returns false if the thread is still running at the deadline.
pub(crate) fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
    handle.join().is_ok()
}
