//! # Worker Pool
//!
//! The scheduler at the center of the engine. It owns:
//! - a bounded general thread executor and a bounded CPU executor,
//! - `max_workers / 2` dedicated priority-worker threads draining the
//!   [`PriorityTaskQueue`],
//! - a bounded completed-task store consumed by polling,
//! - an active-task registry for bulk waiting on executor handles,
//! - one monitoring/eviction thread.
//!
//! ## State Machine
//! `Created -> Running -> ShuttingDown -> Stopped`, forward-only.
//!
//! ## Ordering Guarantees
//! Strict cross-tier ordering and FIFO within a tier on the priority
//! path. No ordering is guaranteed between the priority path, the thread
//! executor, and the CPU executor; they are independent execution
//! domains with independent completion order.

mod monitor;
mod registry;
mod worker;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::executor::{TaskHandle, ThreadExecutor, join_with_timeout};
use crate::queue::PriorityTaskQueue;
use crate::sync::{Counter, SharedMap};
use crate::task::{BoxedValue, Task, TaskFn, TaskPriority, TaskResult, next_task_id};

use self::monitor::Monitor;
use self::registry::ActiveTasks;
use self::worker::PriorityWorker;

/// Pool lifecycle states. Transitions are irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl PoolState {
    fn from_usize(value: usize) -> Self {
        match value {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::ShuttingDown,
            _ => PoolState::Stopped,
        }
    }
}

/// Side-effect-free snapshot of pool activity.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Depth of the priority queue.
    pub queue_depth: usize,
    /// Executor tasks registered and not yet finished.
    pub active_handles: usize,
    /// Completed results currently held in the store.
    pub stored_results: usize,
    pub avg_execution_time: Duration,
    pub priority_workers: usize,
    pub max_workers: usize,
    pub state: PoolState,
}

/// State shared between the pool facade, its worker threads, and the
/// monitor. The queue and the result store are the only cross-thread
/// mutable structures in the core, and both are reachable only through
/// their synchronized interfaces.
pub(crate) struct PoolShared {
    pub(crate) config: PoolConfig,
    pub(crate) queue: PriorityTaskQueue,
    pub(crate) results: SharedMap<String, TaskResult>,
    pub(crate) submitted: Counter,
    pub(crate) completed: Counter,
    pub(crate) failed: Counter,
    /// Accumulated task execution time, for the average in stats.
    pub(crate) exec_micros: Counter,
    pub(crate) registry: ActiveTasks,
    state: AtomicUsize,
}

impl PoolShared {
    pub(crate) fn state(&self) -> PoolState {
        PoolState::from_usize(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.state.load(Ordering::SeqCst) >= PoolState::ShuttingDown as usize
    }
}

/// Deregisters an executor task when its closure finishes, including by
/// panic (drop runs during unwind).
struct CompletionToken {
    shared: Arc<PoolShared>,
    token: u64,
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.shared.registry.complete(self.token);
    }
}

/// Priority-tiered task scheduler over bounded executors.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    thread_executor: ThreadExecutor,
    cpu_executor: ThreadExecutor,
    workers: Mutex<Vec<JoinHandle<()>>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Builds the pool and spawns all of its threads.
    ///
    /// Resource exhaustion here (inability to create a thread) fails
    /// loudly and immediately; a partially-initialized pool is never
    /// returned.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let shared = Arc::new(PoolShared {
            queue: PriorityTaskQueue::new(config.queue_capacity),
            results: SharedMap::new(),
            submitted: Counter::new(),
            completed: Counter::new(),
            failed: Counter::new(),
            exec_micros: Counter::new(),
            registry: ActiveTasks::new(),
            state: AtomicUsize::new(PoolState::Created as usize),
            config,
        });

        let thread_executor = ThreadExecutor::new(
            "tierpool-thread",
            shared.config.max_workers,
            shared.config.queue_capacity,
        )?;
        let cpu_executor = ThreadExecutor::new(
            "tierpool-cpu",
            shared.config.cpu_workers,
            shared.config.queue_capacity,
        )?;

        let mut workers = Vec::with_capacity(shared.config.priority_workers());
        for worker_id in 0..shared.config.priority_workers() {
            let worker = PriorityWorker::new(worker_id, Arc::clone(&shared));
            let handle = thread::Builder::new()
                .name(format!("tierpool-priority-{}", worker_id))
                .spawn(move || worker.run())
                .map_err(|e| {
                    // Let already-spawned workers exit instead of leaking them.
                    shared.queue.close();
                    PoolError::Spawn(e.to_string())
                })?;
            workers.push(handle);
        }

        let monitor = if shared.config.monitor_interval.is_zero() {
            None
        } else {
            let monitor = Monitor::new(Arc::clone(&shared));
            Some(
                thread::Builder::new()
                    .name("tierpool-monitor".to_string())
                    .spawn(move || monitor.run())
                    .map_err(|e| {
                        shared.queue.close();
                        PoolError::Spawn(e.to_string())
                    })?,
            )
        };

        shared
            .state
            .store(PoolState::Running as usize, Ordering::SeqCst);
        info!(
            priority_workers = shared.config.priority_workers(),
            max_workers = shared.config.max_workers,
            cpu_workers = shared.config.cpu_workers,
            "worker pool started"
        );

        Ok(Self {
            shared,
            thread_executor,
            cpu_executor,
            workers: Mutex::new(workers),
            monitor: Mutex::new(monitor),
        })
    }

    /// Enqueues a closure at the given tier and returns its task id
    /// immediately, never blocking on execution.
    pub fn submit_priority_task<R, F>(
        &self,
        priority: TaskPriority,
        f: F,
    ) -> Result<String, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.shared.state() != PoolState::Running {
            return Err(PoolError::ShuttingDown);
        }
        let task_id = next_task_id();
        let job: TaskFn = Box::new(move || Box::new(f()) as BoxedValue);
        self.shared
            .queue
            .put(Task::new(task_id.clone(), priority, job))
            .map_err(|_| PoolError::ShuttingDown)?;
        self.shared.submitted.increment();
        Ok(task_id)
    }

    /// Submits a closure to the general thread executor.
    pub fn submit_thread_task<R, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.submit_to(&self.thread_executor, f)
    }

    /// Submits a compute-heavy closure to the CPU executor.
    pub fn submit_cpu_task<R, F>(&self, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.submit_to(&self.cpu_executor, f)
    }

    fn submit_to<R, F>(&self, executor: &ThreadExecutor, f: F) -> Result<TaskHandle<R>, PoolError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.shared.state() != PoolState::Running {
            return Err(PoolError::ShuttingDown);
        }
        let token = self.shared.registry.register();
        let guard = CompletionToken {
            shared: Arc::clone(&self.shared),
            token,
        };
        executor.submit(move || {
            let _guard = guard;
            f()
        })
    }

    /// Polls the completed-task store until the result for `task_id`
    /// appears, then removes and returns it; exactly one caller can
    /// observe a given result.
    ///
    /// The fixed polling cadence trades a small latency tax for not
    /// needing a dedicated synchronization object per task.
    /// `timeout = None` waits indefinitely.
    pub fn get_task_result(
        &self,
        task_id: &str,
        timeout: Option<Duration>,
    ) -> Result<TaskResult, PoolError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let poll = self.shared.config.result_poll_interval;
        loop {
            if let Some(result) = self.shared.results.remove(task_id) {
                return Ok(result);
            }
            match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(PoolError::ResultTimeout {
                            task_id: task_id.to_string(),
                            // Deadline implies the timeout was given.
                            timeout: timeout.unwrap(),
                        });
                    }
                    thread::sleep(remaining.min(poll));
                }
                None => thread::sleep(poll),
            }
        }
    }

    /// Waits for every executor task registered at call time. Returns
    /// false on timeout instead of erroring, so the caller can proceed
    /// with partial results.
    pub fn wait_for_tasks(&self, timeout: Option<Duration>) -> bool {
        self.shared.registry.wait_all(timeout)
    }

    /// Pure, derived snapshot; no side effects.
    pub fn get_stats(&self) -> PoolStats {
        let completed = self.shared.completed.value();
        let failed = self.shared.failed.value();
        let executed = completed + failed;
        let avg_execution_time = if executed == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.shared.exec_micros.value() / executed)
        };
        PoolStats {
            submitted: self.shared.submitted.value(),
            completed,
            failed,
            queue_depth: self.shared.queue.len(),
            active_handles: self.shared.registry.len(),
            stored_results: self.shared.results.len(),
            avg_execution_time,
            priority_workers: self.shared.config.priority_workers(),
            max_workers: self.shared.config.max_workers,
            state: self.shared.state(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Begins shutdown. Later submissions are rejected with
    /// [`PoolError::ShuttingDown`].
    ///
    /// With `wait`, joins every priority worker bounded by the configured
    /// per-thread timeout before shutting the executors down with the
    /// same flag. Never errors merely because work is still in flight;
    /// safe to call again (later calls are no-ops).
    pub fn shutdown(&self, wait: bool) {
        let previous = self.shared.state.compare_exchange(
            PoolState::Running as usize,
            PoolState::ShuttingDown as usize,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if previous.is_err() {
            debug!("pool shutdown already in progress");
            return;
        }
        info!(wait, "worker pool shutting down");
        self.shared.queue.close();

        if wait {
            let join_timeout = self.shared.config.worker_join_timeout;
            let mut workers = self.workers.lock().unwrap();
            for handle in workers.drain(..) {
                let name = handle.thread().name().unwrap_or("?").to_string();
                if !join_with_timeout(handle, join_timeout) {
                    warn!(worker = %name, ?join_timeout, "priority worker did not stop in time");
                }
            }
            if let Some(handle) = self.monitor.lock().unwrap().take() {
                if !join_with_timeout(handle, join_timeout) {
                    warn!("monitor thread did not stop in time");
                }
            }
        }

        self.thread_executor.shutdown(wait);
        self.cpu_executor.shutdown(wait);
        self.shared
            .state
            .store(PoolState::Stopped as usize, Ordering::SeqCst);
        info!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // No-op if the owner already shut the pool down.
        self.shutdown(false);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("queue_depth", &self.shared.queue.len())
            .field("priority_workers", &self.shared.config.priority_workers())
            .finish()
    }
}
