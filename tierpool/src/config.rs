use std::time::Duration;

/// Immutable configuration snapshot for a [`crate::pool::WorkerPool`].
///
/// Captured at construction and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of threads in the general thread executor. Half of this
    /// (at least one) also becomes the number of priority workers.
    pub max_workers: usize,

    /// Number of threads in the CPU-bound executor.
    pub cpu_workers: usize,

    /// Capacity of the executor feed channels; advisory for the priority
    /// queue, which never blocks on it.
    pub queue_capacity: usize,

    /// Cadence of the monitoring/eviction thread. Zero disables it.
    pub monitor_interval: Duration,

    /// Completed-task store size the monitor trims back towards.
    pub result_capacity: usize,

    /// Number of oldest entries evicted in one monitor pass once the
    /// store exceeds `result_capacity`.
    pub evict_batch: usize,

    /// Polling cadence of `get_task_result`.
    pub result_poll_interval: Duration,

    /// Per-thread join bound during `shutdown(wait: true)`.
    pub worker_join_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            cpu_workers: num_cpus::get(),
            queue_capacity: 10_000,
            monitor_interval: Duration::from_secs(5),
            result_capacity: 1000,
            evict_batch: 200,
            result_poll_interval: Duration::from_millis(100),
            worker_join_timeout: Duration::from_secs(2),
        }
    }
}

impl PoolConfig {
    /// Number of dedicated priority-worker threads this config yields.
    pub fn priority_workers(&self) -> usize {
        (self.max_workers / 2).max(1)
    }
}

/// Default general-executor size: `min(32, cpu_count + 4)`.
pub fn default_max_workers() -> usize {
    (num_cpus::get() + 4).min(32)
}
