//! Monitoring thread: periodic stats snapshot plus batch eviction of the
//! completed-task store.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::pool::PoolShared;

/// Sleep slice between shutdown checks while waiting out the interval.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

pub(crate) struct Monitor {
    shared: Arc<PoolShared>,
}

impl Monitor {
    pub(crate) fn new(shared: Arc<PoolShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn run(&self) {
        let interval = self.shared.config.monitor_interval;
        debug!(?interval, "pool monitor started");
        while self.sleep_interval(interval) {
            self.evict_oldest();
            debug!(
                submitted = self.shared.submitted.value(),
                completed = self.shared.completed.value(),
                failed = self.shared.failed.value(),
                queue_depth = self.shared.queue.len(),
                stored_results = self.shared.results.len(),
                "worker pool stats"
            );
        }
        debug!("pool monitor stopped");
    }

    /// Sleeps through one interval in short slices; returns false once
    /// shutdown has begun.
    fn sleep_interval(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if self.shared.is_shutting_down() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }

    /// Evicts the oldest batch of completed results once the store
    /// exceeds its capacity, bringing the size back towards the cap in a
    /// single pass.
    fn evict_oldest(&self) {
        let capacity = self.shared.config.result_capacity;
        if self.shared.results.len() <= capacity {
            return;
        }
        let mut entries = self
            .shared
            .results
            .project(|task_id, result| (task_id.clone(), result.completed_at));
        entries.sort_by_key(|(_, completed_at)| *completed_at);
        let batch = self.shared.config.evict_batch.min(entries.len());
        for (task_id, _) in entries.into_iter().take(batch) {
            self.shared.results.remove(&task_id);
        }
        info!(evicted = batch, remaining = self.shared.results.len(), "evicted oldest task results");
    }
}
