//! Priority worker: one OS thread draining the priority queue.
//!
//! The loop is dequeue -> execute -> record. An error or panic inside a
//! task is captured into its result and counted as failed; it is never
//! re-raised into the loop, so one failing task cannot terminate a
//! worker thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::QueueError;
use crate::pool::PoolShared;
use crate::task::{Task, TaskResult, panic_message};

/// Dequeue timeout per loop iteration; bounds how long a worker can go
/// without observing the shutdown flag.
const DEQUEUE_SLICE: Duration = Duration::from_millis(200);

pub(crate) struct PriorityWorker {
    id: usize,
    shared: Arc<PoolShared>,
}

impl PriorityWorker {
    pub(crate) fn new(id: usize, shared: Arc<PoolShared>) -> Self {
        Self { id, shared }
    }

    pub(crate) fn run(&self) {
        debug!(worker = self.id, "priority worker started");
        loop {
            if self.shared.is_shutting_down() {
                break;
            }
            match self.shared.queue.get(Some(DEQUEUE_SLICE)) {
                Ok(task) => self.execute(task),
                Err(QueueError::Timeout(_)) => continue,
                Err(QueueError::Closed) => break,
            }
        }
        debug!(worker = self.id, "priority worker stopped");
    }

    fn execute(&self, task: Task) {
        let task_id = task.id;
        let job = task.job;
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(job))
            .map_err(|payload| crate::error::TaskError::Panicked(panic_message(&*payload)));
        let execution_time = started.elapsed();

        match &outcome {
            Ok(_) => {
                self.shared.completed.increment();
            }
            Err(err) => {
                self.shared.failed.increment();
                warn!(worker = self.id, task_id = %task_id, error = %err, "task failed");
            }
        }
        self.shared.exec_micros.add(execution_time.as_micros() as u64);

        self.shared.results.insert(
            task_id.clone(),
            TaskResult {
                task_id,
                outcome,
                execution_time,
                completed_at: Instant::now(),
            },
        );
    }
}
