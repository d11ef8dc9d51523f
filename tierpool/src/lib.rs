// tierpool: priority-tiered in-process task execution engine.
//
// Combines a four-tier priority scheduler with dedicated worker threads,
// two bounded executors (general and CPU-bound), and a single
// dedicated-thread event loop bridged to synchronous callers.

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod helpers;
pub mod logging;
pub mod pool;
pub mod queue;
pub mod sync;
pub mod task;

// Re-export the public surface collaborators actually use.
pub use bridge::AsyncBridge;
pub use config::PoolConfig;
pub use context::{ExecutionContext, ShutdownGuard};
pub use error::{BridgeError, ContextError, PoolError, QueueError, TaskError};
pub use executor::TaskHandle;
pub use helpers::{parallel_map, run_cpu, run_with_priority, unblock};
pub use pool::{PoolState, PoolStats, WorkerPool};
pub use queue::PriorityTaskQueue;
pub use task::{BoxedValue, Task, TaskPriority, TaskResult};
