//! Process lifecycle glue: one explicit context object owning the pool
//! and the bridge, constructed once at startup and passed to
//! collaborators, plus a drop adapter for environments that expect
//! automatic cleanup on exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::bridge::AsyncBridge;
use crate::config::PoolConfig;
use crate::error::ContextError;
use crate::pool::WorkerPool;

/// Owns the engine's long-lived components for one process.
pub struct ExecutionContext {
    pool: WorkerPool,
    bridge: AsyncBridge,
    stopped: AtomicBool,
}

impl ExecutionContext {
    /// Builds the pool and a started bridge. Fails loudly if either
    /// cannot come up.
    pub fn new(config: PoolConfig) -> Result<Arc<Self>, ContextError> {
        let pool = WorkerPool::new(config)?;
        let bridge = AsyncBridge::new();
        bridge.start()?;
        Ok(Arc::new(Self {
            pool,
            bridge,
            stopped: AtomicBool::new(false),
        }))
    }

    pub fn with_defaults() -> Result<Arc<Self>, ContextError> {
        Self::new(PoolConfig::default())
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn bridge(&self) -> &AsyncBridge {
        &self.bridge
    }

    /// Exactly-once teardown: `pool.shutdown(wait: false)` followed by
    /// `bridge.shutdown()`. Every later call is a no-op, so wiring this
    /// into several cleanup paths is safe.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("execution context shutting down");
        self.pool.shutdown(false);
        self.bridge.shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("pool", &self.pool)
            .field("bridge", &self.bridge)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Drop adapter invoking [`ExecutionContext::shutdown`], for callers that
/// want cleanup tied to scope exit.
pub struct ShutdownGuard {
    context: Arc<ExecutionContext>,
}

impl ShutdownGuard {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.context.shutdown();
    }
}
