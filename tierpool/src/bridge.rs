//! # Async Bridge
//!
//! One dedicated OS thread hosting a single current-thread tokio runtime,
//! exposed to synchronous callers through exactly one crossing point:
//! schedule a future and block for its output.
//!
//! ## Lifecycle
//! `start` spins the loop thread up lazily and blocks (bounded) on a
//! readiness signal, so the loop is guaranteed to exist before any
//! scheduling call succeeds. `shutdown` stops the keep-alive task and
//! drops the runtime, which cancels tasks still pending on the loop but
//! not ones already running to completion.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::executor::join_with_timeout;

/// Bound on waiting for loop readiness and on joining the loop thread.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

struct BridgeInner {
    handle: tokio::runtime::Handle,
    stop: Arc<Notify>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Sync-to-async bridge over a dedicated event-loop thread.
#[derive(Default)]
pub struct AsyncBridge {
    inner: Mutex<Option<BridgeInner>>,
}

impl AsyncBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the event-loop thread if it is not already running.
    ///
    /// Blocks the caller (bounded by 5s) until the loop signals
    /// readiness. Idempotent: a second call on a running bridge is a
    /// no-op.
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut guard = self.inner.lock().unwrap();
        if guard.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = flume::bounded::<Result<tokio::runtime::Handle, String>>(1);
        let stop = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("tierpool-bridge".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(runtime.handle().clone()));
                // Keep-alive: park the loop until shutdown is signalled.
                runtime.block_on(async move {
                    stop_signal.notified().await;
                });
                debug!("bridge event loop exiting");
                // Dropping the runtime cancels tasks still pending on it.
            })
            .map_err(|e| BridgeError::StartFailed(e.to_string()))?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(handle)) => {
                *guard = Some(BridgeInner {
                    handle,
                    stop,
                    thread: Some(thread),
                });
                info!("async bridge started");
                Ok(())
            }
            Ok(Err(e)) => Err(BridgeError::StartFailed(e)),
            Err(_) => Err(BridgeError::StartFailed(format!(
                "event loop not ready within {:?}",
                STARTUP_TIMEOUT
            ))),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    /// Schedules `future` onto the bridge loop and blocks the calling
    /// thread until it resolves or the timeout elapses.
    ///
    /// The sole cross-thread submission primitive. A future that returns
    /// `Result` passes its error through untouched in the output; a
    /// panicking future surfaces as [`BridgeError::TaskFailed`]. Calling
    /// before `start` yields [`BridgeError::NotStarted`].
    /// `timeout = None` waits indefinitely.
    pub fn run<F>(&self, future: F, timeout: Option<Duration>) -> Result<F::Output, BridgeError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = {
            let guard = self.inner.lock().unwrap();
            guard
                .as_ref()
                .ok_or(BridgeError::NotStarted)?
                .handle
                .clone()
        };

        let (tx, rx) = flume::bounded(1);
        handle.spawn(async move {
            let _ = tx.send(future.await);
        });

        match timeout {
            Some(t) => rx.recv_timeout(t).map_err(|e| match e {
                flume::RecvTimeoutError::Timeout => BridgeError::Timeout(t),
                flume::RecvTimeoutError::Disconnected => BridgeError::TaskFailed(
                    "task ended without producing a value".to_string(),
                ),
            }),
            None => rx.recv().map_err(|_| {
                BridgeError::TaskFailed("task ended without producing a value".to_string())
            }),
        }
    }

    /// Signals the keep-alive task, cancels still-pending tasks, and
    /// joins the loop thread bounded by 5s. Idempotent; a bridge can be
    /// restarted with `start` afterwards.
    pub fn shutdown(&self) {
        let inner = self.inner.lock().unwrap().take();
        let Some(mut inner) = inner else {
            return;
        };
        inner.stop.notify_one();
        if let Some(thread) = inner.thread.take() {
            if !join_with_timeout(thread, STARTUP_TIMEOUT) {
                warn!("bridge thread did not stop within {:?}", STARTUP_TIMEOUT);
            }
        }
        info!("async bridge stopped");
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AsyncBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncBridge")
            .field("running", &self.is_running())
            .finish()
    }
}
