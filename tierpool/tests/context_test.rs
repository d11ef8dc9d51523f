// Integration tests for the execution context lifecycle.

use std::time::Duration;

use tierpool::config::PoolConfig;
use tierpool::context::{ExecutionContext, ShutdownGuard};
use tierpool::error::PoolError;
use tierpool::pool::PoolState;
use tierpool::task::TaskPriority;

fn small_config() -> PoolConfig {
    PoolConfig {
        max_workers: 2,
        cpu_workers: 1,
        monitor_interval: Duration::ZERO,
        result_poll_interval: Duration::from_millis(10),
        ..PoolConfig::default()
    }
}

#[test]
fn context_wires_pool_and_bridge_together() {
    let context = ExecutionContext::new(small_config()).unwrap();

    let task_id = context
        .pool()
        .submit_priority_task(TaskPriority::Normal, || 11)
        .unwrap();
    let result = context
        .pool()
        .get_task_result(&task_id, Some(Duration::from_secs(2)))
        .unwrap();
    assert_eq!(result.into_value::<i32>().unwrap(), 11);

    let bridged = context
        .bridge()
        .run(async { "loop ready" }, Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(bridged, "loop ready");

    context.shutdown();
}

#[test]
fn shutdown_runs_exactly_once() {
    let context = ExecutionContext::new(small_config()).unwrap();
    assert!(!context.is_stopped());

    context.shutdown();
    assert!(context.is_stopped());
    assert_eq!(context.pool().state(), PoolState::Stopped);
    assert!(!context.bridge().is_running());

    // Re-invocation is a no-op, matching idempotent exit-hook semantics.
    context.shutdown();
    assert!(matches!(
        context
            .pool()
            .submit_priority_task(TaskPriority::Low, || ()),
        Err(PoolError::ShuttingDown)
    ));
}

#[test]
fn guard_shuts_the_context_down_on_drop() {
    let context = ExecutionContext::new(small_config()).unwrap();
    {
        let _guard = ShutdownGuard::new(context.clone());
    }
    assert!(context.is_stopped());
}
