// Integration tests for the ergonomic helper layer.

use std::time::Duration;

use tierpool::config::PoolConfig;
use tierpool::error::PoolError;
use tierpool::pool::WorkerPool;
use tierpool::task::TaskPriority;
use tierpool::{parallel_map, run_cpu, run_with_priority, unblock};

fn quiet_config() -> PoolConfig {
    PoolConfig {
        max_workers: 4,
        cpu_workers: 2,
        monitor_interval: Duration::ZERO,
        result_poll_interval: Duration::from_millis(10),
        ..PoolConfig::default()
    }
}

#[test]
fn run_with_priority_blocks_for_the_value() {
    let pool = WorkerPool::new(quiet_config()).unwrap();
    let value = run_with_priority(&pool, TaskPriority::High, Some(Duration::from_secs(2)), || {
        21 * 2
    })
    .unwrap();
    assert_eq!(value, 42);
    pool.shutdown(true);
}

#[test]
fn run_with_priority_propagates_task_failure() {
    std::panic::set_hook(Box::new(|_| {}));
    let pool = WorkerPool::new(quiet_config()).unwrap();
    let outcome: Result<u8, PoolError> = run_with_priority(
        &pool,
        TaskPriority::Normal,
        Some(Duration::from_secs(2)),
        || panic!("no card match"),
    );
    let _ = std::panic::take_hook();
    assert!(matches!(outcome, Err(PoolError::Task(_))));
    pool.shutdown(true);
}

#[test]
fn run_cpu_blocks_for_the_value() {
    let pool = WorkerPool::new(quiet_config()).unwrap();
    let value = run_cpu(&pool, Some(Duration::from_secs(2)), || {
        (1..=10u64).product::<u64>()
    })
    .unwrap();
    assert_eq!(value, 3_628_800);
    pool.shutdown(true);
}

#[tokio::test]
async fn unblock_runs_blocking_work_off_the_loop() {
    let value = unblock(|| {
        std::thread::sleep(Duration::from_millis(20));
        7
    })
    .await
    .unwrap();
    assert_eq!(value, 7);
}

#[test]
fn parallel_map_visits_every_item() {
    // Completion order is not input order; the payload embeds the index.
    let items: Vec<(usize, u64)> = (0..20).map(|i| (i, i as u64)).collect();
    let mut results = parallel_map(|(i, n)| (i, n * n), items, 4);
    results.sort_by_key(|(i, _)| *i);
    for (i, square) in results {
        assert_eq!(square, (i as u64) * (i as u64));
    }
}

#[test]
fn parallel_map_handles_empty_and_oversized_worker_counts() {
    let empty: Vec<u32> = parallel_map(|n: u32| n + 1, Vec::new(), 8);
    assert!(empty.is_empty());

    // More workers than items.
    let doubled = parallel_map(|n: u32| n * 2, vec![1, 2, 3], 64);
    assert_eq!(doubled.len(), 3);
    assert_eq!(doubled.iter().sum::<u32>(), 12);
}
