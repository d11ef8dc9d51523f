// Integration tests for configuration defaults.

use std::time::Duration;

use tierpool::config::{PoolConfig, default_max_workers};

#[test]
fn test_pool_config_defaults() {
    let config = PoolConfig::default();

    assert_eq!(config.max_workers, (num_cpus::get() + 4).min(32));
    assert_eq!(config.cpu_workers, num_cpus::get());
    assert_eq!(config.queue_capacity, 10_000);
    assert_eq!(config.monitor_interval, Duration::from_secs(5));
    assert_eq!(config.result_capacity, 1000);
    assert_eq!(config.evict_batch, 200);
    assert_eq!(config.result_poll_interval, Duration::from_millis(100));
    assert_eq!(config.worker_join_timeout, Duration::from_secs(2));
}

#[test]
fn test_priority_worker_derivation() {
    let config = PoolConfig {
        max_workers: 8,
        ..PoolConfig::default()
    };
    assert_eq!(config.priority_workers(), 4);

    // Never zero, even for a single-thread pool.
    let tiny = PoolConfig {
        max_workers: 1,
        ..PoolConfig::default()
    };
    assert_eq!(tiny.priority_workers(), 1);
}

#[test]
fn test_default_max_workers_cap() {
    assert!(default_max_workers() <= 32);
    assert!(default_max_workers() >= 1);
}

#[test]
fn test_config_debug_format() {
    let config = PoolConfig::default();
    assert!(format!("{:?}", config).contains("max_workers"));
}
