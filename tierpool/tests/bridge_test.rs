// Integration tests for the sync/async bridge.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tierpool::bridge::AsyncBridge;
use tierpool::error::BridgeError;

#[test]
fn run_before_start_is_caller_misuse() {
    let bridge = AsyncBridge::new();
    match bridge.run(async { 1 }, Some(Duration::from_millis(100))) {
        Err(BridgeError::NotStarted) => {}
        other => panic!("expected NotStarted, got {:?}", other),
    }
}

#[test]
fn start_is_idempotent() {
    let bridge = AsyncBridge::new();
    bridge.start().unwrap();
    bridge.start().unwrap();
    assert!(bridge.is_running());
    assert_eq!(
        bridge.run(async { "ok" }, Some(Duration::from_secs(1))).unwrap(),
        "ok"
    );
    bridge.shutdown();
}

#[test]
fn fifty_concurrent_callers_get_their_own_values() {
    let bridge = Arc::new(AsyncBridge::new());
    bridge.start().unwrap();

    let callers: Vec<_> = (0..50u64)
        .map(|i| {
            let bridge = bridge.clone();
            thread::spawn(move || {
                let value = bridge
                    .run(
                        async move {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            i * 3
                        },
                        Some(Duration::from_secs(5)),
                    )
                    .unwrap();
                (i, value)
            })
        })
        .collect();

    for caller in callers {
        let (i, value) = caller.join().unwrap();
        assert_eq!(value, i * 3, "cross-talk between bridge callers");
    }
    bridge.shutdown();
}

#[test]
fn run_times_out_on_slow_futures() {
    let bridge = AsyncBridge::new();
    bridge.start().unwrap();
    match bridge.run(
        async {
            tokio::time::sleep(Duration::from_millis(500)).await;
        },
        Some(Duration::from_millis(50)),
    ) {
        Err(BridgeError::Timeout(t)) => assert_eq!(t, Duration::from_millis(50)),
        other => panic!("expected timeout, got {:?}", other),
    }
    bridge.shutdown();
}

#[test]
fn future_errors_pass_through_untouched() {
    let bridge = AsyncBridge::new();
    bridge.start().unwrap();
    let output: Result<u32, String> = bridge
        .run(
            async { Err::<u32, _>("equity solver unavailable".to_string()) },
            Some(Duration::from_secs(1)),
        )
        .unwrap();
    assert_eq!(output, Err("equity solver unavailable".to_string()));
    bridge.shutdown();
}

#[test]
fn panicking_future_surfaces_as_task_failure() {
    std::panic::set_hook(Box::new(|_| {}));
    let bridge = AsyncBridge::new();
    bridge.start().unwrap();
    let outcome: Result<u8, BridgeError> = bridge.run(
        async {
            if true {
                panic!("bad future");
            }
            0u8
        },
        Some(Duration::from_secs(1)),
    );
    let _ = std::panic::take_hook();
    assert!(matches!(outcome, Err(BridgeError::TaskFailed(_))));
    bridge.shutdown();
}

#[test]
fn shutdown_is_idempotent_and_allows_restart() {
    let bridge = AsyncBridge::new();
    bridge.start().unwrap();
    bridge.shutdown();
    bridge.shutdown();
    assert!(!bridge.is_running());
    assert!(matches!(
        bridge.run(async { () }, Some(Duration::from_millis(50))),
        Err(BridgeError::NotStarted)
    ));

    // A stopped bridge can be brought back up.
    bridge.start().unwrap();
    assert_eq!(bridge.run(async { 5 }, Some(Duration::from_secs(1))).unwrap(), 5);
    bridge.shutdown();
}
