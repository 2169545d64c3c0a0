//! Integration tests for process supervision and signal escalation.

use nix::sys::signal::Signal;
use runcvisor::monitor::{DefaultMonitor, ProcessMonitor};
use runcvisor_test_utils::{FakeRuntime, TRUE, wait_for_file};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

fn command(runtime: &FakeRuntime) -> Command {
    Command::new(runtime.path())
}

// ============================================================================
// ESCALATION
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn ignored_graceful_signal_escalates_to_sigkill() {
    let runtime = FakeRuntime::term_ignorer();
    let monitor = DefaultMonitor::new(Some(Signal::SIGTERM), Duration::from_secs(1));
    let cancel = CancellationToken::new();

    let supervised = monitor.start(command(&runtime), cancel.clone()).unwrap();
    assert!(wait_for_file(&runtime.ready_file(), Duration::from_secs(5)));

    let cancelled_at = Instant::now();
    cancel.cancel();
    let exit = monitor.wait(supervised.exits).await.unwrap();
    let elapsed = cancelled_at.elapsed();

    assert_eq!(exit.signal, Some(Signal::SIGKILL));
    assert_eq!(exit.status, 128 + 9);
    assert!(elapsed >= Duration::from_millis(900), "killed too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "killed too late: {elapsed:?}");
    assert_eq!(runtime.received_signals(), ["TERM"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn no_graceful_signal_kills_immediately() {
    let runtime = FakeRuntime::term_ignorer();
    let monitor = DefaultMonitor::new(None, Duration::from_secs(10));
    let cancel = CancellationToken::new();

    let supervised = monitor.start(command(&runtime), cancel.clone()).unwrap();
    assert!(wait_for_file(&runtime.ready_file(), Duration::from_secs(5)));

    let cancelled_at = Instant::now();
    cancel.cancel();
    let exit = monitor.wait(supervised.exits).await.unwrap();

    assert_eq!(exit.signal, Some(Signal::SIGKILL));
    assert!(cancelled_at.elapsed() < Duration::from_secs(2));
    assert!(runtime.received_signals().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn graceful_exit_before_timeout_is_not_killed() {
    let runtime = FakeRuntime::term_handler();
    let monitor = DefaultMonitor::new(Some(Signal::SIGTERM), Duration::from_secs(10));
    let cancel = CancellationToken::new();

    let supervised = monitor.start(command(&runtime), cancel.clone()).unwrap();
    assert!(wait_for_file(&runtime.ready_file(), Duration::from_secs(5)));

    let cancelled_at = Instant::now();
    cancel.cancel();
    let exit = monitor.wait(supervised.exits).await.unwrap();

    assert!(exit.success(), "unexpected exit {exit:?}");
    assert_eq!(exit.signal, None);
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    assert_eq!(runtime.received_signals(), ["TERM"]);
}

// ============================================================================
// NATURAL TERMINATION
// ============================================================================

#[tokio::test]
async fn natural_exit_then_cancel_is_harmless() {
    let monitor = DefaultMonitor::default();
    let cancel = CancellationToken::new();

    let supervised = monitor.start(Command::new(TRUE), cancel.clone()).unwrap();
    let pid = supervised.pid;
    let exit = monitor.wait(supervised.exits).await.unwrap();

    assert!(exit.success());
    assert_eq!(exit.pid, pid);

    // The process is reaped; cancelling now must not signal anything.
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_supervisions_each_exit_once() {
    let monitor = std::sync::Arc::new(DefaultMonitor::default());
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for i in 0..64 {
        let monitor = monitor.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", &format!("exit {}", i % 4)]);
            let supervised = monitor.start(cmd, cancel).unwrap();
            let pid = supervised.pid;
            let exit = monitor.wait(supervised.exits).await.unwrap();
            (i, pid, exit)
        }));
    }

    for handle in handles {
        let (i, pid, exit) = handle.await.unwrap();
        assert_eq!(exit.pid, pid);
        assert_eq!(exit.status, i % 4);
        assert_eq!(exit.signal, None);
    }
}
