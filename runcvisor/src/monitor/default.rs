//! Default monitor: graceful signal on cancellation, SIGKILL on timeout.
//!
//! Each supervised process gets two tasks:
//!
//! - the **reaper** owns the [`Child`], waits for it, publishes the [`Exit`]
//!   and then fires the single-fire `done` token. It is also the only place
//!   signals are delivered, and only while the wait is still pending, so a
//!   signal can never hit a pid the OS already reclaimed.
//! - the **canceller** waits for cancellation or `done`, whichever comes
//!   first, and requests the graceful signal, then SIGKILL once the kill
//!   timeout elapses without `done`.

use super::{Exit, ExitReceiver, ProcessMonitor, Supervised};
use crate::errors::{RuncError, RuncResult};
use async_trait::async_trait;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Kill timeout used by [`DefaultMonitor::default`].
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(10);

/// At most a graceful signal and a SIGKILL are ever requested.
const SIGNAL_QUEUE_DEPTH: usize = 2;

/// Monitor that escalates from a graceful signal to SIGKILL.
#[derive(Debug, Clone)]
pub struct DefaultMonitor {
    /// Sent on cancellation. `None` means SIGKILL right away.
    default_signal: Option<Signal>,
    /// Delay between the graceful signal and SIGKILL. Zero disables the
    /// escalation.
    kill_timeout: Duration,
}

impl DefaultMonitor {
    pub fn new(default_signal: Option<Signal>, kill_timeout: Duration) -> Self {
        Self {
            default_signal,
            kill_timeout,
        }
    }

    pub fn default_signal(&self) -> Option<Signal> {
        self.default_signal
    }

    pub fn kill_timeout(&self) -> Duration {
        self.kill_timeout
    }
}

impl Default for DefaultMonitor {
    fn default() -> Self {
        Self::new(Some(Signal::SIGTERM), DEFAULT_KILL_TIMEOUT)
    }
}

#[async_trait]
impl ProcessMonitor for DefaultMonitor {
    fn start(&self, mut cmd: Command, cancel: CancellationToken) -> RuncResult<Supervised> {
        let program = cmd.as_std().get_program().to_string_lossy().into_owned();

        let mut child = cmd.spawn().map_err(|e| RuncError::start(&program, e))?;
        // Release the child-side stdio ends we still hold so readers see EOF.
        drop(cmd);

        let pid = child.id().ok_or_else(|| {
            RuncError::Internal(format!("{} was reaped before supervision began", program))
        })?;

        tracing::debug!(pid, program = %program, "Supervising process");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (exit_tx, exit_rx) = oneshot::channel();
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE_DEPTH);
        let done = CancellationToken::new();

        tokio::spawn(reap(child, pid, signal_rx, exit_tx, done.clone()));
        tokio::spawn(cancel_on_request(
            pid,
            cancel,
            done,
            signal_tx,
            self.default_signal,
            self.kill_timeout,
        ));

        Ok(Supervised {
            pid,
            stdin,
            stdout,
            stderr,
            exits: ExitReceiver::new(pid, exit_rx),
        })
    }

    async fn wait(&self, exits: ExitReceiver) -> RuncResult<Exit> {
        exits.recv().await
    }
}

/// Reaper task.
///
/// The wait branch is polled first, so once the child is reaped no queued
/// signal request is ever delivered.
async fn reap(
    mut child: Child,
    pid: u32,
    mut signals: mpsc::Receiver<Signal>,
    exit_tx: oneshot::Sender<Exit>,
    done: CancellationToken,
) {
    let result = loop {
        tokio::select! {
            biased;
            result = child.wait() => break result,
            Some(signal) = signals.recv() => deliver(pid, signal),
        }
    };

    let exit = Exit::from_wait(pid, result);
    tracing::debug!(
        pid,
        status = exit.status,
        signal = ?exit.signal,
        "Process exited"
    );

    if exit_tx.send(exit).is_err() {
        tracing::debug!(pid, "Exit receiver dropped before delivery");
    }
    done.cancel();
}

/// Canceller task.
async fn cancel_on_request(
    pid: u32,
    cancel: CancellationToken,
    done: CancellationToken,
    signals: mpsc::Sender<Signal>,
    default_signal: Option<Signal>,
    kill_timeout: Duration,
) {
    tokio::select! {
        biased;
        _ = done.cancelled() => return,
        _ = cancel.cancelled() => {}
    }

    let Some(graceful) = default_signal else {
        request(&signals, Signal::SIGKILL).await;
        return;
    };

    request(&signals, graceful).await;

    if kill_timeout.is_zero() {
        return;
    }

    tokio::select! {
        biased;
        _ = done.cancelled() => {}
        _ = tokio::time::sleep(kill_timeout) => {
            tracing::debug!(pid, timeout = ?kill_timeout, "Kill timeout elapsed");
            request(&signals, Signal::SIGKILL).await;
        }
    }
}

async fn request(signals: &mpsc::Sender<Signal>, signal: Signal) {
    // The reaper is gone once the process is reaped; nothing left to signal.
    let _ = signals.send(signal).await;
}

fn deliver(pid: u32, signal: Signal) {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => tracing::debug!(pid, signal = %signal, "Signal delivered"),
        Err(e) => tracing::warn!(pid, signal = %signal, error = %e, "Failed to deliver signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sleep_cmd(secs: &str) -> Command {
        let mut cmd = Command::new("sleep");
        cmd.arg(secs);
        cmd
    }

    #[tokio::test]
    async fn test_natural_exit() {
        let monitor = DefaultMonitor::default();
        let cancel = CancellationToken::new();

        let supervised = monitor.start(Command::new("true"), cancel.clone()).unwrap();
        let exit = monitor.wait(supervised.exits).await.unwrap();

        assert_eq!(exit.status, 0);
        assert_eq!(exit.signal, None);
        // Cancelling after the reap has nothing left to do.
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_exit_pid_matches() {
        let monitor = DefaultMonitor::default();
        let supervised = monitor
            .start(Command::new("false"), CancellationToken::new())
            .unwrap();
        let pid = supervised.pid;
        assert_eq!(supervised.exits.pid(), pid);

        let exit = monitor.wait(supervised.exits).await.unwrap();
        assert_eq!(exit.pid, pid);
        assert_eq!(exit.status, 1);
    }

    #[tokio::test]
    async fn test_start_failure_is_synchronous() {
        let monitor = DefaultMonitor::default();
        let result = monitor.start(
            Command::new("/nonexistent/runcvisor-runtime"),
            CancellationToken::new(),
        );

        match result {
            Err(RuncError::Start { program, .. }) => {
                assert_eq!(program, "/nonexistent/runcvisor-runtime")
            }
            Err(other) => panic!("expected start error, got {other}"),
            Ok(_) => panic!("expected start error"),
        }
    }

    #[tokio::test]
    async fn test_custom_signal() {
        let monitor = DefaultMonitor::new(Some(Signal::SIGTERM), Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let supervised = monitor.start(sleep_cmd("10"), cancel.clone()).unwrap();
        cancel.cancel();

        let exit = monitor.wait(supervised.exits).await.unwrap();
        assert_eq!(exit.signal, Some(Signal::SIGTERM));
        assert_eq!(exit.status, 128 + libc::SIGTERM);
    }

    #[tokio::test]
    async fn test_no_default_signal_kills() {
        let monitor = DefaultMonitor::new(None, Duration::ZERO);
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let supervised = monitor.start(sleep_cmd("10"), cancel.clone()).unwrap();
        cancel.cancel();

        let exit = monitor.wait(supervised.exits).await.unwrap();
        assert_eq!(exit.signal, Some(Signal::SIGKILL));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token() {
        let monitor = DefaultMonitor::new(None, Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let supervised = monitor.start(sleep_cmd("10"), cancel).unwrap();
        let exit = monitor.wait(supervised.exits).await.unwrap();
        assert_eq!(exit.signal, Some(Signal::SIGKILL));
    }
}
