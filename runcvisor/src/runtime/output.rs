//! Finishing invocations: status checks and output capture.
//!
//! Self-waited queries (`std::process::Output`) and monitor-waited operations
//! ([`Exit`]) both end in [`check_status`], so a failed invocation always
//! surfaces as [`RuncError::Command`] with the same shape.

use super::io::IoConfig;
use crate::errors::{ExitError, RuncError, RuncResult};
use crate::monitor::{Exit, ProcessMonitor, decode_wait_status};
use nix::sys::signal::Signal;
use std::os::unix::io::OwnedFd;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long to wait for EOF on captured output after the runtime exited.
///
/// Anything the runtime handed the pipe to (a detached container, say) keeps
/// it open; past this point only already-buffered bytes are collected.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

const OUTPUT_CHUNK_SIZE: usize = 4096;

/// Turn a finished invocation into `Ok` or a [`RuncError::Command`].
pub(crate) fn check_status(
    program: &str,
    status: i32,
    signal: Option<Signal>,
    output: &[u8],
) -> RuncResult<()> {
    if status == 0 && signal.is_none() {
        return Ok(());
    }
    Err(RuncError::command(
        program,
        ExitError { status, signal },
        String::from_utf8_lossy(output),
    ))
}

/// Check a monitor-reported exit.
pub(crate) fn check_exit(program: &str, exit: &Exit, output: &[u8]) -> RuncResult<()> {
    check_status(program, exit.status, exit.signal, output)
}

/// Check a self-waited invocation and hand back its stdout.
///
/// On failure the error embeds stdout followed by stderr.
pub(crate) fn check_output(program: &str, output: Output) -> RuncResult<Vec<u8>> {
    let (status, signal) = decode_wait_status(output.status);
    let Output {
        mut stdout, stderr, ..
    } = output;

    if status != 0 || signal.is_some() {
        stdout.extend_from_slice(&stderr);
    }
    check_status(program, status, signal, &stdout)?;
    Ok(stdout)
}

// ============================================================================
// Self-waited queries
// ============================================================================

/// Run a read-only query to completion and return its stdout.
///
/// The child is killed if `cancel` fires first.
pub(crate) async fn query(
    program: &str,
    mut cmd: Command,
    cancel: &CancellationToken,
) -> RuncResult<Vec<u8>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RuncError::Cancelled),
        output = cmd.output() => output.map_err(|e| RuncError::start(program, e))?,
    };

    check_output(program, output)
}

// ============================================================================
// Monitor-waited operations
// ============================================================================

/// Spawn `cmd` under `monitor`, wait for it and check the exit.
///
/// `io` defaults to discarding stdin and capturing stdout and stderr into the
/// failure message. `started` receives the pid right after spawning.
pub(crate) async fn run_monitored(
    monitor: &dyn ProcessMonitor,
    program: &str,
    mut cmd: Command,
    io: Option<IoConfig>,
    started: Option<oneshot::Sender<u32>>,
    cancel: &CancellationToken,
) -> RuncResult<Exit> {
    let capture = match io.unwrap_or_default().apply(&mut cmd)? {
        Some(read) => Some(OutputCapture::spawn(read)?),
        None => None,
    };

    // Releases every write end of the capture pipe we hold, with or without
    // a successful spawn.
    let supervised = monitor.start(cmd, cancel.clone())?;

    if let Some(started) = started
        && started.send(supervised.pid).is_err()
    {
        tracing::debug!(pid = supervised.pid, "Start notification receiver dropped");
    }

    let exit = monitor.wait(supervised.exits).await?;
    let output = match capture {
        Some(capture) => capture.finish().await,
        None => Vec::new(),
    };

    check_exit(program, &exit, &output)?;
    Ok(exit)
}

/// Background reader collecting combined stdout and stderr.
struct OutputCapture {
    handle: JoinHandle<Vec<u8>>,
    stop: CancellationToken,
}

impl OutputCapture {
    fn spawn(read: OwnedFd) -> RuncResult<Self> {
        let receiver = pipe::Receiver::from_owned_fd(read)
            .map_err(|e| RuncError::io("open output pipe", e))?;
        let stop = CancellationToken::new();
        let handle = tokio::spawn(read_output(receiver, stop.clone()));
        Ok(Self { handle, stop })
    }

    async fn finish(self) -> Vec<u8> {
        let OutputCapture { mut handle, stop } = self;

        let joined = match tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::debug!("Output pipe still held open, collecting buffered output");
                stop.cancel();
                handle.await
            }
        };

        joined.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Output capture task failed");
            Vec::new()
        })
    }
}

/// Read until EOF, or until `stop` fires and nothing more is ready.
async fn read_output(mut receiver: pipe::Receiver, stop: CancellationToken) -> Vec<u8> {
    let mut out = Vec::new();
    let mut chunk = [0u8; OUTPUT_CHUNK_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            read = receiver.read(&mut chunk) => read,
            _ = stop.cancelled() => break,
        };
        match read {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::debug!(error = %e, "Output pipe read failed");
                break;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::DefaultMonitor;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(raw_status: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(raw_status),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_check_output_success_returns_stdout() {
        let stdout = check_output("runc", output(0, "[]", "warning")).unwrap();
        assert_eq!(stdout, b"[]");
    }

    #[test]
    fn test_check_output_failure_embeds_both_streams() {
        let err = check_output("runc", output(1 << 8, "out ", "container not found")).unwrap_err();
        assert_eq!(err.exit_status(), 1);
        assert_eq!(
            err.to_string(),
            "runc did not terminate successfully: exit status 1: out container not found"
        );
    }

    #[test]
    fn test_check_output_signal() {
        let err = check_output("runc", output(libc::SIGKILL, "", "")).unwrap_err();
        assert_eq!(err.exit_status(), 137);
        assert_eq!(err.exit_signal(), Some(Signal::SIGKILL));
    }

    #[tokio::test]
    async fn test_run_monitored_captures_combined_output() {
        let monitor = DefaultMonitor::default();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo to-stdout; echo to-stderr >&2; exit 3"]);

        let err = run_monitored(&monitor, "sh", cmd, None, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.exit_status(), 3);
        let message = err.to_string();
        assert!(message.contains("to-stdout"), "{message}");
        assert!(message.contains("to-stderr"), "{message}");
    }

    #[tokio::test]
    async fn test_run_monitored_reports_pid() {
        let monitor = DefaultMonitor::default();
        let (tx, rx) = oneshot::channel();

        let exit = run_monitored(
            &monitor,
            "true",
            Command::new("true"),
            Some(IoConfig::null()),
            Some(tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(rx.await.unwrap(), exit.pid);
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_output_held_open_by_grandchild_does_not_hang() {
        let monitor = DefaultMonitor::default();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo before; sleep 5 & exit 1"]);

        let started = std::time::Instant::now();
        let err = run_monitored(&monitor, "sh", cmd, None, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(err.exit_status(), 1);
        assert!(err.to_string().contains("before"));
    }
}
