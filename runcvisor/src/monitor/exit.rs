//! Exit record produced once per supervised process.

use chrono::{DateTime, Utc};
use nix::sys::signal::Signal;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// Status reported when the wait itself failed and the real cause is unknown.
pub const UNKNOWN_EXIT_STATUS: i32 = 255;

/// Offset added to the signal number for signal-terminated processes,
/// matching the shell convention (`128 + signo`).
const SIGNAL_STATUS_BASE: i32 = 128;

/// Termination record of a supervised process.
///
/// Delivered exactly once, after the OS has reaped the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    /// When the reap completed.
    pub timestamp: DateTime<Utc>,
    /// Process ID the record belongs to.
    pub pid: u32,
    /// Exit code, `128 + signo` for signal terminations, or
    /// [`UNKNOWN_EXIT_STATUS`] when the wait failed.
    pub status: i32,
    /// Terminating signal, if any.
    pub signal: Option<Signal>,
}

impl Exit {
    /// Build the record from the outcome of waiting on the child.
    pub(crate) fn from_wait(pid: u32, result: io::Result<ExitStatus>) -> Self {
        let (status, signal) = match result {
            Ok(exit_status) => decode_wait_status(exit_status),
            Err(e) => {
                tracing::warn!(pid, error = %e, "Failed to wait for process");
                (UNKNOWN_EXIT_STATUS, None)
            }
        };

        Self {
            timestamp: Utc::now(),
            pid,
            status,
            signal,
        }
    }

    /// Check if the process exited with status 0 and no signal.
    pub fn success(&self) -> bool {
        self.status == 0 && self.signal.is_none()
    }
}

/// Split an OS wait status into (status, signal).
pub(crate) fn decode_wait_status(exit_status: ExitStatus) -> (i32, Option<Signal>) {
    if let Some(code) = exit_status.code() {
        return (code, None);
    }

    match exit_status.signal() {
        Some(signo) => (SIGNAL_STATUS_BASE + signo, Signal::try_from(signo).ok()),
        None => (UNKNOWN_EXIT_STATUS, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Raw wait statuses: exit code lives in bits 8..16, signal in bits 0..7.
    fn exited(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    fn signaled(signo: i32) -> ExitStatus {
        ExitStatus::from_raw(signo)
    }

    #[test]
    fn test_clean_exit() {
        let exit = Exit::from_wait(42, Ok(exited(0)));
        assert_eq!(exit.pid, 42);
        assert_eq!(exit.status, 0);
        assert_eq!(exit.signal, None);
        assert!(exit.success());
    }

    #[test]
    fn test_nonzero_exit() {
        let exit = Exit::from_wait(42, Ok(exited(1)));
        assert_eq!(exit.status, 1);
        assert_eq!(exit.signal, None);
        assert!(!exit.success());
    }

    #[test]
    fn test_signal_exit() {
        let exit = Exit::from_wait(7, Ok(signaled(libc::SIGKILL)));
        assert_eq!(exit.status, 128 + 9);
        assert_eq!(exit.signal, Some(Signal::SIGKILL));

        let exit = Exit::from_wait(7, Ok(signaled(libc::SIGTERM)));
        assert_eq!(exit.status, 128 + 15);
        assert_eq!(exit.signal, Some(Signal::SIGTERM));
    }

    #[test]
    fn test_wait_error_maps_to_unknown() {
        let exit = Exit::from_wait(7, Err(io::Error::other("ECHILD")));
        assert_eq!(exit.status, UNKNOWN_EXIT_STATUS);
        assert_eq!(exit.signal, None);
    }
}
