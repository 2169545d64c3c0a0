//! Error types for runtime supervision.
//!
//! Errors are categorized by where they happen:
//! - [`RuncError::Start`]: the runtime could not be spawned (fatal to the call)
//! - [`RuncError::Command`]: the runtime ran and exited with a nonzero status
//! - everything else: setup, decoding and cancellation failures
//!
//! Only [`RuncError::Command`] carries a real exit status. Use
//! [`RuncError::exit_status`] or [`extract_status`] to read it uniformly.

use nix::sys::signal::Signal;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result alias used across the crate.
pub type RuncResult<T> = Result<T, RuncError>;

/// Status reported by [`RuncError::exit_status`] for failures that are not a
/// command exit.
pub const NOT_A_COMMAND_EXIT: i32 = -1;

// ============================================================================
// Top-Level Error
// ============================================================================

/// Errors that can occur while driving the runtime executable.
#[derive(Debug, Error)]
pub enum RuncError {
    /// The runtime process could not be spawned.
    #[error("failed to start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The runtime ran and exited unsuccessfully.
    ///
    /// `output` holds whatever the runtime printed, embedded verbatim.
    #[error("{program} did not terminate successfully: {source}: {output}")]
    Command {
        program: String,
        output: String,
        #[source]
        source: ExitError,
    },

    /// I/O setup around the runtime failed (pipes, temp files, sockets).
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A JSON payload from or for the runtime could not be (de)serialized.
    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Caller supplied an unusable value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was cancelled before the runtime finished.
    #[error("operation cancelled")]
    Cancelled,

    /// Invariant violation inside the crate.
    #[error("internal: {0}")]
    Internal(String),
}

/// Nonzero exit status of a finished runtime invocation.
///
/// A runtime killed by a signal reports `128 + signo` (137 for SIGKILL), the
/// same number a shell shows, with the signal itself in `signal`. It is never
/// `-1` for a signalled exit; callers used to that convention should check
/// `signal.is_some()` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitError {
    pub status: i32,
    /// Terminating signal when the runtime was killed.
    pub signal: Option<Signal>,
}

impl ExitError {
    pub fn new(status: i32) -> Self {
        Self {
            status,
            signal: None,
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signal {
            Some(signal) => write!(f, "exit status {} ({})", self.status, signal),
            None => write!(f, "exit status {}", self.status),
        }
    }
}

impl std::error::Error for ExitError {}

// ============================================================================
// Status Extraction
// ============================================================================

impl RuncError {
    /// Numeric exit status carried by this error.
    ///
    /// Returns [`NOT_A_COMMAND_EXIT`] (`-1`) for anything that is not a
    /// command exit, so callers never see a fabricated status.
    pub fn exit_status(&self) -> i32 {
        match self {
            RuncError::Command { source, .. } => source.status,
            _ => NOT_A_COMMAND_EXIT,
        }
    }

    /// Terminating signal of a command exit, if it was signal-caused.
    pub fn exit_signal(&self) -> Option<Signal> {
        match self {
            RuncError::Command { source, .. } => source.signal,
            _ => None,
        }
    }

    /// Whether this error is a command exit (as opposed to a setup failure).
    pub fn is_command_exit(&self) -> bool {
        matches!(self, RuncError::Command { .. })
    }
}

/// Status of a finished call: 0 on success, the exit status for command
/// failures, `-1` for any other failure.
pub fn extract_status<T>(result: &RuncResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.exit_status(),
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl RuncError {
    /// Create a start error.
    pub fn start(program: impl Into<String>, source: io::Error) -> Self {
        Self::Start {
            program: program.into(),
            source,
        }
    }

    /// Create a command exit error.
    pub fn command(program: impl Into<String>, exit: ExitError, output: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            output: output.into(),
            source: exit,
        }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a JSON error with context.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}
