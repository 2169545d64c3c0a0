//! Per-operation options and their argument lists.

use super::io::IoConfig;
use crate::errors::{RuncError, RuncResult};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Options for `create` and `run`.
#[derive(Debug, Default)]
pub struct CreateOpts {
    /// Stream wiring. `None` discards stdin and captures stdout and stderr.
    pub io: Option<IoConfig>,
    /// File the runtime writes the container pid to.
    pub pid_file: Option<PathBuf>,
    /// Unix socket that receives the PTY master (see [`super::ConsoleSocket`]).
    pub console_socket: Option<PathBuf>,
    pub detach: bool,
    pub no_pivot: bool,
    pub no_new_keyring: bool,
    /// Appended verbatim after the known flags.
    pub extra_args: Vec<String>,
    /// Receives the runtime's pid as soon as it is spawned.
    pub started: Option<oneshot::Sender<u32>>,
}

impl CreateOpts {
    pub(crate) fn args(&self) -> RuncResult<Vec<String>> {
        let mut out = Vec::new();
        if let Some(pid_file) = &self.pid_file {
            out.push("--pid-file".to_string());
            out.push(absolute(pid_file)?);
        }
        if let Some(socket) = &self.console_socket {
            out.push("--console-socket".to_string());
            out.push(socket.display().to_string());
        }
        if self.no_pivot {
            out.push("--no-pivot".to_string());
        }
        if self.no_new_keyring {
            out.push("--no-new-keyring".to_string());
        }
        if self.detach {
            out.push("--detach".to_string());
        }
        out.extend(self.extra_args.iter().cloned());
        Ok(out)
    }
}

/// Options for `exec`.
#[derive(Debug, Default)]
pub struct ExecOpts {
    /// Stream wiring. `None` discards stdin and captures stdout and stderr.
    pub io: Option<IoConfig>,
    pub pid_file: Option<PathBuf>,
    pub console_socket: Option<PathBuf>,
    pub detach: bool,
    pub extra_args: Vec<String>,
    /// Receives the runtime's pid as soon as it is spawned.
    pub started: Option<oneshot::Sender<u32>>,
}

impl ExecOpts {
    pub(crate) fn args(&self) -> RuncResult<Vec<String>> {
        let mut out = Vec::new();
        if let Some(socket) = &self.console_socket {
            out.push("--console-socket".to_string());
            out.push(socket.display().to_string());
        }
        if self.detach {
            out.push("--detach".to_string());
        }
        if let Some(pid_file) = &self.pid_file {
            out.push("--pid-file".to_string());
            out.push(absolute(pid_file)?);
        }
        out.extend(self.extra_args.iter().cloned());
        Ok(out)
    }
}

/// Options for `kill`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillOpts {
    /// Signal every process in the container.
    pub all: bool,
    /// Signal passed verbatim (name or number). Takes precedence over the
    /// numeric signal argument.
    pub raw_signal: Option<String>,
}

impl KillOpts {
    pub(crate) fn args(&self) -> Vec<String> {
        if self.all {
            vec!["--all".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Signal argument for a kill with numeric signal `signal`.
    pub(crate) fn signal_arg(&self, signal: i32) -> String {
        match &self.raw_signal {
            Some(raw) if !raw.is_empty() => raw.clone(),
            _ => signal.to_string(),
        }
    }
}

/// Options for `delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOpts {
    /// Kill the container first if it is still running.
    pub force: bool,
}

impl DeleteOpts {
    pub(crate) fn args(&self) -> Vec<String> {
        if self.force {
            vec!["--force".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// The runtime resolves relative pid files against its own working directory,
/// which is not ours.
fn absolute(path: &Path) -> RuncResult<String> {
    std::path::absolute(path)
        .map(|p| p.display().to_string())
        .map_err(|e| RuncError::InvalidArgument(format!("pid file {}: {}", path.display(), e)))
}
