//! Standard stream wiring for runtime invocations.

use crate::errors::{RuncError, RuncResult};
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use std::fs::File;
use std::io;
use std::os::unix::io::OwnedFd;
use std::process::Stdio;
use tokio::process::Command;

/// How one standard stream of the runtime is connected.
#[derive(Debug, Default)]
pub enum IoMode {
    /// Share the stream of this process.
    Inherit,
    /// Connect to `/dev/null`.
    #[default]
    Null,
    /// Capture into the combined output embedded in failure messages.
    ///
    /// Only meaningful for stdout and stderr; stdin treats it as [`IoMode::Null`].
    Piped,
    /// Caller-supplied descriptor, handed to the runtime as-is.
    Fd(OwnedFd),
}

impl From<OwnedFd> for IoMode {
    fn from(fd: OwnedFd) -> Self {
        IoMode::Fd(fd)
    }
}

impl From<File> for IoMode {
    fn from(file: File) -> Self {
        IoMode::Fd(file.into())
    }
}

/// Stream wiring for stdin, stdout and stderr.
///
/// The default discards stdin and captures stdout and stderr together.
#[derive(Debug)]
pub struct IoConfig {
    pub stdin: IoMode,
    pub stdout: IoMode,
    pub stderr: IoMode,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            stdin: IoMode::Null,
            stdout: IoMode::Piped,
            stderr: IoMode::Piped,
        }
    }
}

/// Caller-side ends of the pipes created by [`IoConfig::pipes`].
#[derive(Debug)]
pub struct PipeEnds {
    /// Write end feeding the runtime's stdin.
    pub stdin: OwnedFd,
    /// Read end of the runtime's stdout.
    pub stdout: OwnedFd,
    /// Read end of the runtime's stderr.
    pub stderr: OwnedFd,
}

impl IoConfig {
    /// Share all three streams with this process.
    pub fn inherit() -> Self {
        Self {
            stdin: IoMode::Inherit,
            stdout: IoMode::Inherit,
            stderr: IoMode::Inherit,
        }
    }

    /// Connect all three streams to `/dev/null`.
    pub fn null() -> Self {
        Self {
            stdin: IoMode::Null,
            stdout: IoMode::Null,
            stderr: IoMode::Null,
        }
    }

    /// Create one OS pipe per stream.
    ///
    /// Returns the wiring to pass to the runtime and the ends the caller
    /// keeps. All descriptors are close-on-exec until installed as the
    /// runtime's standard streams.
    pub fn pipes() -> RuncResult<(Self, PipeEnds)> {
        let (stdin_read, stdin_write) = cloexec_pipe("stdin")?;
        let (stdout_read, stdout_write) = cloexec_pipe("stdout")?;
        let (stderr_read, stderr_write) = cloexec_pipe("stderr")?;

        let config = Self {
            stdin: IoMode::Fd(stdin_read),
            stdout: IoMode::Fd(stdout_write),
            stderr: IoMode::Fd(stderr_write),
        };
        let ends = PipeEnds {
            stdin: stdin_write,
            stdout: stdout_read,
            stderr: stderr_read,
        };
        Ok((config, ends))
    }

    /// Whether any output stream is captured.
    pub(crate) fn captures_output(&self) -> bool {
        matches!(self.stdout, IoMode::Piped) || matches!(self.stderr, IoMode::Piped)
    }

    /// Install the wiring on `cmd`.
    ///
    /// When output is captured, stdout and stderr share one pipe and the read
    /// end is returned. The write ends live only inside `cmd`, so the read end
    /// sees EOF once the command is dropped after spawning and the runtime
    /// (plus anything it handed the pipe to) exits.
    pub(crate) fn apply(self, cmd: &mut Command) -> RuncResult<Option<OwnedFd>> {
        let (capture_read, capture_write) = if self.captures_output() {
            let (read, write) = cloexec_pipe("output")?;
            (Some(read), Some(write))
        } else {
            (None, None)
        };

        cmd.stdin(into_stdio(self.stdin, None)?);
        cmd.stdout(into_stdio(self.stdout, capture_write.as_ref())?);
        cmd.stderr(into_stdio(self.stderr, capture_write.as_ref())?);

        Ok(capture_read)
    }
}

fn into_stdio(mode: IoMode, capture: Option<&OwnedFd>) -> RuncResult<Stdio> {
    Ok(match mode {
        IoMode::Inherit => Stdio::inherit(),
        IoMode::Null => Stdio::null(),
        IoMode::Piped => match capture {
            Some(write) => {
                let write = write
                    .try_clone()
                    .map_err(|e| RuncError::io("duplicate output pipe", e))?;
                Stdio::from(write)
            }
            None => Stdio::null(),
        },
        IoMode::Fd(fd) => Stdio::from(fd),
    })
}

fn cloexec_pipe(stream: &str) -> RuncResult<(OwnedFd, OwnedFd)> {
    pipe2(OFlag::O_CLOEXEC)
        .map_err(|e| RuncError::io(format!("create {} pipe", stream), io::Error::from(e)))
}
