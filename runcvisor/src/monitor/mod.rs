//! Process supervision.
//!
//! A [`ProcessMonitor`] spawns a command, owns its lifecycle and turns its
//! termination into exactly one [`Exit`] record.
//!
//! # Architecture
//!
//! - [`ProcessMonitor`]: the seam callers can replace (e.g. with a
//!   SIGCHLD-driven monitor in a daemon)
//! - [`DefaultMonitor`]: graceful signal on cancellation, SIGKILL after a
//!   timeout
//! - [`Supervised`]: what `start` hands back (pid, stdio pipes, exit receiver)
//!
//! # Example
//!
//! ```no_run
//! use runcvisor::monitor::{DefaultMonitor, ProcessMonitor};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = DefaultMonitor::default();
//! let cancel = CancellationToken::new();
//!
//! let supervised = monitor.start(tokio::process::Command::new("true"), cancel)?;
//! let exit = monitor.wait(supervised.exits).await?;
//! assert!(exit.success());
//! # Ok(())
//! # }
//! ```

mod default;
mod exit;
mod signal;

pub use default::DefaultMonitor;
pub use exit::{Exit, UNKNOWN_EXIT_STATUS};
pub(crate) use exit::decode_wait_status;
pub use signal::parse_signal;

use crate::errors::{RuncError, RuncResult};
use async_trait::async_trait;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Spawns commands and reports their termination.
#[async_trait]
pub trait ProcessMonitor: Send + Sync {
    /// Spawn `cmd` and start supervising it.
    ///
    /// Fails synchronously if the process cannot be spawned; in that case no
    /// background task exists. Cancelling `cancel` asks the monitor to
    /// terminate the process.
    fn start(&self, cmd: Command, cancel: CancellationToken) -> RuncResult<Supervised>;

    /// Wait for the exit record of a supervision started by this monitor.
    async fn wait(&self, exits: ExitReceiver) -> RuncResult<Exit>;
}

/// A running, supervised process.
///
/// Stdio handles are present only for streams configured as piped.
pub struct Supervised {
    /// Process ID
    pub pid: u32,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
    /// Receives the single [`Exit`] of this process.
    pub exits: ExitReceiver,
}

/// Single-slot channel carrying one [`Exit`].
///
/// Consumed by [`ProcessMonitor::wait`], so a supervision can only be waited
/// on once.
pub struct ExitReceiver {
    pid: u32,
    rx: oneshot::Receiver<Exit>,
}

impl ExitReceiver {
    pub(crate) fn new(pid: u32, rx: oneshot::Receiver<Exit>) -> Self {
        Self { pid, rx }
    }

    /// Process ID the exit will belong to.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Receive the exit record.
    ///
    /// Errors only if the supervising task went away without delivering.
    pub async fn recv(self) -> RuncResult<Exit> {
        let pid = self.pid;
        self.rx.await.map_err(|_| {
            RuncError::Internal(format!(
                "monitor for process {} dropped without delivering an exit",
                pid
            ))
        })
    }
}
