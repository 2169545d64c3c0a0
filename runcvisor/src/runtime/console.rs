//! Console socket for PTY handling.
//!
//! With `--console-socket`, the runtime connects to a Unix socket and sends the
//! PTY master of the container's terminal as an SCM_RIGHTS message.

use crate::errors::{RuncError, RuncResult};
use nix::sys::socket::{ControlMessageOwned, MsgFlags, UnixAddr, recvmsg};
use std::io::{self, IoSliceMut};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SOCKET_NAME: &str = "console.sock";

/// Listening console socket in a private temporary directory.
///
/// The socket file and its directory are removed on drop.
#[derive(Debug)]
pub struct ConsoleSocket {
    listener: UnixListener,
    path: PathBuf,
    dir: TempDir,
}

impl ConsoleSocket {
    /// Bind a new socket under the system temp directory.
    pub fn new_temp() -> RuncResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("runcvisor-console-")
            .tempdir()
            .map_err(|e| RuncError::io("create console socket directory", e))?;
        let path = dir.path().join(SOCKET_NAME);

        let listener = UnixListener::bind(&path)
            .map_err(|e| RuncError::io(format!("bind console socket {}", path.display()), e))?;

        tracing::debug!(socket_path = %path.display(), "Created console socket");

        Ok(Self {
            listener,
            path,
            dir,
        })
    }

    /// Path to pass as `--console-socket`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the runtime to connect and hand over the PTY master.
    pub async fn receive_master(self) -> RuncResult<OwnedFd> {
        tokio::task::spawn_blocking(move || self.receive_master_blocking())
            .await
            .map_err(|e| RuncError::Internal(format!("console socket task failed: {}", e)))?
    }

    /// Blocking variant of [`ConsoleSocket::receive_master`].
    pub fn receive_master_blocking(&self) -> RuncResult<OwnedFd> {
        tracing::debug!(socket_path = %self.path.display(), "Waiting for console socket connection");

        let (stream, _) = self
            .listener
            .accept()
            .map_err(|e| RuncError::io("accept console socket connection", e))?;

        let mut buf = [0u8; 4096];
        let mut iov = [IoSliceMut::new(&mut buf)];
        let mut cmsg_space = nix::cmsg_space!([RawFd; 1]);

        let msg = recvmsg::<UnixAddr>(
            stream.as_raw_fd(),
            &mut iov,
            Some(&mut cmsg_space),
            MsgFlags::MSG_CMSG_CLOEXEC,
        )
        .map_err(|e| RuncError::io("receive PTY master", io::Error::from(e)))?;

        let cmsgs = msg
            .cmsgs()
            .map_err(|e| RuncError::io("read console socket control message", io::Error::from(e)))?;
        for cmsg in cmsgs {
            if let ControlMessageOwned::ScmRights(fds) = cmsg
                && let Some(&fd) = fds.first()
            {
                tracing::debug!(fd, "Received PTY master");
                // SAFETY: the kernel installed `fd` in our table for this
                // message; nothing else owns it.
                return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }

        Err(RuncError::Internal(
            "console socket connection carried no PTY master".to_string(),
        ))
    }
}

impl Drop for ConsoleSocket {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(
                socket_path = %self.path.display(),
                error = %e,
                "Failed to cleanup console socket"
            );
        } else {
            tracing::debug!(socket_path = %self.path.display(), dir = %self.dir.path().display(), "Cleaned up console socket");
        }
    }
}
