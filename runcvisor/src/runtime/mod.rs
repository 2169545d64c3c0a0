//! Client for an OCI runtime executable such as `runc`.
//!
//! [`Runc`] turns each runtime subcommand into an async method. State-changing
//! operations run under a [`crate::monitor::ProcessMonitor`]; read-only
//! queries wait on the runtime directly. A nonzero exit always surfaces as
//! [`crate::RuncError::Command`], carrying the runtime's combined output unless
//! the caller wired the streams elsewhere through [`IoConfig`].
//!
//! # Example
//!
//! ```no_run
//! use runcvisor::runtime::{Runc, RuncOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runc = Runc::new(RuncOptions::default())?;
//! let cancel = CancellationToken::new();
//!
//! for container in runc.list(&cancel).await? {
//!     println!("{} {}", container.id, container.status);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod command;
mod console;
mod io;
mod options;
mod opts;
mod output;
mod state;
mod version;

pub use client::Runc;
pub use console::ConsoleSocket;
pub use io::{IoConfig, IoMode, PipeEnds};
pub use options::{DEFAULT_COMMAND, LogFormat, MonitorOptions, RuncOptions};
pub use opts::{CreateOpts, DeleteOpts, ExecOpts, KillOpts};
pub use state::{Container, ContainerStatus};
pub use version::{Version, parse_version};
