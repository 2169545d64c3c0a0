//! Supervision of an external OCI container runtime.
//!
//! - [`monitor`]: spawn, cancel with signal escalation and reap exactly once
//! - [`events`]: decode the runtime's JSON telemetry stream
//! - [`runtime`]: the [`Runc`] client, one method per runtime subcommand
//! - [`errors`]: [`RuncError`] and uniform exit-status extraction

pub mod errors;
pub mod events;
pub mod monitor;
pub mod runtime;
pub mod util;

pub use errors::{ExitError, RuncError, RuncResult, extract_status};
pub use events::{Event, EventKind, Stats};
pub use monitor::{DefaultMonitor, Exit, ProcessMonitor};
pub use runtime::{Runc, RuncOptions};
