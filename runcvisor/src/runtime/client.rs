//! Runtime client: one async method per runtime subcommand.

use super::command::ProcessLauncher;
use super::opts::{CreateOpts, DeleteOpts, ExecOpts, KillOpts};
use super::options::RuncOptions;
use super::output::{check_output, query, run_monitored};
use super::state::Container;
use super::version::{Version, parse_version};
use crate::errors::{RuncError, RuncResult};
use crate::events::{Event, Stats, read_first_event, spawn_event_stream};
use crate::monitor::{DefaultMonitor, Exit, ProcessMonitor};
use oci_spec::runtime::Process;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Client for an OCI runtime executable.
///
/// Read-only queries (`list`, `state`, `ps`, `version`) wait on the runtime
/// themselves. Everything that changes container state is supervised by the
/// configured [`ProcessMonitor`], so cancellation escalates from the graceful
/// signal to SIGKILL.
#[derive(Clone)]
pub struct Runc {
    options: RuncOptions,
    launcher: ProcessLauncher,
    monitor: Arc<dyn ProcessMonitor>,
}

impl fmt::Debug for Runc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runc")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runc {
    /// Client with a [`DefaultMonitor`] built from `options.monitor`.
    pub fn new(options: RuncOptions) -> RuncResult<Self> {
        let monitor = DefaultMonitor::try_from(&options.monitor)?;
        Self::with_monitor(options, Arc::new(monitor))
    }

    /// Client supervised by a caller-provided monitor.
    ///
    /// `options.monitor` is ignored.
    pub fn with_monitor(options: RuncOptions, monitor: Arc<dyn ProcessMonitor>) -> RuncResult<Self> {
        let launcher = ProcessLauncher::new(&options)?;
        Ok(Self {
            options,
            launcher,
            monitor,
        })
    }

    pub fn options(&self) -> &RuncOptions {
        &self.options
    }

    pub fn monitor(&self) -> &Arc<dyn ProcessMonitor> {
        &self.monitor
    }

    fn program(&self) -> &str {
        self.launcher.program()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// All containers under the configured root.
    pub async fn list(&self, cancel: &CancellationToken) -> RuncResult<Vec<Container>> {
        let cmd = self.launcher.command(["list", "--format=json"]);
        let stdout = query(self.program(), cmd, cancel).await?;

        // An empty root prints `null`.
        let containers: Option<Vec<Container>> = serde_json::from_slice(&stdout)
            .map_err(|e| RuncError::json("decode container list", e))?;
        Ok(containers.unwrap_or_default())
    }

    /// State of one container.
    pub async fn state(&self, id: &str, cancel: &CancellationToken) -> RuncResult<Container> {
        let cmd = self.launcher.command(["state", id]);
        let stdout = query(self.program(), cmd, cancel).await?;
        serde_json::from_slice(&stdout)
            .map_err(|e| RuncError::json(format!("decode state of {}", id), e))
    }

    /// Pids of all processes inside a container.
    pub async fn ps(&self, id: &str, cancel: &CancellationToken) -> RuncResult<Vec<i32>> {
        let cmd = self.launcher.command(["ps", "--format=json", id]);
        let stdout = query(self.program(), cmd, cancel).await?;

        let pids: Option<Vec<i32>> = serde_json::from_slice(&stdout)
            .map_err(|e| RuncError::json(format!("decode processes of {}", id), e))?;
        Ok(pids.unwrap_or_default())
    }

    /// Versions reported by the runtime.
    pub async fn version(&self, cancel: &CancellationToken) -> RuncResult<Version> {
        let cmd = self.launcher.command(["--version"]);
        let stdout = query(self.program(), cmd, cancel).await?;
        Ok(parse_version(&String::from_utf8_lossy(&stdout)))
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Create a container from `bundle` without starting its process.
    pub async fn create(
        &self,
        id: &str,
        bundle: &Path,
        opts: CreateOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<()> {
        tracing::debug!(container_id = %id, bundle = %bundle.display(), "Creating container");
        self.bundle_op("create", id, bundle, opts, cancel)
            .await
            .map(drop)
    }

    /// Start a created container.
    pub async fn start(&self, id: &str, cancel: &CancellationToken) -> RuncResult<()> {
        self.simple("start", id, cancel).await
    }

    /// Create, start and wait for a container.
    ///
    /// A nonzero status is an error; read it with
    /// [`RuncError::exit_status`] or [`crate::extract_status`].
    pub async fn run(
        &self,
        id: &str,
        bundle: &Path,
        opts: CreateOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<Exit> {
        tracing::debug!(container_id = %id, bundle = %bundle.display(), "Running container");
        self.bundle_op("run", id, bundle, opts, cancel).await
    }

    /// Run an additional process inside a container.
    ///
    /// `process` is written to a temporary file for `--process` and removed
    /// once the runtime exits.
    pub async fn exec(
        &self,
        id: &str,
        process: &Process,
        opts: ExecOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<()> {
        let mut process_file = tempfile::Builder::new()
            .prefix("runcvisor-process-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| RuncError::io("create process spec file", e))?;
        serde_json::to_writer(process_file.as_file_mut(), process)
            .map_err(|e| RuncError::json("encode process spec", e))?;
        process_file
            .as_file_mut()
            .flush()
            .map_err(|e| RuncError::io("write process spec file", e))?;

        let mut args = vec![
            "exec".to_string(),
            "--process".to_string(),
            process_file.path().display().to_string(),
        ];
        args.extend(opts.args()?);
        args.push(id.to_string());

        tracing::debug!(container_id = %id, "Executing process");

        let cmd = self.launcher.command(&args);
        let ExecOpts { io, started, .. } = opts;
        run_monitored(self.monitor.as_ref(), self.program(), cmd, io, started, cancel).await?;
        Ok(())
    }

    /// Delete a container's runtime state.
    pub async fn delete(
        &self,
        id: &str,
        opts: &DeleteOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<()> {
        let mut args = vec!["delete".to_string()];
        args.extend(opts.args());
        args.push(id.to_string());
        self.supervised(args, cancel).await
    }

    /// Send a signal to a container.
    ///
    /// `opts.raw_signal` wins over `signal` when set.
    pub async fn kill(
        &self,
        id: &str,
        signal: i32,
        opts: &KillOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<()> {
        let mut args = vec!["kill".to_string()];
        args.extend(opts.args());
        args.push(id.to_string());
        args.push(opts.signal_arg(signal));
        self.supervised(args, cancel).await
    }

    /// Freeze every process in a container.
    pub async fn pause(&self, id: &str, cancel: &CancellationToken) -> RuncResult<()> {
        self.simple("pause", id, cancel).await
    }

    /// Thaw a paused container.
    pub async fn resume(&self, id: &str, cancel: &CancellationToken) -> RuncResult<()> {
        self.simple("resume", id, cancel).await
    }

    // ------------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------------

    /// Stream stats and OOM notifications for a container.
    ///
    /// Stats arrive every `interval` (whole seconds, at least one). The
    /// channel closes when the runtime stops emitting, when `cancel` fires or
    /// when the receiver is dropped; the runtime is killed and reaped in the
    /// last two cases. Must be called within a tokio runtime.
    pub fn events(
        &self,
        id: &str,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> RuncResult<mpsc::Receiver<Event>> {
        let secs = interval.as_secs();
        if secs == 0 {
            return Err(RuncError::InvalidArgument(format!(
                "event interval must be at least one second, got {:?}",
                interval
            )));
        }

        let mut cmd = self
            .launcher
            .command(["events", &format!("--interval={}s", secs), id]);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| RuncError::start(self.program(), e))?;
        drop(cmd);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuncError::Internal("event stream stdout not captured".to_string()))?;

        tracing::debug!(container_id = %id, interval_secs = secs, "Streaming events");
        Ok(spawn_event_stream(child, stdout, id.to_string(), cancel.clone()))
    }

    /// One-shot resource usage of a container.
    pub async fn stats(&self, id: &str, cancel: &CancellationToken) -> RuncResult<Stats> {
        let mut cmd = self.launcher.command(["events", "--stats", id]);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| RuncError::start(self.program(), e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuncError::Internal("stats stdout not captured".to_string()))?;

        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RuncError::Cancelled),
            first = read_first_event(stdout, id) => first?,
        };

        if let Some(event) = first {
            // Dropping the child kills it if it is still printing.
            return Ok(event.data.unwrap_or_default());
        }

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RuncError::Cancelled),
            output = child.wait_with_output() => {
                output.map_err(|e| RuncError::io(format!("wait for stats of {}", id), e))?
            }
        };
        check_output(self.program(), output)?;
        Err(RuncError::Internal(format!(
            "{} reported no stats for {}",
            self.program(),
            id
        )))
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn bundle_op(
        &self,
        subcommand: &str,
        id: &str,
        bundle: &Path,
        opts: CreateOpts,
        cancel: &CancellationToken,
    ) -> RuncResult<Exit> {
        let mut args = vec![
            subcommand.to_string(),
            "--bundle".to_string(),
            bundle.display().to_string(),
        ];
        args.extend(opts.args()?);
        args.push(id.to_string());

        let cmd = self.launcher.command(&args);
        let CreateOpts { io, started, .. } = opts;
        run_monitored(self.monitor.as_ref(), self.program(), cmd, io, started, cancel).await
    }

    async fn simple(&self, subcommand: &str, id: &str, cancel: &CancellationToken) -> RuncResult<()> {
        self.supervised(vec![subcommand.to_string(), id.to_string()], cancel)
            .await
    }

    async fn supervised(&self, args: Vec<String>, cancel: &CancellationToken) -> RuncResult<()> {
        let cmd = self.launcher.command(&args);
        run_monitored(self.monitor.as_ref(), self.program(), cmd, None, None, cancel).await?;
        Ok(())
    }
}
