//! Configuration for the runtime client and its monitor.

use crate::errors::{RuncError, RuncResult};
use crate::monitor::{DefaultMonitor, parse_signal};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime executable used when none is configured.
pub const DEFAULT_COMMAND: &str = "runc";

// ============================================================================
// Runtime Options
// ============================================================================

/// Global options passed to every runtime invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuncOptions {
    /// Runtime executable, looked up in `PATH` when not absolute.
    ///
    /// Default: `runc`
    pub command: String,

    /// State directory (`--root`).
    pub root: Option<PathBuf>,

    /// Enable runtime debug output (`--debug`).
    pub debug: bool,

    /// Runtime log file (`--log`).
    pub log: Option<PathBuf>,

    /// Runtime log format (`--log-format`).
    pub log_format: Option<LogFormat>,

    /// Use systemd to manage cgroups (`--systemd-cgroup`).
    pub systemd_cgroup: bool,

    /// Force rootless mode on or off (`--rootless=<bool>`). `None` lets the
    /// runtime decide.
    pub rootless: Option<bool>,

    /// Put the runtime in its own process group.
    pub setpgid: bool,

    /// Signal the runtime receives when this process dies (Linux only).
    pub pdeath_signal: Option<String>,

    /// Cancellation behaviour for supervised invocations.
    pub monitor: MonitorOptions,
}

impl Default for RuncOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            root: None,
            debug: false,
            log: None,
            log_format: None,
            systemd_cgroup: false,
            rootless: None,
            setpgid: false,
            pdeath_signal: None,
            monitor: MonitorOptions::default(),
        }
    }
}

impl RuncOptions {
    /// Options for a specific runtime executable, everything else default.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> RuncResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuncError::io(format!("read config {}", path.display()), e))?;
        serde_json::from_str(&content)
            .map_err(|e| RuncError::json(format!("parse config {}", path.display()), e))
    }

    /// Global flags placed before the subcommand.
    pub(crate) fn global_args(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            out.push("--root".to_string());
            out.push(root.display().to_string());
        }
        if self.debug {
            out.push("--debug".to_string());
        }
        if let Some(log) = &self.log {
            out.push("--log".to_string());
            out.push(log.display().to_string());
        }
        if let Some(format) = self.log_format {
            out.push("--log-format".to_string());
            out.push(format.as_str().to_string());
        }
        if self.systemd_cgroup {
            out.push("--systemd-cgroup".to_string());
        }
        if let Some(rootless) = self.rootless {
            out.push(format!("--rootless={}", rootless));
        }
        out
    }
}

/// Runtime log format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

// ============================================================================
// Monitor Options
// ============================================================================

/// Settings for [`DefaultMonitor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    /// Graceful signal sent on cancellation (`SIGTERM`, `TERM` or `15`).
    /// `None` sends SIGKILL immediately.
    ///
    /// Default: `SIGTERM`
    pub default_signal: Option<String>,

    /// Seconds between the graceful signal and SIGKILL. `0` never escalates.
    ///
    /// Default: 10
    pub kill_timeout_secs: u64,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            default_signal: Some("SIGTERM".to_string()),
            kill_timeout_secs: 10,
        }
    }
}

impl TryFrom<&MonitorOptions> for DefaultMonitor {
    type Error = RuncError;

    fn try_from(options: &MonitorOptions) -> RuncResult<Self> {
        let signal = options
            .default_signal
            .as_deref()
            .map(parse_signal)
            .transpose()?;
        Ok(DefaultMonitor::new(
            signal,
            Duration::from_secs(options.kill_timeout_secs),
        ))
    }
}
