//! Builds runtime invocations.

use super::options::RuncOptions;
use crate::errors::RuncResult;
use crate::monitor::parse_signal;
use nix::sys::signal::Signal;
use tokio::process::Command;

/// Preconfigured factory for runtime commands.
///
/// Every command carries the global flags, and optionally its own process
/// group and a parent-death signal.
#[derive(Debug, Clone)]
pub(crate) struct ProcessLauncher {
    program: String,
    global_args: Vec<String>,
    setpgid: bool,
    pdeath_signal: Option<Signal>,
}

impl ProcessLauncher {
    pub(crate) fn new(options: &RuncOptions) -> RuncResult<Self> {
        let pdeath_signal = options
            .pdeath_signal
            .as_deref()
            .map(parse_signal)
            .transpose()?;

        Ok(Self {
            program: options.command.clone(),
            global_args: options.global_args(),
            setpgid: options.setpgid,
            pdeath_signal,
        })
    }

    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    /// Command for `<runtime> <global flags> <args>`.
    ///
    /// Stdio is left at tokio's defaults; callers wire it explicitly.
    pub(crate) fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.global_args);
        for arg in args {
            cmd.arg(arg.as_ref());
        }

        if self.setpgid {
            cmd.process_group(0);
        }

        #[cfg(target_os = "linux")]
        if let Some(signal) = self.pdeath_signal {
            // SAFETY: prctl is async-signal-safe and touches no shared state.
            unsafe {
                cmd.pre_exec(move || {
                    nix::sys::prctl::set_pdeathsig(signal).map_err(std::io::Error::from)
                });
            }
        }

        cmd
    }
}
