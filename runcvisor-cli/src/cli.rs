use clap::{Args, Parser, Subcommand};
use runcvisor::runtime::{Runc, RuncOptions};
use std::path::PathBuf;

use crate::commands::{
    delete::DeleteArgs, events::EventsArgs, kill::KillArgs, lifecycle::TargetsArgs,
    list::ListArgs, ps::PsArgs, run::RunArgs, state::StateArgs, stats::StatsArgs,
};

#[derive(Parser, Debug)]
#[command(name = "runcvisor", version, about = "Supervise an OCI container runtime")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the state of a container
    State(StateArgs),
    /// List containers
    #[command(visible_alias = "ls")]
    List(ListArgs),
    /// List the processes inside a container
    Ps(PsArgs),
    /// Stream stats and OOM events of a container
    Events(EventsArgs),
    /// Print resource usage of a container once
    Stats(StatsArgs),
    /// Send a signal to a container
    Kill(KillArgs),
    /// Delete container(s)
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),
    /// Start created container(s)
    Start(TargetsArgs),
    /// Pause container(s)
    Pause(TargetsArgs),
    /// Resume paused container(s)
    Resume(TargetsArgs),
    /// Create and run a container, exiting with its status
    Run(RunArgs),
    /// Show client and runtime versions
    Version,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Runtime executable
    #[arg(long, global = true, env = "RUNCVISOR_RUNTIME")]
    pub runtime: Option<String>,

    /// Runtime state directory
    #[arg(long, global = true, env = "RUNCVISOR_ROOT")]
    pub root: Option<PathBuf>,

    /// JSON file with client options; flags override it
    #[arg(long, global = true, env = "RUNCVISOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable runtime debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Let systemd manage the container cgroups
    #[arg(long, global = true)]
    pub systemd_cgroup: bool,

    /// Seconds between the graceful signal and SIGKILL on interrupt
    #[arg(long, global = true)]
    pub kill_timeout: Option<u64>,

    /// Verbose client logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalFlags {
    pub fn options(&self) -> anyhow::Result<RuncOptions> {
        let mut options = match &self.config {
            Some(path) => RuncOptions::from_json_file(path)?,
            None => RuncOptions::default(),
        };

        if let Some(runtime) = &self.runtime {
            options.command = runtime.clone();
        }
        if let Some(root) = &self.root {
            options.root = Some(root.clone());
        }
        if self.debug {
            options.debug = true;
        }
        if self.systemd_cgroup {
            options.systemd_cgroup = true;
        }
        if let Some(secs) = self.kill_timeout {
            options.monitor.kill_timeout_secs = secs;
        }
        Ok(options)
    }

    pub fn create_client(&self) -> anyhow::Result<Runc> {
        let options = self.options()?;
        tracing::debug!(runtime = %options.command, "Using runtime");
        Ok(Runc::new(options)?)
    }
}
