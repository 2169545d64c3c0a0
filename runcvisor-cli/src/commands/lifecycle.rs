//! `start`, `pause` and `resume`: same shape, different subcommand.

use clap::Args;
use runcvisor::runtime::Runc;
use runcvisor::RuncResult;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Container ID(s)
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Start,
    Pause,
    Resume,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Pause => "pause",
            Action::Resume => "resume",
        }
    }

    async fn apply(self, runc: &Runc, id: &str, cancel: &CancellationToken) -> RuncResult<()> {
        match self {
            Action::Start => runc.start(id, cancel).await,
            Action::Pause => runc.pause(id, cancel).await,
            Action::Resume => runc.resume(id, cancel).await,
        }
    }
}

pub async fn start(
    args: TargetsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    execute(Action::Start, args, global, cancel).await
}

pub async fn pause(
    args: TargetsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    execute(Action::Pause, args, global, cancel).await
}

pub async fn resume(
    args: TargetsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    execute(Action::Resume, args, global, cancel).await
}

async fn execute(
    action: Action,
    args: TargetsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;

    let mut errors = Vec::new();
    let mut success_count = 0;

    for target in args.targets {
        if let Err(e) = action.apply(&runc, &target, cancel).await {
            eprintln!("Error: failed to {} container '{}': {}", action.verb(), target, e);
            errors.push(format!("{}: {}", target, e));
        } else {
            println!("{}", target);
            success_count += 1;
        }
    }

    if !errors.is_empty() {
        let error_summary = if success_count > 0 {
            format!(
                "Failed to {} {} of {} container(s)",
                action.verb(),
                errors.len(),
                errors.len() + success_count
            )
        } else {
            format!("Failed to {} all {} container(s)", action.verb(), errors.len())
        };

        anyhow::bail!("{}\nErrors:\n  {}", error_summary, errors.join("\n  "));
    }
    Ok(())
}
