use clap::Args;
use runcvisor::runtime::{CreateOpts, IoConfig};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Container ID
    pub id: String,

    /// Path to the OCI bundle
    #[arg(short, long, default_value = ".")]
    pub bundle: PathBuf,

    /// Detach from the container's process
    #[arg(short, long)]
    pub detach: bool,

    /// File to write the container's pid to
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Do not use pivot_root to jail the process
    #[arg(long)]
    pub no_pivot: bool,

    /// Do not create a new session keyring
    #[arg(long)]
    pub no_new_keyring: bool,

    /// Extra arguments appended to the runtime's `run` flags
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

/// The container's status becomes ours: a failed run exits with it.
pub async fn execute(
    args: RunArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;

    let opts = CreateOpts {
        io: Some(IoConfig::inherit()),
        pid_file: args.pid_file,
        detach: args.detach,
        no_pivot: args.no_pivot,
        no_new_keyring: args.no_new_keyring,
        extra_args: args.extra_args,
        ..Default::default()
    };

    let exit = runc.run(&args.id, &args.bundle, opts, cancel).await?;
    tracing::debug!(container_id = %args.id, pid = exit.pid, "Container exited");
    Ok(())
}
