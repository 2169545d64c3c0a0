use clap::Args;
use runcvisor::runtime::DeleteOpts;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Kill the container first if it is still running
    #[arg(short, long)]
    pub force: bool,

    /// Container ID(s) to delete
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub async fn execute(
    args: DeleteArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let opts = DeleteOpts { force: args.force };

    let mut active_error = false;
    for target in args.targets {
        if let Err(e) = runc.delete(&target, &opts, cancel).await {
            eprintln!("Error deleting container '{}': {}", target, e);
            active_error = true;
        } else {
            println!("{}", target);
        }
    }

    if active_error {
        anyhow::bail!("Some containers could not be deleted");
    }
    Ok(())
}
