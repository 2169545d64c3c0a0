use clap::Args;
use runcvisor::runtime::KillOpts;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct KillArgs {
    /// Container ID
    pub id: String,

    /// Signal name or number
    #[arg(default_value = "SIGTERM")]
    pub signal: String,

    /// Signal every process in the container
    #[arg(short, long)]
    pub all: bool,
}

pub async fn execute(
    args: KillArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;

    // Numbers go through as numbers; names are handed to the runtime verbatim.
    let (signal, raw_signal) = match args.signal.parse::<i32>() {
        Ok(number) => (number, None),
        Err(_) => (0, Some(args.signal)),
    };
    let opts = KillOpts {
        all: args.all,
        raw_signal,
    };

    runc.kill(&args.id, signal, &opts, cancel).await?;
    Ok(())
}
