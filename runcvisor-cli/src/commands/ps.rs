use clap::Args;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct PsArgs {
    /// Container ID
    pub id: String,

    /// Print the pids as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    args: PsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let pids = runc.ps(&args.id, cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string(&pids)?);
    } else {
        for pid in pids {
            println!("{}", pid);
        }
    }
    Ok(())
}
