use clap::Args;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: StatsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let stats = runc.stats(&args.id, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
