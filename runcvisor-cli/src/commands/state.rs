use clap::Args;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct StateArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: StateArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let container = runc.state(&args.id, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&container)?);
    Ok(())
}
