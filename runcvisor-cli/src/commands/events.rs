use clap::Args;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Container ID
    pub id: String,

    /// Seconds between stats events
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

/// Print one JSON event per line until the stream ends or Ctrl-C.
pub async fn execute(
    args: EventsArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let mut events = runc.events(&args.id, Duration::from_secs(args.interval), cancel)?;

    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
