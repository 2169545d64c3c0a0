mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use runcvisor::RuncError;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    runcvisor::util::init_tracing(cli.global.verbose);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let global = &cli.global;
    let result = match cli.command {
        Commands::State(args) => commands::state::execute(args, global, &cancel).await,
        Commands::List(args) => commands::list::execute(args, global, &cancel).await,
        Commands::Ps(args) => commands::ps::execute(args, global, &cancel).await,
        Commands::Events(args) => commands::events::execute(args, global, &cancel).await,
        Commands::Stats(args) => commands::stats::execute(args, global, &cancel).await,
        Commands::Kill(args) => commands::kill::execute(args, global, &cancel).await,
        Commands::Delete(args) => commands::delete::execute(args, global, &cancel).await,
        Commands::Start(args) => commands::lifecycle::start(args, global, &cancel).await,
        Commands::Pause(args) => commands::lifecycle::pause(args, global, &cancel).await,
        Commands::Resume(args) => commands::lifecycle::resume(args, global, &cancel).await,
        Commands::Run(args) => commands::run::execute(args, global, &cancel).await,
        Commands::Version => commands::version::execute(global, &cancel).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Mirror the runtime's own status when it failed, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<RuncError>() {
        Some(e) if e.is_command_exit() => match e.exit_status() {
            status @ 1..=255 => status,
            _ => 1,
        },
        _ => 1,
    }
}
