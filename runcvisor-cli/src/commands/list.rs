use clap::{Args, ValueEnum};
use comfy_table::presets::NOTHING;
use comfy_table::{ContentArrangement, Table};
use runcvisor::runtime::Container;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Only print container IDs
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub async fn execute(
    args: ListArgs,
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let runc = global.create_client()?;
    let containers = runc.list(cancel).await?;

    if args.quiet {
        for container in &containers {
            println!("{}", container.id);
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&containers)?),
        OutputFormat::Table => println!("{}", render_table(&containers)),
    }
    Ok(())
}

fn render_table(containers: &[Container]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "PID", "STATUS", "BUNDLE", "CREATED"]);

    for container in containers {
        table.add_row(vec![
            container.id.clone(),
            container.pid.to_string(),
            container.status.to_string(),
            container.bundle.clone(),
            container.created.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}
