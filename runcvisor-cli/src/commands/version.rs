use tokio_util::sync::CancellationToken;

pub async fn execute(
    global: &crate::cli::GlobalFlags,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    println!("runcvisor version {}", env!("CARGO_PKG_VERSION"));

    let runc = global.create_client()?;
    let version = runc.version(cancel).await?;
    if version.runtime.is_empty() {
        println!("{}: unrecognized version banner", runc.options().command);
        return Ok(());
    }

    println!("{} version {}", runc.options().command, version.runtime);
    if !version.commit.is_empty() {
        println!("commit: {}", version.commit);
    }
    if !version.spec.is_empty() {
        println!("spec: {}", version.spec);
    }
    Ok(())
}
