use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server = folio_server::build()?;
    let _sweeper = server.spawn_maintenance();

    let addr = server.addr();
    tracing::info!("[folio] starting on http://{addr}");

    server.app.listen(addr).await?;

    Ok(())
}
