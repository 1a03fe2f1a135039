use std::sync::Arc;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    printsync_observability::init();

    let services = printsync_api::app::services::build_services_from_env()
        .await
        .context("failed to wire services")?;
    let app = printsync_api::app::build_app(Arc::new(services));

    let bind_addr = std::env::var("PRINTSYNC_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
