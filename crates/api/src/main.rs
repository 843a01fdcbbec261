use std::net::SocketAddr;

use anyhow::Context;

use chatgate_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatgate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let app = chatgate_api::app::build_app(&config)
        .await
        .context("failed to wire services")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
