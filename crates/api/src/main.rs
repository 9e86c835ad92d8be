use anyhow::Context;

use feedline_infra::FeedConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = FeedConfig::from_env().context("invalid configuration")?;
    feedline_observability::init(&config.log);

    let app = feedline_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
