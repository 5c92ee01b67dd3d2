use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use weather_agent::{Config, WeatherAgent, init_tracing, server};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load();
    let agent = Arc::new(WeatherAgent::from_config(&config)?);

    let bind: SocketAddr = config.server.bind.parse().map_err(|e| {
        anyhow::anyhow!(
            "Invalid server bind '{}' (expected host:port): {e}",
            config.server.bind
        )
    })?;
    let router = server::router(agent, config.server.bearer_token.clone());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        auth = %config.server.bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
        "Starting weather agent HTTP server"
    );

    axum::serve(listener, router).await?;
    Ok(())
}
