use anyhow::{Context, Result};
use cityweather_api::ServiceContext;
use cityweather_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    cityweather_core::init()?;

    let (config, _validation) = Config::load_validated()?;
    let bind_addr = config.server.bind_addr.clone();

    let context = ServiceContext::from_config(config)?;
    let app = context.router();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("CityWeather listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    context.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
