//! # Chat Hub
//!
//! Entry point: tracing, configuration, then the HTTP/WebSocket server.

use anyhow::Result;
use tracing::info;

use chat_hub::config::Settings;
use chat_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chat_hub::telemetry::init_tracing();

    info!("Starting Chat Hub...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        mirror = settings.redis.url.is_some(),
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Hub ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
