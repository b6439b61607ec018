//! TransitDesk daemon
//!
//! Loads configuration, opens the encrypted database and runs the ETA alert
//! batch on its cron schedule until interrupted.

use anyhow::Context;
use tracing::{info, warn};
use transitdesk_app::utils::logging::init_tracing;
use transitdesk_app::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = transitdesk_infra::config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => warn!(error = %e, "no .env file loaded"),
    }

    info!(db_path = %config.database.path, "TransitDesk starting");
    let ctx = AppContext::new_with_config(config).await.context("failed to start TransitDesk")?;

    let health = ctx.health_check().await;
    info!(healthy = health.is_healthy, score = health.score, "startup health check");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    ctx.shutdown().await.context("failed to stop TransitDesk cleanly")?;
    info!("TransitDesk stopped");
    Ok(())
}
