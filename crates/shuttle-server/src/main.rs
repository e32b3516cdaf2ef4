//! # Shuttle Server
//!
//! Live location channel for the school shuttle backend.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (reads ./shuttle.toml if present)
//! shuttle
//!
//! # Run with environment overrides
//! SHUTTLE_PORT=8080 SHUTTLE_HOST=0.0.0.0 shuttle
//! ```

use anyhow::Result;
use shuttle_server::{config, handlers, metrics};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shuttle_server=debug,shuttle_core=debug,shuttle_transport=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting shuttle server on {}:{}", config.host, config.port);

    metrics::init_metrics();

    handlers::run_server(config).await?;

    Ok(())
}
