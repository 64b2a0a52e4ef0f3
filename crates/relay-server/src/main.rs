//! # notify-relay
//!
//! Notification relay server: create a channel, post messages to it over
//! HTTP, read them back or follow them live.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (in-memory storage on 127.0.0.1:8080)
//! notify-relay
//!
//! # Run with a config file
//! NOTIFY_CONFIG=/path/to/notify-relay.toml notify-relay
//!
//! # Run with environment variables
//! NOTIFY_PORT=8080 NOTIFY_HOST=0.0.0.0 NOTIFY_STORAGE__BACKEND=redb notify-relay
//! ```

mod config;
mod error;
mod handlers;
mod live;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notify_relay=debug,notify_relay_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        "Starting notify-relay on {}:{} ({:?} storage)",
        config.host,
        config.port,
        config.storage.backend
    );

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
