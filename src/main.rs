//! Data Layer - Main entry point.
//!
//! Connects the data layer from CLI/environment configuration, verifies the
//! database (and cache, when configured) and holds the pool until Ctrl-C.

use clap::Parser;
use data_layer::DataLayer;
use data_layer::config::Config;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        app_name = %config.app_name,
        "Starting data layer v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The service cannot run without its primary datastore
    let layer = match DataLayer::connect(&config).await {
        Ok(layer) => layer,
        Err(e) => {
            error!(error = %e, suggestion = ?e.suggestion(), "Startup failed");
            std::process::exit(1);
        }
    };

    info!(
        cache = layer.cache_store().is_some(),
        "Data layer ready, press Ctrl-C to stop"
    );

    let released = layer.release_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C, releasing immediately");
        }
    });
    released.await?;

    info!("Shutdown complete");
    Ok(())
}
