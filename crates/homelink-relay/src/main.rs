//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p homelink-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use homelink_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the server
    if let Err(e) = run().await {
        error!(error = %e, "Relay failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting homelink relay...");

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        port = config.relay.port,
        "Configuration loaded"
    );

    // Run the relay server
    homelink_relay::run(config).await?;

    Ok(())
}
