//! Relay server setup
//!
//! Provides the WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::relay_handler;
pub use state::RelayState;

use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use homelink_common::{AppConfig, AppError, AppResult, CorsConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the relay router
pub fn create_router() -> Router<RelayState> {
    Router::new()
        .route("/gateway", get(relay_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    let cors = cors_layer(&state.config().cors);

    create_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configuration
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}

/// Run the relay server on the given address
pub async fn run_server(app: Router, addr: SocketAddr) -> AppResult<()> {
    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Relay listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::transport(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete relay server with configuration
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr: SocketAddr = config
        .relay
        .address()
        .parse()
        .map_err(|e| AppError::config(format!("Invalid relay address: {e}")))?;

    let state = RelayState::new(config);
    let app = create_app(state);

    run_server(app, addr).await
}
