//! HTTP read API and control endpoints for the dashboard.
//!
//! Reads are served from the engine's latest published view; control
//! requests are queued to the engine loop and answered with the actuation
//! result.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;
pub use state::AppState;

use crate::error::{Result, TelemetryError};
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

/// Serve the API until `shutdown` resolves.
pub async fn start_web_server(
    config: WebConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_app(&config, state);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| TelemetryError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TelemetryError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Starting Vortex API server on http://{}", addr);
    info!("Dashboard view: http://{}/api/dashboard", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TelemetryError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
