//! Web application router and middleware setup.

use crate::web::config::WebConfig;
use crate::web::handlers;
use crate::web::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/system", get(handlers::get_system))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/channels/:id", get(handlers::get_channel))
        .route("/api/processes", get(handlers::get_processes))
        .route("/api/cores", get(handlers::get_cores))
        .route("/api/cores/:core/multiplier", post(handlers::set_multiplier))
        .route("/api/cores/:core/voltage", post(handlers::set_voltage))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
