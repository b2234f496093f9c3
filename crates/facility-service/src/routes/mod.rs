//! HTTP routes for the facility service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::relay::RelayHub;
use crate::services::Clock;
use axum::{
    http::Method,
    middleware,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Source of "now" for id generation and check-in evaluation.
    pub clock: Arc<dyn Clock>,

    /// Frame relay shared by the producer and consumer sockets.
    pub relay: Arc<RelayHub>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Liveness and readiness probes
/// - `/metrics` - Prometheus metrics endpoint
/// - `/api/bookings`, `/api/bookings/:id` - Booking list, create, delete
/// - `/api/active-booking`, `/api/verify`, `/api/logs` - Check-in
/// - `/relay/health`, `/ws/relay`, `/ws/stream` - Frame relay
/// - TraceLayer, 30 second timeout, permissive CORS
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/api/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/api/bookings/:id", delete(handlers::delete_booking))
        .route("/api/active-booking", get(handlers::active_booking))
        .route("/api/verify", post(handlers::verify))
        .route("/api/logs", get(handlers::access_logs))
        .route("/relay/health", get(handlers::relay_health))
        .route("/ws/relay", get(handlers::relay_producer))
        .route("/ws/stream", get(handlers::relay_consumer))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. CorsLayer answers preflight requests
    // 4. http_metrics_middleware records ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_app_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppState>();
    }
}
