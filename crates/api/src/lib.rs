//! HTTP API server with observability for the reputation service.
//!
//! Exposes review change ingestion, the administrative full recompute and
//! per-subject statistics, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use doc_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route(
            "/events/review-changed",
            post(routes::events::review_changed::<S>),
        )
        .route(
            "/reputation/recompute-all",
            post(routes::reputation::recompute_all::<S>),
        )
        .route(
            "/reputation/statistics",
            post(routes::reputation::statistics::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
pub fn create_default_state<S: DocumentStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    if config.admin_tokens.is_empty() {
        tracing::warn!("no ADMIN_TOKENS configured, full recompute is disabled");
    }
    Arc::new(AppState::new(store, config))
}
