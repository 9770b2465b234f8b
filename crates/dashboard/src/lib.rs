//! Staff dashboard service.
//!
//! Keeps the hotel's operational collections (guest profiles, guest and
//! service requests, rooms, notifications) live in memory and serves their
//! snapshots over HTTP, with structured logging (tracing) and Prometheus
//! metrics.

pub mod collections;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod rest;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use collections::{CollectionSummary, Collections, Ingested, LiveCollection, Source};
pub use config::{BackendConfig, Config};
pub use error::ApiError;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(collections: Arc<Collections>, metrics_handle: PrometheusHandle) -> Router {
    let state = Arc::new(AppState { collections });

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/collections", get(routes::collections::list))
        .route("/collections/{kind}", get(routes::collections::snapshot))
        .route(
            "/collections/{kind}/refresh",
            post(routes::collections::refresh),
        )
        .route("/realtime", post(routes::realtime::ingest))
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
