//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `"rest"` when loading from the backend, `"fixtures"` otherwise.
    pub source: &'static str,
    /// Collections currently receiving live updates.
    pub live: usize,
}

/// GET /health: returns service health and how collections are fed.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let live = state
        .collections
        .summaries()
        .iter()
        .filter(|summary| summary.live)
        .count();

    Json(HealthResponse {
        status: "ok",
        source: state.collections.source(),
        live,
    })
}
