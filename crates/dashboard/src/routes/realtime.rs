//! Ingestion of database change notifications.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::RealtimePayload;

use super::AppState;
use crate::collections::Ingested;
use crate::error::ApiError;

/// POST /realtime: routes one change payload to its collection's live feed.
///
/// Payloads without a row image (deletes) are acknowledged but not applied.
#[tracing::instrument(skip(state, payload), fields(table = %payload.table, event = ?payload.event_type))]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RealtimePayload>,
) -> Result<(StatusCode, Json<Ingested>), ApiError> {
    let table = payload.table.clone();
    let result = payload
        .kind()
        .map_err(ApiError::from)
        .and_then(|kind| {
            state
                .collections
                .get(kind)
                .ok_or_else(|| ApiError::NotFound(format!("collection {kind} is not served")))
        })
        .and_then(|collection| collection.ingest(payload).map_err(ApiError::from));

    let outcome = match &result {
        Ok(Ingested { accepted: true, .. }) => "accepted",
        Ok(_) => "ignored",
        Err(_) => "rejected",
    };
    metrics::counter!("dashboard_realtime_payloads_total", "table" => table, "outcome" => outcome)
        .increment(1);

    let ingested = result?;
    tracing::debug!(accepted = ingested.accepted, delivered = ingested.delivered, "payload routed");
    Ok((StatusCode::ACCEPTED, Json(ingested)))
}
