//! Collection snapshot and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::EntityKind;
use live_collection::Activation;
use serde::Serialize;
use serde_json::Value;

use super::AppState;
use crate::collections::{CollectionSummary, LiveCollection};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct RefreshResponse {
    pub kind: EntityKind,
    pub activation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub collection: CollectionSummary,
}

/// Accepts either the URL slug (`guest-requests`) or the table name.
fn parse_kind(raw: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_slug(raw)
        .or_else(|_| EntityKind::from_table(raw))
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

fn lookup<'a>(state: &'a AppState, raw: &str) -> Result<&'a dyn LiveCollection, ApiError> {
    let kind = parse_kind(raw)?;
    state
        .collections
        .get(kind)
        .ok_or_else(|| ApiError::NotFound(format!("collection {kind} is not served")))
}

/// GET /collections: status of every collection.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<CollectionSummary>> {
    Json(state.collections.summaries())
}

/// GET /collections/{kind}: the current snapshot, in display order.
#[tracing::instrument(skip(state))]
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let collection = lookup(&state, &kind)?;
    Ok(Json(collection.snapshot_json()?))
}

/// POST /collections/{kind}/refresh: reloads the collection and restarts its
/// live updates.
#[tracing::instrument(skip(state))]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let collection = lookup(&state, &kind)?;
    let activation = collection.activate().await?;
    let detail = match &activation {
        Activation::Degraded(err) => Some(err.to_string()),
        _ => None,
    };

    Ok(Json(RefreshResponse {
        kind: collection.kind(),
        activation: activation.label(),
        detail,
        collection: collection.summary(),
    }))
}
