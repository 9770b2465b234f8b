//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use live_collection::SyncError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// A change payload could not be decoded.
    Domain(DomainError),
    /// A collection could not be (re)activated.
    Sync(SyncError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Sync(err) => sync_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::UnknownTable(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::MissingIdentity { .. }
        | DomainError::WrongTable { .. }
        | DomainError::Decode(_) => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn sync_error_to_response(err: SyncError) -> (StatusCode, String) {
    match &err {
        SyncError::Load(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        SyncError::Subscribe(_) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        _ => {
            tracing::error!(error = %err, "synchronizer error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError::Sync(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UnknownEntityKind;
    use live_collection::LoadError;

    #[test]
    fn unknown_table_is_not_found() {
        let err = ApiError::from(DomainError::UnknownTable(UnknownEntityKind("staff".into())));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn load_failure_is_bad_gateway() {
        let err = ApiError::from(SyncError::Load(LoadError::Timeout));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_identity_is_bad_request() {
        let err = ApiError::from(DomainError::MissingIdentity {
            kind: common::EntityKind::Rooms,
            field: "room_number",
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
