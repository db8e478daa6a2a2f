//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::OrchestratorError;
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Saga execution error.
    Orchestrator(OrchestratorError),
    /// Store read error outside a saga.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    serde_json::json!({ "error": err.to_string() }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Maps the saga failure taxonomy onto status codes the client can act on:
/// 404 for unknown orders, 409 for precondition violations, 503 for
/// storage (retry later), 502 for remote rejections, and 500 with a
/// `support_required` marker when compensation itself failed.
fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, serde_json::Value) {
    match &err {
        OrchestratorError::OrderNotFound(_) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": err.to_string() }),
        ),
        OrchestratorError::NotCancellable { .. } => (
            StatusCode::CONFLICT,
            serde_json::json!({ "error": err.to_string() }),
        ),
        OrchestratorError::Store(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({ "error": err.to_string() }),
        ),
        OrchestratorError::Location { .. } => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({ "error": err.to_string() }),
        ),
        OrchestratorError::SupportRequired {
            unresolved_lines, ..
        } => {
            tracing::error!(error = %err, "placement requires manual intervention");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": err.to_string(),
                    "support_required": true,
                    "unresolved_lines": unresolved_lines
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>(),
                }),
            )
        }
        OrchestratorError::Notification(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": err.to_string() }),
        ),
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
