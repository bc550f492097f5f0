use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scoreplane_orchestrator::ReconcileError;
use scoreplane_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Translates internal failures into the HTTP error shape the CLI and other
/// callers parse (`{"error": "..."}`, per §6's endpoint contract).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("workload '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::WorkloadNotFound(_) | StoreError::ClaimNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
