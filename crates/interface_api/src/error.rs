//! API error handling
//!
//! Workflow errors map onto HTTP statuses; failures scoped to a claim echo
//! the claim id and, where known, the stage in the body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use claims_engine::WorkflowError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Workflow(err) => match err {
                WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                WorkflowError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                WorkflowError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "conflict"),
                WorkflowError::Classification { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "classification_failed")
                }
                WorkflowError::StageFailure { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "stage_failed")
                }
                WorkflowError::Cancelled { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "cancelled"),
                WorkflowError::Store { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let (claim_id, stage) = match &self {
            ApiError::Workflow(err) => (
                err.claim_id().map(ToString::to_string),
                err.stage().map(str::to_string),
            ),
            ApiError::BadRequest(_) => (None, None),
        };

        let body = ErrorResponse {
            error: kind.to_string(),
            message: self.to_string(),
            claim_id,
            stage,
        };

        (status, Json(body)).into_response()
    }
}
