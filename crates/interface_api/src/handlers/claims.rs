//! Claims handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use core_kernel::ClaimId;
use domain_claims::{AuditLogEntry, Claim, ClaimInput, ClaimView};

use crate::dto::claims::{ClaimSearchQuery, SubmitClaimResponse};
use crate::{error::ApiError, AppState};

fn claim_id(raw: &str) -> Result<ClaimId, ApiError> {
    raw.parse()
        .map_err(|e: core_kernel::CoreError| ApiError::BadRequest(e.to_string()))
}

/// Submits a claim and runs it through the workflow
#[instrument(skip_all)]
pub async fn submit_claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitClaimResponse>), ApiError> {
    let Json(input) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let outcome = state.workflow.submit(input).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// Gets a claim with its workflow runs
pub async fn get_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClaimView>, ApiError> {
    let id = claim_id(&id)?;
    Ok(Json(state.workflow.get(&id).await?))
}

/// Audit trail for a claim, oldest first
pub async fn claim_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    let id = claim_id(&id)?;
    Ok(Json(state.workflow.history(&id).await?))
}

/// Runs the workflow again for an existing claim
#[instrument(skip(state))]
pub async fn reprocess_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClaimView>, ApiError> {
    let id = claim_id(&id)?;
    Ok(Json(state.workflow.reprocess(&id).await?))
}

/// Exact-match search by VIN and/or incident date
pub async fn search_claims(
    State(state): State<AppState>,
    Query(query): Query<ClaimSearchQuery>,
) -> Result<Json<Vec<Claim>>, ApiError> {
    Ok(Json(state.workflow.search(&query.into()).await?))
}
