//! Direct check routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use vouchledger_core::workflow::CheckStatus;
use vouchledger_db::entities::checks;
use vouchledger_db::repositories::{CheckOutcome, StatusExtra};

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the check routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checks/{check_id}", get(get_check))
        .route("/checks/{check_id}/status", post(change_status))
}

/// Request body for a check status change.
#[derive(Debug, Deserialize)]
pub struct CheckStatusRequest {
    /// Target status.
    pub status: CheckStatus,
    /// Clearing date and note.
    #[serde(flatten)]
    pub extra: StatusExtra,
}

/// GET `/checks/{check_id}`
async fn get_check(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(check_id): Path<i64>,
) -> Result<Json<checks::Model>, ApiError> {
    Ok(Json(state.checks().get(&principal, check_id).await?))
}

/// POST `/checks/{check_id}/status`
async fn change_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(check_id): Path<i64>,
    Json(payload): Json<CheckStatusRequest>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let outcome = state
        .checks()
        .set_status(&principal, check_id, payload.status, payload.extra)
        .await?;
    Ok(Json(outcome))
}
