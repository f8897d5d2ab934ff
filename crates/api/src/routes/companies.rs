//! Company routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use vouchledger_db::entities::companies;
use vouchledger_db::repositories::CreateCompanyInput;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the company routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companies", post(create_company))
        .route("/companies/{company_id}", get(get_company))
        .route("/companies/{company_id}/vouchers/renumber", post(renumber_vouchers))
}

/// POST `/companies` - Register a company with its voucher prefix.
async fn create_company(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateCompanyInput>,
) -> Result<(StatusCode, Json<companies::Model>), ApiError> {
    let company = state.companies().create(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET `/companies/{company_id}`
async fn get_company(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(company_id): Path<i64>,
) -> Result<Json<companies::Model>, ApiError> {
    Ok(Json(state.companies().get(&principal, company_id).await?))
}

/// POST `/companies/{company_id}/vouchers/renumber` - Close gaps in voucher numbers.
async fn renumber_vouchers(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(company_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let renumbered = state.vouchers().renumber(&principal, company_id).await?;
    Ok(Json(serde_json::json!({ "renumbered": renumbered })))
}
