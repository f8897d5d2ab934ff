//! Manual trigger for the reconciliation sweep.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;
use vouchledger_core::reconciliation::SweepReport;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the reconciliation routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/reconciliation/sweep", post(run_sweep))
}

#[derive(Debug, Serialize)]
struct SweepResponse {
    repaired_count: u64,
    #[serde(flatten)]
    report: SweepReport,
}

/// POST `/reconciliation/sweep` - Admin only.
async fn run_sweep(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<SweepResponse>, ApiError> {
    let report = state.reconciliation().sweep_as(&principal).await?;
    Ok(Json(SweepResponse {
        repaired_count: report.repaired_count(),
        report,
    }))
}
