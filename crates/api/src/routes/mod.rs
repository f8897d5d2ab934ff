//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod bank_accounts;
pub mod checks;
pub mod companies;
pub mod health;
pub mod reconciliation;
pub mod vouchers;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(companies::routes())
        .merge(vouchers::routes())
        .merge(checks::routes())
        .merge(bank_accounts::routes())
        .merge(reconciliation::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(health::routes()).merge(protected_routes)
}
