//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for vouchers, checks, bank accounts and checkbooks
//! - Bearer-token authentication producing a [`Principal`](vouchledger_shared::Principal)
//! - JSON error responses mapped from the domain error taxonomy

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use vouchledger_core::storage::BlobStore;
use vouchledger_db::{
    BankAccountRepository, CheckRepository, CheckbookRepository, CompanyRepository, LedgerLocks,
    ReconciliationRepository, VoucherRepository,
};
use vouchledger_shared::JwtService;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Per-account and per-company locks shared by every repository.
    pub locks: LedgerLocks,
    /// Blob store for voucher attachments.
    pub storage: Arc<dyn BlobStore>,
    /// Upper bound for a single request.
    pub request_timeout: Duration,
}

impl AppState {
    fn conn(&self) -> DatabaseConnection {
        (*self.db).clone()
    }

    /// Voucher repository over the shared pool and locks.
    #[must_use]
    pub fn vouchers(&self) -> VoucherRepository {
        VoucherRepository::new(self.conn(), self.locks.clone())
    }

    /// Check repository.
    #[must_use]
    pub fn checks(&self) -> CheckRepository {
        CheckRepository::new(self.conn(), self.locks.clone())
    }

    /// Bank account repository.
    #[must_use]
    pub fn bank_accounts(&self) -> BankAccountRepository {
        BankAccountRepository::new(self.conn(), self.locks.clone())
    }

    /// Checkbook repository.
    #[must_use]
    pub fn checkbooks(&self) -> CheckbookRepository {
        CheckbookRepository::new(self.conn(), self.locks.clone())
    }

    /// Company repository.
    #[must_use]
    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.conn())
    }

    /// Reconciliation sweep.
    #[must_use]
    pub fn reconciliation(&self) -> ReconciliationRepository {
        ReconciliationRepository::new(self.conn(), self.locks.clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
