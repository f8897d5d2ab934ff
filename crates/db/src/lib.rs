//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - A dialect-neutral migration
//! - Keyed per-account and per-company locks
//! - Repositories that run the voucher, check and ledger operations
//!   transactionally, and the reconciliation sweep

pub mod entities;
mod error;
pub mod locks;
pub mod migration;
pub mod repositories;

pub use locks::LedgerLocks;
pub use repositories::{
    BankAccountRepository, CheckRepository, CheckbookRepository, CompanyRepository,
    ReconciliationRepository, VoucherRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use vouchledger_shared::config::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);
    Database::connect(options).await
}
