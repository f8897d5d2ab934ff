//! Database migration runner for Vouchledger.
//!
//! Reads `DATABASE_URL` and runs the ledger schema migration.
//!
//! Usage:
//!   migrator up      - Create the ledger tables
//!   migrator down    - Drop them again
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use sea_orm_migration::prelude::*;
use vouchledger_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
