//! Database error mapping.

use sea_orm::{DbErr, SqlErr};
use vouchledger_core::ledger::LedgerError;

/// Maps a database error onto the ledger taxonomy.
///
/// Unique-constraint violations become conflicts; everything else is an
/// internal database failure. Workflow code converts the result with `?`.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => LedgerError::Conflict(detail),
        _ => LedgerError::Database(err.to_string()),
    }
}
