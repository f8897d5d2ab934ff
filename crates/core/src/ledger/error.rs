//! Ledger error types.
//!
//! Covers bank accounts, bank transactions, checkbooks and the companies
//! that own them.

use rust_decimal::Decimal;
use thiserror::Error;
use vouchledger_shared::AppError;

use crate::error::ErrorKind;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Deposit and withdrawal amounts must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount text could not be parsed.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Opening balances cannot be negative.
    #[error("Initial balance cannot be negative, got {0}")]
    NegativeOpeningBalance(Decimal),

    /// Checkbook series bounds are unusable.
    #[error("Invalid check series {start}-{end}")]
    InvalidSeries {
        /// First number of the series.
        start: i64,
        /// Last number of the series.
        end: i64,
    },

    /// Any other input problem.
    #[error("{0}")]
    Validation(String),

    // ========== Authorization Errors ==========
    /// The principal may not act on this record.
    #[error("Access denied: {0}")]
    Forbidden(String),

    // ========== Not Found Errors ==========
    /// Company not found.
    #[error("Company not found: {0}")]
    CompanyNotFound(i64),

    /// Bank account not found.
    #[error("Bank account not found: {0}")]
    BankAccountNotFound(i64),

    /// Bank transaction not found.
    #[error("Bank transaction not found: {0}")]
    TransactionNotFound(i64),

    /// Checkbook not found.
    #[error("Checkbook not found: {0}")]
    CheckbookNotFound(i64),

    // ========== Conflict Errors ==========
    /// Another company already uses the prefix.
    #[error("Company prefix already exists: {0}")]
    DuplicatePrefix(String),

    /// New series overlaps an active checkbook of the same account.
    #[error("Check series overlaps active checkbook {0}")]
    SeriesOverlap(i64),

    /// A unique constraint rejected the write.
    #[error("Conflicting record: {0}")]
    Conflict(String),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount(_)
            | Self::InvalidAmount(_)
            | Self::NegativeOpeningBalance(_)
            | Self::InvalidSeries { .. }
            | Self::Validation(_) => ErrorKind::Validation,

            Self::Forbidden(_) => ErrorKind::Authorization,

            Self::CompanyNotFound(_)
            | Self::BankAccountNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::CheckbookNotFound(_) => ErrorKind::NotFound,

            Self::DuplicatePrefix(_) | Self::SeriesOverlap(_) | Self::Conflict(_) => {
                ErrorKind::Conflict
            }

            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::NegativeOpeningBalance(_) => "NEGATIVE_OPENING_BALANCE",
            Self::InvalidSeries { .. } => "INVALID_CHECK_SERIES",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::BankAccountNotFound(_) => "BANK_ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::CheckbookNotFound(_) => "CHECKBOOK_NOT_FOUND",
            Self::DuplicatePrefix(_) => "DUPLICATE_PREFIX",
            Self::SeriesOverlap(_) => "CHECK_SERIES_OVERLAP",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Authorization => Self::Forbidden(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_non_positive_amount() {
        let err = LedgerError::NonPositiveAmount(dec!(0));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "NON_POSITIVE_AMOUNT");
    }

    #[test]
    fn test_not_found_errors() {
        assert_eq!(LedgerError::BankAccountNotFound(7).status_code(), 404);
        assert_eq!(LedgerError::CheckbookNotFound(7).status_code(), 404);
        assert!(LedgerError::TransactionNotFound(7).to_string().contains('7'));
    }

    #[test]
    fn test_series_overlap_is_conflict() {
        let err = LedgerError::SeriesOverlap(3);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "CHECK_SERIES_OVERLAP");
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::DuplicatePrefix("ACME".into()).into();
        assert!(matches!(app, AppError::Conflict(_)));

        let app: AppError = LedgerError::Database("boom".into()).into();
        assert_eq!(app.status_code(), 500);
    }
}
