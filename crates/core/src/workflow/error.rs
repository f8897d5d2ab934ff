//! Workflow error types for the voucher and check lifecycles.

use thiserror::Error;
use vouchledger_shared::{AppError, Role};

use crate::error::ErrorKind;
use crate::ledger::LedgerError;
use crate::workflow::types::{CheckStatus, VoucherStatus};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No rule leads from `from` to `to` for any role.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: VoucherStatus,
        /// The attempted target status.
        to: VoucherStatus,
    },

    /// The check lifecycle has no edge from `from` to `to`.
    #[error("Invalid check status transition from {from} to {to}")]
    InvalidCheckTransition {
        /// The current check status.
        from: CheckStatus,
        /// The attempted target status.
        to: CheckStatus,
    },

    /// The transition exists but not for this role.
    #[error("Role {role} may not {action}")]
    NotPermitted {
        /// The acting role.
        role: Role,
        /// What was attempted.
        action: String,
    },

    /// The principal is not scoped to the record's company.
    #[error("Access denied to company {0}")]
    CompanyAccessDenied(i64),

    /// The voucher can no longer be edited in this status.
    #[error("Voucher cannot be edited while {0}")]
    NotEditable(VoucherStatus),

    /// Void reason is required but not provided.
    #[error("Void reason is required")]
    VoidReasonRequired,

    /// A check payment cannot move past issue without its companion check.
    #[error("Voucher {0} has no companion check")]
    CompanionCheckMissing(i64),

    /// A required field is missing or blank.
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    /// Unknown voucher or check status text.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// Unknown payment type text.
    #[error("Unknown payment type: {0}")]
    UnknownPaymentType(String),

    /// Any other input problem.
    #[error("{0}")]
    Validation(String),

    /// Voucher not found.
    #[error("Voucher {0} not found")]
    VoucherNotFound(i64),

    /// Check not found.
    #[error("Check {0} not found")]
    CheckNotFound(i64),

    /// Check number already used on the bank account.
    #[error("Check number {check_number} already exists on bank account {bank_account_id}")]
    DuplicateCheckNumber {
        /// The bank account.
        bank_account_id: i64,
        /// The conflicting check number.
        check_number: String,
    },

    /// Voucher number already taken within the company.
    #[error("Voucher number {0} already exists")]
    DuplicateVoucherNumber(String),

    /// Balance ledger, checkbook or database failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl WorkflowError {
    /// Returns the taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransition { .. }
            | Self::InvalidCheckTransition { .. }
            | Self::NotEditable(_)
            | Self::VoidReasonRequired
            | Self::CompanionCheckMissing(_)
            | Self::MissingField(_)
            | Self::UnknownStatus(_)
            | Self::UnknownPaymentType(_)
            | Self::Validation(_) => ErrorKind::Validation,

            Self::NotPermitted { .. } | Self::CompanyAccessDenied(_) => ErrorKind::Authorization,

            Self::VoucherNotFound(_) | Self::CheckNotFound(_) => ErrorKind::NotFound,

            Self::DuplicateCheckNumber { .. } | Self::DuplicateVoucherNumber(_) => {
                ErrorKind::Conflict
            }

            Self::Ledger(err) => err.kind(),
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
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidCheckTransition { .. } => "INVALID_CHECK_TRANSITION",
            Self::NotPermitted { .. } => "NOT_PERMITTED",
            Self::CompanyAccessDenied(_) => "COMPANY_ACCESS_DENIED",
            Self::NotEditable(_) => "NOT_EDITABLE",
            Self::VoidReasonRequired => "VOID_REASON_REQUIRED",
            Self::CompanionCheckMissing(_) => "COMPANION_CHECK_MISSING",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::UnknownStatus(_) => "UNKNOWN_STATUS",
            Self::UnknownPaymentType(_) => "UNKNOWN_PAYMENT_TYPE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::VoucherNotFound(_) => "VOUCHER_NOT_FOUND",
            Self::CheckNotFound(_) => "CHECK_NOT_FOUND",
            Self::DuplicateCheckNumber { .. } => "DUPLICATE_CHECK_NUMBER",
            Self::DuplicateVoucherNumber(_) => "DUPLICATE_VOUCHER_NUMBER",
            Self::Ledger(err) => err.error_code(),
        }
    }

    /// Shorthand for a role that is not allowed to act.
    #[must_use]
    pub fn not_permitted(role: Role, action: impl Into<String>) -> Self {
        Self::NotPermitted {
            role,
            action: action.into(),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        if let WorkflowError::Ledger(inner) = err {
            return inner.into();
        }
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
