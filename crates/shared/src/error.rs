//! Transport-neutral error shared by every layer.
//!
//! Domain errors (`LedgerError`, `WorkflowError`) convert into [`AppError`]
//! by taxonomy category; the API renders it as `{ error, message }`.

use thiserror::Error;

use crate::jwt::JwtError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Error categories visible to callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, expired or unverifiable credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Role or company scope forbids the operation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Voucher, check, account or checkbook does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed amount, missing field or illegal transition.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate check number, voucher number, prefix or overlapping series.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database or other server-side failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this category.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the caller can fix the request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(message) => Self::Internal(message),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}
