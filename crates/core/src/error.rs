//! Error taxonomy.
//!
//! Every domain error maps onto one of these categories. Validation,
//! authorization, not-found and conflict failures abort the whole logical
//! operation; integrity drift is only ever logged.

use serde::Serialize;

/// Category of a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    /// The principal may not perform the operation.
    Authorization,
    /// A referenced record does not exist.
    NotFound,
    /// A uniqueness rule would be violated.
    Conflict,
    /// Storage or unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}
