//! Verified principal and JWT claims.
//!
//! The engine never parses tokens itself: the HTTP layer validates a bearer
//! token and turns its [`Claims`] into a [`Principal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{CompanyId, UserId};

/// Role of the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Final approver; may act across companies.
    Admin,
    /// Certifies vouchers and handles checks.
    Liaison,
    /// Prepares vouchers.
    Staff,
    /// Prepares vouchers (human resources).
    Hr,
}

impl Role {
    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "liaison" => Some(Self::Liaison),
            "staff" => Some(Self::Staff),
            "hr" => Some(Self::Hr),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Liaison => "liaison",
            Self::Staff => "staff",
            Self::Hr => "hr",
        }
    }

    /// Roles that only prepare vouchers and never approve them.
    #[must_use]
    pub const fn is_preparer(&self) -> bool {
        matches!(self, Self::Staff | Self::Hr)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id.
    pub id: UserId,
    /// Display name used for `certified_by` / `approved_by` stamps.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Company the user is bound to; `None` for global users.
    pub company_id: Option<CompanyId>,
}

impl Principal {
    /// Creates a new principal.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        role: Role,
        company_id: Option<CompanyId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            company_id,
        }
    }

    /// Returns true if the principal may act on records of `company_id`.
    ///
    /// Company-bound users see their own company only. Unbound users must be
    /// admins to act across companies.
    #[must_use]
    pub fn can_access_company(&self, company_id: CompanyId) -> bool {
        match self.company_id {
            Some(own) => own == company_id,
            None => self.role == Role::Admin,
        }
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: i64,
    /// Display name.
    pub name: String,
    /// Role name.
    pub role: String,
    /// Company scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<i64>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: i64,
        name: &str,
        role: Role,
        company: Option<i64>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            name: name.to_string(),
            role: role.as_str().to_string(),
            company,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Converts the claims into a principal, or `None` if the role is unknown.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        let role = Role::parse(&self.role)?;
        Some(Principal::new(
            UserId(self.sub),
            self.name.clone(),
            role,
            self.company.map(CompanyId),
        ))
    }
}
