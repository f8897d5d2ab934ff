//! Bearer tokens carrying a [`Principal`].
//!
//! The identity service that issues tokens lives elsewhere; this module only
//! has to agree with it on the HS256 secret and the claim layout. Issuing is
//! kept for tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::{Claims, Principal, Role};

/// Token settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret.
    pub secret: String,
    /// Lifetime of issued tokens in minutes.
    pub access_token_expires_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_minutes: 15,
        }
    }
}

/// Why a token was refused.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Signing failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Bad signature or malformed token.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// `exp` is in the past.
    #[error("token has expired")]
    Expired,

    /// Signature is valid but the role claim is not one we know.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// Verifies (and for tests, issues) access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl JwtService {
    /// Builds the keys from the shared secret.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(config.access_token_expires_minutes),
        }
    }

    /// Issues a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        name: &str,
        role: Role,
        company: Option<i64>,
    ) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, name, role, company, Utc::now() + self.lifetime);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Issues a token for an existing principal.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue(&self, principal: &Principal) -> Result<String, JwtError> {
        self.generate_access_token(
            principal.id.into_inner(),
            &principal.name,
            principal.role,
            principal.company_id.map(|c| c.into_inner()),
        )
    }

    /// Checks signature and expiry and returns the raw claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }

    /// Validates a token and resolves the principal it names.
    pub fn verify(&self, token: &str) -> Result<Principal, JwtError> {
        let claims = self.validate_token(token)?;
        claims
            .principal()
            .ok_or_else(|| JwtError::UnknownRole(claims.role.clone()))
    }
}
