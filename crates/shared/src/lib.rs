//! Shared types, errors, and configuration for Vouchledger.
//!
//! This crate provides common types used across all other crates:
//! - Decimal amount parsing for user-entered money
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - The verified principal and role model
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, Principal, Role};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
