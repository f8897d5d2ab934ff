//! Common types used across the application.

pub mod amount;
pub mod id;
pub mod pagination;

pub use amount::{AmountError, AmountInput, parse_amount};
pub use id::*;
pub use pagination::{PageRequest, PageResponse};
