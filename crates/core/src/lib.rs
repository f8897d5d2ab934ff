//! Core business logic for Vouchledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here; the `db`
//! crate executes the plans these modules produce.
//!
//! # Modules
//!
//! - `checkbook` - Check-number series and the next-number frontier
//! - `ledger` - Bank transaction types and running-balance replay
//! - `workflow` - Voucher and check state machines, permission table, numbering
//! - `reconciliation` - Drift detection rules and sweep reporting
//! - `storage` - Blob store collaborator for attachments
//! - `error` - Error taxonomy shared by the domain errors

pub mod checkbook;
pub mod error;
pub mod ledger;
pub mod reconciliation;
pub mod storage;
pub mod workflow;

pub use error::ErrorKind;
