//! Voucher and check workflow.
//!
//! This module implements the two coupled state machines, the role-gated
//! permission table they share, voucher numbering, field edits and the
//! history log vocabulary.
//!
//! # Modules
//!
//! - `types` - Voucher/check statuses and payment types
//! - `error` - Workflow-specific error types
//! - `permissions` - Declarative role/transition table
//! - `voucher` - Voucher state machine and its side effects
//! - `check` - Check state machine and ledger effects
//! - `changes` - Field edits, diffs and edit permissions
//! - `numbering` - Company-scoped voucher numbers
//! - `history` - History entries

pub mod changes;
pub mod check;
pub mod error;
pub mod history;
pub mod numbering;
pub mod permissions;
pub mod types;
pub mod voucher;

#[cfg(test)]
mod lifecycle_props;

pub use changes::{
    CheckUpdate, FieldChange, FieldChanges, VoucherFields, VoucherPatch, authorize_edit,
};
pub use check::{CheckLifecycle, CheckTransition, LedgerEffect};
pub use error::WorkflowError;
pub use history::HistoryEntry;
pub use types::{CheckStatus, PaymentType, VoucherStatus};
pub use voucher::{Stamp, VoucherEffect, VoucherFacts, VoucherTransition, VoucherWorkflow};
