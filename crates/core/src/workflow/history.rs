//! Voucher history entries.
//!
//! History is append-only; every mutating operation on a voucher or its
//! check writes exactly one entry.

use serde::Serialize;

use crate::storage::AttachmentKind;
use crate::workflow::types::{CheckStatus, VoucherStatus};

/// Action names stored in the history log.
pub mod action {
    /// Voucher created.
    pub const CREATED: &str = "Created";
    /// Fields edited.
    pub const UPDATED: &str = "Updated";
    /// Voucher status changed.
    pub const STATUS_CHANGED: &str = "Status Changed";
    /// Companion check status changed.
    pub const CHECK_STATUS_CHANGED: &str = "Check Status Changed";
    /// File attached.
    pub const ATTACHMENT_ADDED: &str = "Attachment Added";
    /// Number rewritten by a renumber run.
    pub const RENUMBERED: &str = "Renumbered";
    /// Removed by an administrator.
    pub const FORCE_DELETED: &str = "Force Deleted";
}

/// A history row before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Action name.
    pub action: &'static str,
    /// Free-text detail.
    pub detail: String,
}

impl HistoryEntry {
    /// Voucher created with `voucher_no` in `status`.
    #[must_use]
    pub fn created(voucher_no: &str, status: VoucherStatus) -> Self {
        Self {
            action: action::CREATED,
            detail: format!("{voucher_no} created as {status}"),
        }
    }

    /// Fields edited; `summary` comes from the change list.
    #[must_use]
    pub fn updated(summary: String) -> Self {
        Self {
            action: action::UPDATED,
            detail: summary,
        }
    }

    /// Voucher moved between statuses.
    #[must_use]
    pub fn status_changed(from: VoucherStatus, to: VoucherStatus, note: Option<&str>) -> Self {
        let detail = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => format!("{from} -> {to}: {note}"),
            None => format!("{from} -> {to}"),
        };
        Self {
            action: action::STATUS_CHANGED,
            detail,
        }
    }

    /// Check moved between statuses.
    #[must_use]
    pub fn check_status_changed(check_number: &str, from: CheckStatus, to: CheckStatus) -> Self {
        Self {
            action: action::CHECK_STATUS_CHANGED,
            detail: format!("Check {check_number}: {from} -> {to}"),
        }
    }

    /// File stored and stamped on the voucher.
    #[must_use]
    pub fn attachment_added(kind: AttachmentKind, filename: &str) -> Self {
        Self {
            action: action::ATTACHMENT_ADDED,
            detail: format!("{}: {filename}", kind.as_str()),
        }
    }

    /// Voucher number rewritten.
    #[must_use]
    pub fn renumbered(from: &str, to: &str) -> Self {
        Self {
            action: action::RENUMBERED,
            detail: format!("{from} -> {to}"),
        }
    }

    /// Voucher removed with its derived rows.
    #[must_use]
    pub fn force_deleted(voucher_no: &str, transactions_removed: u64) -> Self {
        Self {
            action: action::FORCE_DELETED,
            detail: format!("{voucher_no} deleted with {transactions_removed} bank transaction(s)"),
        }
    }
}
