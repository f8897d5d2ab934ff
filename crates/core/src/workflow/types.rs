//! Workflow domain types for the voucher and check lifecycles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Voucher status in the approval workflow.
///
/// The happy path for a check payment is
/// `Pending Liaison → Pending Admin → Issued → Claimed → Cleared`; other
/// payment types skip `Pending Admin`. `Voided` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Waiting for liaison certification.
    #[serde(rename = "Pending Liaison")]
    PendingLiaison,
    /// Certified, waiting for admin approval.
    #[serde(rename = "Pending Admin")]
    PendingAdmin,
    /// Approved; money is about to move.
    Issued,
    /// Payee picked up the payment.
    Claimed,
    /// Funds left the bank account.
    Cleared,
    /// Payment bounced.
    Bounced,
    /// Cancelled after the fact.
    Voided,
    /// Turned down during approval.
    Rejected,
}

impl VoucherStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 8] = [
        Self::PendingLiaison,
        Self::PendingAdmin,
        Self::Issued,
        Self::Claimed,
        Self::Cleared,
        Self::Bounced,
        Self::Voided,
        Self::Rejected,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingLiaison => "Pending Liaison",
            Self::PendingAdmin => "Pending Admin",
            Self::Issued => "Issued",
            Self::Claimed => "Claimed",
            Self::Cleared => "Cleared",
            Self::Bounced => "Bounced",
            Self::Voided => "Voided",
            Self::Rejected => "Rejected",
        }
    }

    /// Parses a status from a string (case-insensitive, `_` or space).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "pending liaison" => Some(Self::PendingLiaison),
            "pending admin" => Some(Self::PendingAdmin),
            "issued" => Some(Self::Issued),
            "claimed" => Some(Self::Claimed),
            "cleared" => Some(Self::Cleared),
            "bounced" => Some(Self::Bounced),
            "voided" => Some(Self::Voided),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if no transition may leave this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Voided | Self::Rejected)
    }

    /// Returns true while the voucher is still awaiting approval.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::PendingLiaison | Self::PendingAdmin)
    }

    /// Check status that mirrors this voucher status, if any.
    #[must_use]
    pub const fn as_check_status(&self) -> Option<CheckStatus> {
        match self {
            Self::Issued => Some(CheckStatus::Issued),
            Self::Claimed => Some(CheckStatus::Claimed),
            Self::Cleared => Some(CheckStatus::Cleared),
            Self::Bounced => Some(CheckStatus::Bounced),
            Self::Voided => Some(CheckStatus::Voided),
            Self::PendingLiaison | Self::PendingAdmin | Self::Rejected => None,
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a voucher is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    /// Cash.
    Cash,
    /// Check drawn on a company bank account.
    Check,
    /// Check encashed by the company; the withdrawal happens on issue.
    Encashment,
    /// Bank transfer.
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    /// Petty cash.
    #[serde(rename = "Petty Cash")]
    PettyCash,
}

impl PaymentType {
    /// Returns the string representation of the payment type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Check => "Check",
            Self::Encashment => "Encashment",
            Self::BankTransfer => "Bank Transfer",
            Self::PettyCash => "Petty Cash",
        }
    }

    /// Parses a payment type from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "cash" => Some(Self::Cash),
            "check" | "cheque" => Some(Self::Check),
            "encashment" => Some(Self::Encashment),
            "bank transfer" => Some(Self::BankTransfer),
            "petty cash" => Some(Self::PettyCash),
            _ => None,
        }
    }

    /// Payment types that go through a companion check and admin approval.
    #[must_use]
    pub const fn uses_check(&self) -> bool {
        matches!(self, Self::Check | Self::Encashment)
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Written but not yet approved.
    Pending,
    /// Approved and handed over.
    Issued,
    /// Picked up by the payee.
    Claimed,
    /// Paid by the bank.
    Cleared,
    /// Returned unpaid.
    Bounced,
    /// Cancelled.
    Voided,
}

impl CheckStatus {
    /// Every status.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Issued,
        Self::Claimed,
        Self::Cleared,
        Self::Bounced,
        Self::Voided,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Issued => "Issued",
            Self::Claimed => "Claimed",
            Self::Cleared => "Cleared",
            Self::Bounced => "Bounced",
            Self::Voided => "Voided",
        }
    }

    /// Parses a status from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "issued" => Some(Self::Issued),
            "claimed" => Some(Self::Claimed),
            "cleared" => Some(Self::Cleared),
            "bounced" => Some(Self::Bounced),
            "voided" => Some(Self::Voided),
            _ => None,
        }
    }

    /// Returns true once the check is out of circulation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Bounced | Self::Voided)
    }

    /// Voucher status that follows this check status, if any.
    #[must_use]
    pub const fn as_voucher_status(&self) -> Option<VoucherStatus> {
        match self {
            Self::Pending => None,
            Self::Issued => Some(VoucherStatus::Issued),
            Self::Claimed => Some(VoucherStatus::Claimed),
            Self::Cleared => Some(VoucherStatus::Cleared),
            Self::Bounced => Some(VoucherStatus::Bounced),
            Self::Voided => Some(VoucherStatus::Voided),
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
