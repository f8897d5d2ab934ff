//! Ledger domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bank transaction type.
///
/// Deposits add to the balance, withdrawals subtract from it. `Bounced` rows
/// are zero-effect markers kept for audit continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankTransactionType {
    /// Money in.
    Deposit,
    /// Money out.
    Withdrawal,
    /// Audit marker for a check that bounced before it cleared.
    Bounced,
}

impl BankTransactionType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Bounced => "Bounced",
        }
    }

    /// Parses a type from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Some(Self::Deposit),
            "withdrawal" => Some(Self::Withdrawal),
            "bounced" => Some(Self::Bounced),
            _ => None,
        }
    }

    /// Returns the signed effect of `amount` on the balance.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Deposit => amount,
            Self::Withdrawal => -amount,
            Self::Bounced => Decimal::ZERO,
        }
    }

    /// Returns the type that undoes this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Deposit => Self::Withdrawal,
            Self::Withdrawal => Self::Deposit,
            Self::Bounced => Self::Bounced,
        }
    }
}

impl fmt::Display for BankTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories stamped on engine-generated transactions.
pub mod category {
    /// Initial balance of a new bank account.
    pub const OPENING_BALANCE: &str = "Opening Balance";
    /// Withdrawal recorded when a check clears.
    pub const CHECK_CLEARED: &str = "Check Cleared";
    /// Withdrawal recorded when an encashment voucher is issued.
    pub const ENCASHMENT: &str = "Encashment";
    /// Refund of a withdrawal when its voucher or check is voided.
    pub const VOID_REFUND: &str = "Void Refund";
    /// Refund of a cleared check that bounced.
    pub const BOUNCE_REVERSAL: &str = "Check Bounced (Reversal)";
    /// Zero-amount marker for a check that bounced before clearing.
    pub const BOUNCE_MARKER: &str = "Check Bounced";
}
