//! `SeaORM` string enums and their conversions to the domain types.
//!
//! Every status is stored as text so the same schema runs on PostgreSQL
//! and SQLite.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vouchledger_core::checkbook::CheckbookStatus as CoreCheckbookStatus;
use vouchledger_core::ledger::BankTransactionType as CoreBankTransactionType;
use vouchledger_core::workflow::{
    CheckStatus as CoreCheckStatus, PaymentType as CorePaymentType,
    VoucherStatus as CoreVoucherStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum VoucherStatus {
    #[sea_orm(string_value = "Pending Liaison")]
    #[serde(rename = "Pending Liaison")]
    PendingLiaison,
    #[sea_orm(string_value = "Pending Admin")]
    #[serde(rename = "Pending Admin")]
    PendingAdmin,
    #[sea_orm(string_value = "Issued")]
    Issued,
    #[sea_orm(string_value = "Claimed")]
    Claimed,
    #[sea_orm(string_value = "Cleared")]
    Cleared,
    #[sea_orm(string_value = "Bounced")]
    Bounced,
    #[sea_orm(string_value = "Voided")]
    Voided,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PaymentType {
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "Check")]
    Check,
    #[sea_orm(string_value = "Encashment")]
    Encashment,
    #[sea_orm(string_value = "Bank Transfer")]
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[sea_orm(string_value = "Petty Cash")]
    #[serde(rename = "Petty Cash")]
    PettyCash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum CheckStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Issued")]
    Issued,
    #[sea_orm(string_value = "Claimed")]
    Claimed,
    #[sea_orm(string_value = "Cleared")]
    Cleared,
    #[sea_orm(string_value = "Bounced")]
    Bounced,
    #[sea_orm(string_value = "Voided")]
    Voided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CheckbookStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BankTransactionType {
    #[sea_orm(string_value = "Deposit")]
    Deposit,
    #[sea_orm(string_value = "Withdrawal")]
    Withdrawal,
    #[sea_orm(string_value = "Bounced")]
    Bounced,
}

impl VoucherStatus {
    /// Returns true for statuses with no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        CoreVoucherStatus::from(self).is_terminal()
    }
}

impl CheckStatus {
    /// Returns true once the check can no longer move.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        CoreCheckStatus::from(self).is_terminal()
    }
}

/// Maps a pair of enums with identical variants onto each other.
macro_rules! mirror {
    ($db:ident, $core:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror!(
    VoucherStatus,
    CoreVoucherStatus,
    [PendingLiaison, PendingAdmin, Issued, Claimed, Cleared, Bounced, Voided, Rejected]
);
mirror!(
    PaymentType,
    CorePaymentType,
    [Cash, Check, Encashment, BankTransfer, PettyCash]
);
mirror!(
    CheckStatus,
    CoreCheckStatus,
    [Pending, Issued, Claimed, Cleared, Bounced, Voided]
);
mirror!(CheckbookStatus, CoreCheckbookStatus, [Active, Closed]);
mirror!(
    BankTransactionType,
    CoreBankTransactionType,
    [Deposit, Withdrawal, Bounced]
);

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveEnum;

    #[test]
    fn test_string_values_match_domain_names() {
        for status in CoreVoucherStatus::ALL {
            let db = VoucherStatus::from(status);
            assert_eq!(db.to_value(), status.as_str());
            assert_eq!(CoreVoucherStatus::from(db), status);
        }
        for status in CoreCheckStatus::ALL {
            assert_eq!(CheckStatus::from(status).to_value(), status.as_str());
        }
        assert_eq!(PaymentType::BankTransfer.to_value(), "Bank Transfer");
    }
}
