//! Running-balance arithmetic.
//!
//! A bank account's balance is the replay of its transaction log ordered by
//! `(transaction_date, id)`. Every stored `running_balance` is the prefix sum
//! of that replay and `current_balance` is the last one.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::error::LedgerError;
use crate::ledger::types::BankTransactionType;

/// One row of an account's transaction log, as far as balances care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Transaction id; breaks ties between rows on the same date.
    pub id: i64,
    /// Booking date.
    pub transaction_date: NaiveDate,
    /// Deposit, withdrawal or bounce marker.
    pub transaction_type: BankTransactionType,
    /// Unsigned amount.
    pub amount: Decimal,
}

impl LedgerEntry {
    /// Ordering key of the log.
    #[must_use]
    pub const fn sort_key(&self) -> (NaiveDate, i64) {
        (self.transaction_date, self.id)
    }
}

/// Recomputed balance for a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Transaction id.
    pub id: i64,
    /// Balance after this transaction.
    pub running_balance: Decimal,
}

/// Result of replaying a transaction log from zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replay {
    /// Running balances in log order.
    pub balances: Vec<RunningBalance>,
    /// Balance after the last transaction (zero for an empty log).
    pub final_balance: Decimal,
}

impl Replay {
    /// Returns the rows whose stored balance differs from the replay.
    ///
    /// `stored` holds `(id, running_balance)` pairs as currently persisted.
    /// Ids missing from `stored` are reported as well.
    #[must_use]
    pub fn changed(&self, stored: &[(i64, Decimal)]) -> Vec<RunningBalance> {
        let stored: HashMap<i64, Decimal> = stored.iter().copied().collect();
        self.balances
            .iter()
            .filter(|row| stored.get(&row.id) != Some(&row.running_balance))
            .copied()
            .collect()
    }

    /// Returns the replayed balance of one transaction.
    #[must_use]
    pub fn balance_of(&self, id: i64) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.running_balance)
    }
}

/// Replays `entries` from zero in `(transaction_date, id)` order.
///
/// The input does not need to be sorted.
#[must_use]
pub fn replay(entries: &[LedgerEntry]) -> Replay {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.sort_key());

    let mut balance = Decimal::ZERO;
    let balances = ordered
        .into_iter()
        .map(|entry| {
            balance += entry.transaction_type.signed(entry.amount);
            RunningBalance {
                id: entry.id,
                running_balance: balance,
            }
        })
        .collect();

    Replay {
        balances,
        final_balance: balance,
    }
}

/// Balance after appending one transaction to `previous`.
#[must_use]
pub fn next_balance(
    previous: Decimal,
    transaction_type: BankTransactionType,
    amount: Decimal,
) -> Decimal {
    previous + transaction_type.signed(amount)
}

/// Returns true when a new row dated `date` lands before the end of the log.
#[must_use]
pub fn is_back_dated(date: NaiveDate, latest: Option<NaiveDate>) -> bool {
    latest.is_some_and(|latest| date < latest)
}

/// Validates the amount of a posting.
///
/// Deposits and withdrawals must be strictly positive. Bounce markers carry
/// zero but may not be negative.
pub fn validate_posting_amount(
    transaction_type: BankTransactionType,
    amount: Decimal,
) -> Result<(), LedgerError> {
    match transaction_type {
        BankTransactionType::Deposit | BankTransactionType::Withdrawal
            if amount <= Decimal::ZERO =>
        {
            Err(LedgerError::NonPositiveAmount(amount))
        }
        BankTransactionType::Bounced if amount < Decimal::ZERO => {
            Err(LedgerError::NonPositiveAmount(amount))
        }
        _ => Ok(()),
    }
}

/// Validates an opening balance and returns the deposit it turns into.
///
/// Zero opens the account without a transaction.
pub fn opening_deposit(initial_balance: Decimal) -> Result<Option<Decimal>, LedgerError> {
    if initial_balance < Decimal::ZERO {
        return Err(LedgerError::NegativeOpeningBalance(initial_balance));
    }
    Ok((initial_balance > Decimal::ZERO).then_some(initial_balance))
}

/// Net amount withdrawn on behalf of a voucher.
///
/// `linked` holds the voucher's own transactions. Withdrawals count up,
/// deposits (refunds and reversals) count down, bounce markers are ignored.
/// Never negative.
#[must_use]
pub fn outstanding(linked: &[(BankTransactionType, Decimal)]) -> Decimal {
    let net: Decimal = linked
        .iter()
        .map(|(kind, amount)| -kind.signed(*amount))
        .sum();
    net.max(Decimal::ZERO)
}
