//! Balance ledger logic.
//!
//! This module implements the pure side of the bank-account ledger:
//! - Transaction types and their effect on a balance
//! - Running-balance replay in `(transaction_date, id)` order
//! - Amount validation for postings and opening balances
//! - Error types for ledger and checkbook operations

pub mod balance;
pub mod error;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::{
    LedgerEntry, Replay, RunningBalance, is_back_dated, next_balance, opening_deposit, outstanding,
    replay, validate_posting_amount,
};
pub use error::LedgerError;
pub use types::{BankTransactionType, category};
