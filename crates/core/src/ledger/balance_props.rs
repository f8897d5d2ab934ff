//! Property-based tests for running-balance replay.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{LedgerEntry, next_balance, replay};
use super::types::BankTransactionType;

fn kind_strategy() -> impl Strategy<Value = BankTransactionType> {
    prop_oneof![
        Just(BankTransactionType::Deposit),
        Just(BankTransactionType::Withdrawal),
        Just(BankTransactionType::Bounced),
    ]
}

fn entries_strategy() -> impl Strategy<Value = Vec<LedgerEntry>> {
    prop::collection::vec((0u32..30, kind_strategy(), 1i64..1_000_000), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (day, kind, cents))| LedgerEntry {
                id: i64::try_from(i).unwrap_or(i64::MAX) + 1,
                transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Days::new(u64::from(day)),
                transaction_type: kind,
                amount: if kind == BankTransactionType::Bounced {
                    Decimal::ZERO
                } else {
                    Decimal::new(cents, 2)
                },
            })
            .collect()
    })
}

proptest! {
    /// Replaying twice gives the same balances.
    #[test]
    fn prop_replay_is_idempotent(entries in entries_strategy()) {
        let first = replay(&entries);
        let stored: Vec<(i64, Decimal)> = first
            .balances
            .iter()
            .map(|row| (row.id, row.running_balance))
            .collect();

        let second = replay(&entries);
        prop_assert_eq!(&first, &second);
        prop_assert!(second.changed(&stored).is_empty());
    }

    /// Each running balance is the previous one plus the signed amount.
    #[test]
    fn prop_running_balance_is_prefix_sum(entries in entries_strategy()) {
        let result = replay(&entries);
        let mut ordered = entries.clone();
        ordered.sort_by_key(LedgerEntry::sort_key);

        let mut previous = Decimal::ZERO;
        for (entry, row) in ordered.iter().zip(result.balances.iter()) {
            prop_assert_eq!(entry.id, row.id);
            let expected = next_balance(previous, entry.transaction_type, entry.amount);
            prop_assert_eq!(row.running_balance, expected);
            previous = expected;
        }
        prop_assert_eq!(result.final_balance, previous);
    }

    /// Input order never changes the outcome.
    #[test]
    fn prop_replay_ignores_input_order(entries in entries_strategy()) {
        let mut reversed = entries.clone();
        reversed.reverse();
        prop_assert_eq!(replay(&entries), replay(&reversed));
    }

    /// A withdrawal followed by its reversal restores the balance.
    #[test]
    fn prop_reversal_restores_balance(
        entries in entries_strategy(),
        cents in 1i64..1_000_000,
    ) {
        let before = replay(&entries).final_balance;
        let amount = Decimal::new(cents, 2);
        let next_id = i64::try_from(entries.len()).unwrap_or(0) + 1;
        let late = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

        let mut extended = entries.clone();
        extended.push(LedgerEntry {
            id: next_id,
            transaction_date: late,
            transaction_type: BankTransactionType::Withdrawal,
            amount,
        });
        extended.push(LedgerEntry {
            id: next_id + 1,
            transaction_date: late,
            transaction_type: BankTransactionType::Withdrawal.opposite(),
            amount,
        });

        prop_assert_eq!(replay(&extended).final_balance, before);
    }
}
