//! Property-based tests for the voucher and check lifecycles.

use proptest::prelude::*;
use rust_decimal::Decimal;
use vouchledger_shared::Role;

use crate::ledger::{BankTransactionType, outstanding};
use crate::workflow::check::{CheckLifecycle, LedgerEffect};
use crate::workflow::types::{CheckStatus, PaymentType, VoucherStatus};
use crate::workflow::voucher::{VoucherFacts, VoucherWorkflow};

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Admin),
        Just(Role::Liaison),
        Just(Role::Staff),
        Just(Role::Hr),
    ]
}

fn arb_voucher_status() -> impl Strategy<Value = VoucherStatus> {
    prop::sample::select(VoucherStatus::ALL.to_vec())
}

fn arb_check_status() -> impl Strategy<Value = CheckStatus> {
    prop::sample::select(CheckStatus::ALL.to_vec())
}

fn arb_payment_type() -> impl Strategy<Value = PaymentType> {
    prop_oneof![
        Just(PaymentType::Cash),
        Just(PaymentType::Check),
        Just(PaymentType::Encashment),
        Just(PaymentType::BankTransfer),
        Just(PaymentType::PettyCash),
    ]
}

/// Applies a ledger effect to a voucher's linked rows and the account balance.
fn post(
    effect: &LedgerEffect,
    linked: &mut Vec<(BankTransactionType, Decimal)>,
    balance: &mut Decimal,
) {
    match effect {
        LedgerEffect::None => {}
        LedgerEffect::Withdraw { amount, .. } => {
            linked.push((BankTransactionType::Withdrawal, *amount));
            *balance -= *amount;
        }
        LedgerEffect::Reverse { amount, .. } => {
            linked.push((BankTransactionType::Deposit, *amount));
            *balance += *amount;
        }
        LedgerEffect::BounceMarker => linked.push((BankTransactionType::Bounced, Decimal::ZERO)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Terminal vouchers never move, whoever asks.
    #[test]
    fn prop_terminal_vouchers_are_frozen(
        role in arb_role(),
        terminal in prop_oneof![Just(VoucherStatus::Voided), Just(VoucherStatus::Rejected)],
        requested in arb_voucher_status(),
        payment_type in arb_payment_type(),
    ) {
        let facts = VoucherFacts {
            id: 1,
            status: terminal,
            payment_type,
            has_check_number: true,
            has_bank_name: true,
            check_status: None,
        };
        prop_assert!(VoucherWorkflow::plan(role, &facts, requested, Some("reason")).is_err());
    }

    /// Preparers can never change a voucher's status.
    #[test]
    fn prop_preparers_cannot_transition(
        role in prop_oneof![Just(Role::Staff), Just(Role::Hr)],
        from in arb_voucher_status(),
        requested in arb_voucher_status(),
        payment_type in arb_payment_type(),
    ) {
        let facts = VoucherFacts {
            id: 1,
            status: from,
            payment_type,
            has_check_number: false,
            has_bank_name: false,
            check_status: None,
        };
        prop_assert!(VoucherWorkflow::plan(role, &facts, requested, Some("reason")).is_err());
    }

    /// Whatever sequence of check events happens, the voucher is never
    /// refunded more than was withdrawn, and a voided or bounced check ends
    /// with the account back where it started.
    #[test]
    fn prop_check_reversals_are_single(
        cents in 1i64..10_000_000,
        encashment in any::<bool>(),
        events in prop::collection::vec(arb_check_status(), 1..12),
    ) {
        let amount = Decimal::new(cents, 2);
        let mut linked = Vec::new();
        let mut balance = Decimal::ZERO;
        let mut status = CheckStatus::Issued;

        if encashment {
            let effect = CheckLifecycle::encashment_withdrawal(
                PaymentType::Encashment,
                amount,
                Decimal::ZERO,
            );
            post(&effect, &mut linked, &mut balance);
        }

        for target in events {
            let net = outstanding(&linked);
            if let Ok(Some(plan)) = CheckLifecycle::plan(status, target, amount, net) {
                post(&plan.effect, &mut linked, &mut balance);
                status = plan.to;
            }

            let withdrawn: Decimal = linked
                .iter()
                .filter(|(kind, _)| *kind == BankTransactionType::Withdrawal)
                .map(|(_, amount)| *amount)
                .sum();
            prop_assert!(withdrawn <= amount);
            prop_assert!(balance <= Decimal::ZERO);
            prop_assert!(balance >= -amount);
        }

        if status.is_terminal() {
            prop_assert_eq!(balance, Decimal::ZERO);
        }
    }
}
