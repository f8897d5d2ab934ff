//! Integration tests for the coupled voucher and check lifecycles.
//!
//! Run with: `cargo test -p vouchledger-db --test voucher_lifecycle_test`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{TestEnv, admin, cash_voucher, check_voucher, date, fields, liaison, staff};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vouchledger_core::ledger::category;
use vouchledger_core::workflow::{CheckStatus, PaymentType, VoucherStatus, WorkflowError};
use vouchledger_db::entities::sea_orm_active_enums as db;
use vouchledger_db::repositories::{CreateVoucherInput, StatusExtra};

fn cleared_on(day: chrono::NaiveDate) -> StatusExtra {
    StatusExtra {
        date_cleared: Some(day),
        ..Default::default()
    }
}

fn void_because(reason: &str) -> StatusExtra {
    StatusExtra {
        void_reason: Some(reason.into()),
        ..Default::default()
    }
}

/// Creates a check voucher as admin, which issues it straight away.
async fn issued_check_voucher(env: &TestEnv, check_no: &str, amount: Decimal) -> i64 {
    let created = env
        .vouchers()
        .create(&admin(), check_voucher(env.company_id(), check_no, amount))
        .await
        .unwrap();
    assert_eq!(created.status, VoucherStatus::Issued);
    created.id
}

async fn check_id_of(env: &TestEnv, voucher_id: i64) -> i64 {
    env.vouchers()
        .get(&admin(), voucher_id)
        .await
        .unwrap()
        .check
        .expect("companion check")
        .id
}

// ============================================================================
// Happy path: staff -> liaison -> admin -> cleared
// ============================================================================

#[tokio::test]
async fn test_check_voucher_full_lifecycle() {
    let env = TestEnv::new().await;
    let book = env.checkbook().await;
    let company = env.company_id();
    let vouchers = env.vouchers();

    // Staff prepares the voucher.
    let created = vouchers
        .create(&staff(company), check_voucher(company, "00123", dec!(500)))
        .await
        .unwrap();
    assert_eq!(created.status, VoucherStatus::PendingLiaison);
    assert_eq!(created.voucher_no, "ACME-00001");
    assert!(vouchers.get(&admin(), created.id).await.unwrap().check.is_none());

    // Liaison asks for Issued; check payments stop at Pending Admin.
    let certified = vouchers
        .set_status(&liaison(company), created.id, VoucherStatus::Issued, StatusExtra::default())
        .await
        .unwrap();
    assert_eq!(certified.to, VoucherStatus::PendingAdmin);
    assert_eq!(certified.voucher.certified_by.as_deref(), Some("Lee Liaison"));
    let check = certified.check.expect("pending check");
    assert_eq!(check.status, db::CheckStatus::Pending);
    assert_eq!(check.amount, dec!(500));
    assert_eq!(check.check_number, "00123");

    // Admin approves.
    let approved = vouchers
        .set_status(&admin(), created.id, VoucherStatus::Issued, StatusExtra::default())
        .await
        .unwrap();
    assert_eq!(approved.voucher.status, db::VoucherStatus::Issued);
    assert_eq!(approved.voucher.approved_by.as_deref(), Some("Ada Admin"));
    let check = approved.check.expect("issued check");
    assert_eq!(check.status, db::CheckStatus::Issued);
    assert!(check.date_issued.is_some());
    assert_eq!(env.next_check_no(book.id).await, 124);
    assert_eq!(env.balance().await, dec!(1000));

    // The bank pays the check.
    let outcome = env
        .checks()
        .set_status(&liaison(company), check.id, CheckStatus::Cleared, cleared_on(date(2024, 3, 1)))
        .await
        .unwrap();
    assert!(outcome.changed());
    assert_eq!(outcome.check.date_cleared, Some(date(2024, 3, 1)));
    assert_eq!(outcome.voucher.status, db::VoucherStatus::Cleared);
    assert_eq!(outcome.new_balance(), Some(dec!(500)));

    let posted = outcome.posted.unwrap().transaction;
    assert_eq!(posted.transaction_type, db::BankTransactionType::Withdrawal);
    assert_eq!(posted.amount, dec!(500));
    assert_eq!(posted.transaction_date, date(2024, 3, 1));
    assert_eq!(posted.running_balance, dec!(500));
    assert_eq!(posted.category.as_deref(), Some(category::CHECK_CLEARED));
    assert_eq!(posted.check_no.as_deref(), Some("00123"));
    assert_eq!(env.balance().await, dec!(500));
    env.assert_replay_consistent().await;

    let details = vouchers.get(&admin(), created.id).await.unwrap();
    let actions: Vec<&str> = details.history.iter().map(|h| h.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["Created", "Status Changed", "Status Changed", "Check Status Changed"]
    );
    assert_eq!(details.transactions.len(), 1);
}

#[tokio::test]
async fn test_cash_voucher_issues_without_check() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let created = env
        .vouchers()
        .create(&staff(company), cash_voucher(company, dec!(75)))
        .await
        .unwrap();

    let change = env
        .vouchers()
        .set_status(
            &liaison(company),
            created.id,
            VoucherStatus::PendingAdmin,
            StatusExtra::default(),
        )
        .await
        .unwrap();
    assert_eq!(change.to, VoucherStatus::Issued);
    assert!(change.check.is_none());
    assert!(change.postings.is_empty());

    let claimed = env
        .vouchers()
        .set_status(
            &liaison(company),
            created.id,
            VoucherStatus::Claimed,
            StatusExtra {
                received_by: Some("Juan".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(claimed.voucher.received_by.as_deref(), Some("Juan"));
    assert_eq!(env.balance().await, dec!(1000));
}

#[tokio::test]
async fn test_clearing_through_voucher_delegates_to_check() {
    let env = TestEnv::new().await;
    let voucher_id = issued_check_voucher(&env, "00150", dec!(250)).await;

    let change = env
        .vouchers()
        .set_status(&admin(), voucher_id, VoucherStatus::Cleared, cleared_on(date(2024, 2, 20)))
        .await
        .unwrap();
    assert_eq!(change.voucher.status, db::VoucherStatus::Cleared);
    assert_eq!(change.check.unwrap().status, db::CheckStatus::Cleared);
    assert_eq!(change.postings.len(), 1);
    assert_eq!(env.balance().await, dec!(750));

    // One history row for the whole operation.
    let history = env.vouchers().get(&admin(), voucher_id).await.unwrap().history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].action, "Status Changed");
}

#[tokio::test]
async fn test_admin_created_check_voucher_advances_checkbook() {
    let env = TestEnv::new().await;
    let book = env.checkbook().await;
    let voucher_id = issued_check_voucher(&env, "00100", dec!(10)).await;

    assert_eq!(env.next_check_no(book.id).await, 101);
    let check = env.checks().get(&admin(), check_id_of(&env, voucher_id).await).await.unwrap();
    assert_eq!(check.status, db::CheckStatus::Issued);
    assert_eq!(
        env.checkbooks()
            .suggest_next(&admin(), env.account.id)
            .await
            .unwrap()
            .as_deref(),
        Some("101")
    );
}

#[tokio::test]
async fn test_checkbook_failure_does_not_fail_approval() {
    use sea_orm::ConnectionTrait;

    let env = TestEnv::new().await;
    env.db
        .execute_unprepared("DROP TABLE checkbooks")
        .await
        .unwrap();

    let voucher_id = issued_check_voucher(&env, "00100", dec!(10)).await;
    let details = env.vouchers().get(&admin(), voucher_id).await.unwrap();
    assert_eq!(details.voucher.status, db::VoucherStatus::Issued);
    assert_eq!(details.check.unwrap().status, db::CheckStatus::Issued);
    assert_eq!(details.history.len(), 1);
}

// ============================================================================
// Reversals happen exactly once
// ============================================================================

#[tokio::test]
async fn test_bounce_after_clear_reverses_once() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let voucher_id = issued_check_voucher(&env, "00123", dec!(500)).await;
    let check_id = check_id_of(&env, voucher_id).await;
    let checks = env.checks();

    checks
        .set_status(&admin(), check_id, CheckStatus::Cleared, cleared_on(date(2024, 3, 1)))
        .await
        .unwrap();
    let bounced = checks
        .set_status(&liaison(company), check_id, CheckStatus::Bounced, StatusExtra::default())
        .await
        .unwrap();
    let reversal = bounced.posted.unwrap().transaction;
    assert_eq!(reversal.transaction_type, db::BankTransactionType::Deposit);
    assert_eq!(reversal.amount, dec!(500));
    assert_eq!(reversal.category.as_deref(), Some(category::BOUNCE_REVERSAL));
    assert_eq!(bounced.voucher.status, db::VoucherStatus::Bounced);
    assert_eq!(env.balance().await, dec!(1000));

    // Repeating the status is a no-op.
    let again = checks
        .set_status(&liaison(company), check_id, CheckStatus::Bounced, StatusExtra::default())
        .await
        .unwrap();
    assert!(!again.changed());
    assert!(again.posted.is_none());

    // Voiding the bounced voucher finds nothing outstanding.
    let voided = env
        .vouchers()
        .set_status(&admin(), voucher_id, VoucherStatus::Voided, void_because("stale check"))
        .await
        .unwrap();
    assert!(voided.postings.is_empty());
    assert_eq!(voided.voucher.void_reason.as_deref(), Some("stale check"));
    assert_eq!(voided.check.unwrap().status, db::CheckStatus::Voided);

    assert_eq!(env.balance().await, dec!(1000));
    assert_eq!(env.transactions().await.len(), 3);
    env.assert_replay_consistent().await;
}

#[tokio::test]
async fn test_void_cleared_check_refunds_once() {
    let env = TestEnv::new().await;
    let voucher_id = issued_check_voucher(&env, "00123", dec!(500)).await;
    let check_id = check_id_of(&env, voucher_id).await;

    env.checks()
        .set_status(&admin(), check_id, CheckStatus::Cleared, cleared_on(date(2024, 3, 1)))
        .await
        .unwrap();
    let voided = env
        .vouchers()
        .set_status(&admin(), voucher_id, VoucherStatus::Voided, void_because("wrong payee"))
        .await
        .unwrap();
    assert_eq!(voided.postings.len(), 1);
    assert_eq!(voided.postings[0].transaction.category.as_deref(), Some(category::VOID_REFUND));
    assert_eq!(env.balance().await, dec!(1000));

    // Voided is final.
    let err = env
        .vouchers()
        .set_status(&admin(), voucher_id, VoucherStatus::Voided, void_because("again"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    assert_eq!(env.balance().await, dec!(1000));
}

#[tokio::test]
async fn test_bounce_uncleared_check_leaves_marker() {
    let env = TestEnv::new().await;
    let voucher_id = issued_check_voucher(&env, "00123", dec!(500)).await;
    let check_id = check_id_of(&env, voucher_id).await;

    let bounced = env
        .checks()
        .set_status(&admin(), check_id, CheckStatus::Bounced, StatusExtra::default())
        .await
        .unwrap();
    let marker = bounced.posted.unwrap().transaction;
    assert_eq!(marker.transaction_type, db::BankTransactionType::Bounced);
    assert_eq!(marker.amount, Decimal::ZERO);
    assert_eq!(marker.category.as_deref(), Some(category::BOUNCE_MARKER));
    assert_eq!(env.balance().await, dec!(1000));
    env.assert_replay_consistent().await;
}

// ============================================================================
// Encashment
// ============================================================================

#[tokio::test]
async fn test_encashment_with_check_withdraws_on_issue_only() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let input = CreateVoucherInput {
        company_id: company,
        fields: fields(PaymentType::Encashment, Some("00130"), dec!(500)),
    };
    let created = env.vouchers().create(&liaison(company), input).await.unwrap();
    assert_eq!(created.status, VoucherStatus::PendingAdmin);

    let approved = env
        .vouchers()
        .set_status(&admin(), created.id, VoucherStatus::Issued, StatusExtra::default())
        .await
        .unwrap();
    assert_eq!(approved.postings.len(), 1);
    assert_eq!(
        approved.postings[0].transaction.category.as_deref(),
        Some(category::ENCASHMENT)
    );
    assert_eq!(env.balance().await, dec!(500));

    // Clearing the check moves no more money.
    let check_id = approved.check.unwrap().id;
    let cleared = env
        .checks()
        .set_status(&admin(), check_id, CheckStatus::Cleared, StatusExtra::default())
        .await
        .unwrap();
    assert!(cleared.changed());
    assert!(cleared.posted.is_none());
    assert_eq!(env.balance().await, dec!(500));
}

#[tokio::test]
async fn test_encashment_without_check_is_reversed_on_void() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let input = CreateVoucherInput {
        company_id: company,
        fields: fields(PaymentType::Encashment, None, dec!(300)),
    };
    let created = env.vouchers().create(&liaison(company), input).await.unwrap();
    let approved = env
        .vouchers()
        .set_status(&admin(), created.id, VoucherStatus::Issued, StatusExtra::default())
        .await
        .unwrap();
    assert!(approved.check.is_none());
    assert_eq!(env.balance().await, dec!(700));

    let voided = env
        .vouchers()
        .set_status(&liaison(company), created.id, VoucherStatus::Voided, void_because("cancelled"))
        .await
        .unwrap();
    assert_eq!(voided.postings.len(), 1);
    assert_eq!(env.balance().await, dec!(1000));
    env.assert_replay_consistent().await;
}

// ============================================================================
// Rejected requests change nothing
// ============================================================================

#[tokio::test]
async fn test_role_gates() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let created = env
        .vouchers()
        .create(&staff(company), check_voucher(company, "00123", dec!(500)))
        .await
        .unwrap();

    let err = env
        .vouchers()
        .set_status(
            &staff(company),
            created.id,
            VoucherStatus::PendingAdmin,
            StatusExtra::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotPermitted { .. }));

    env.vouchers()
        .set_status(
            &liaison(company),
            created.id,
            VoucherStatus::PendingAdmin,
            StatusExtra::default(),
        )
        .await
        .unwrap();
    let err = env
        .vouchers()
        .set_status(&liaison(company), created.id, VoucherStatus::Issued, StatusExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotPermitted { .. }));

    let check_id = check_id_of(&env, created.id).await;
    let err = env
        .checks()
        .set_status(&staff(company), check_id, CheckStatus::Voided, StatusExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotPermitted { .. }));

    let err = env
        .vouchers()
        .set_status(
            &liaison(company + 1),
            created.id,
            VoucherStatus::Rejected,
            StatusExtra::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::CompanyAccessDenied(_)));

    assert_eq!(env.voucher(created.id).await.status, db::VoucherStatus::PendingAdmin);
}

#[tokio::test]
async fn test_void_requires_reason() {
    let env = TestEnv::new().await;
    let voucher_id = issued_check_voucher(&env, "00123", dec!(500)).await;

    let err = env
        .vouchers()
        .set_status(&admin(), voucher_id, VoucherStatus::Voided, void_because("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::VoidReasonRequired));
    assert_eq!(env.voucher(voucher_id).await.status, db::VoucherStatus::Issued);
}

#[tokio::test]
async fn test_rejecting_leaves_pending_check() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    let created = env
        .vouchers()
        .create(&liaison(company), check_voucher(company, "00123", dec!(500)))
        .await
        .unwrap();

    let rejected = env
        .vouchers()
        .set_status(&admin(), created.id, VoucherStatus::Rejected, StatusExtra::default())
        .await
        .unwrap();
    assert_eq!(rejected.voucher.status, db::VoucherStatus::Rejected);
    assert_eq!(rejected.check.unwrap().status, db::CheckStatus::Pending);
    assert_eq!(env.balance().await, dec!(1000));
}

#[tokio::test]
async fn test_duplicate_check_number_rolls_back() {
    let env = TestEnv::new().await;
    let company = env.company_id();
    issued_check_voucher(&env, "00123", dec!(500)).await;

    let second = env
        .vouchers()
        .create(&staff(company), check_voucher(company, "00123", dec!(80)))
        .await
        .unwrap();
    let err = env
        .vouchers()
        .set_status(
            &liaison(company),
            second.id,
            VoucherStatus::PendingAdmin,
            StatusExtra::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateCheckNumber { .. }));

    let details = env.vouchers().get(&admin(), second.id).await.unwrap();
    assert_eq!(details.voucher.status, db::VoucherStatus::PendingLiaison);
    assert!(details.voucher.certified_by.is_none());
    assert!(details.check.is_none());
    assert_eq!(details.history.len(), 1);
}

#[tokio::test]
async fn test_invalid_check_transition() {
    let env = TestEnv::new().await;
    let voucher_id = issued_check_voucher(&env, "00123", dec!(500)).await;
    let check_id = check_id_of(&env, voucher_id).await;

    env.checks()
        .set_status(&admin(), check_id, CheckStatus::Voided, void_because("torn"))
        .await
        .unwrap();
    let err = env
        .checks()
        .set_status(&admin(), check_id, CheckStatus::Cleared, StatusExtra::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidCheckTransition { .. }));
    assert_eq!(env.voucher(voucher_id).await.status, db::VoucherStatus::Voided);
}
