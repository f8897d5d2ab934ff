//! Reconciliation sweep.
//!
//! Recreates derived rows that a partial failure left missing. Each row is
//! repaired in its own transaction under the same account lock the lifecycle
//! operations use, and re-checked once the lock is held, so running the sweep
//! twice repairs nothing the second time.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, warn};
use vouchledger_core::ledger::{LedgerError, category};
use vouchledger_core::reconciliation::{
    SweepReport, SweepStep, needs_clearing_withdrawal, needs_companion_check,
    needs_encashment_withdrawal,
};
use vouchledger_core::workflow::{CheckLifecycle, CheckStatus, WorkflowError};
use vouchledger_shared::{Principal, Role};

use crate::entities::{bank_transactions, checks, sea_orm_active_enums as db, vouchers};
use crate::error::db_err;
use crate::locks::LedgerLocks;
use crate::repositories::check::{create_companion, find, find_by_voucher, find_voucher};
use crate::repositories::checkbook;
use crate::repositories::ledger::{
    VoucherPosting, apply_effect, has_check_transaction, linked_transactions, recalculate,
    resolve_account,
};

/// Runs the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    db: DatabaseConnection,
    locks: LedgerLocks,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LedgerLocks) -> Self {
        Self { db, locks }
    }

    /// Runs the sweep on behalf of an administrator.
    pub async fn sweep_as(&self, principal: &Principal) -> Result<SweepReport, WorkflowError> {
        if principal.role != Role::Admin {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "run the reconciliation sweep",
            ));
        }
        Ok(self.sweep().await?)
    }

    /// Runs all three passes.
    ///
    /// Only failures to list candidates abort the run; a row that cannot be
    /// repaired is logged and reported.
    pub async fn sweep(&self) -> Result<SweepReport, LedgerError> {
        let mut report = SweepReport::default();

        for voucher_id in self.candidates(db::PaymentType::Check).await? {
            let outcome = self.repair_missing_check(voucher_id).await;
            tally(&mut report, SweepStep::MissingChecks, voucher_id, outcome);
        }
        for voucher_id in self.candidates(db::PaymentType::Encashment).await? {
            let outcome = self.repair_missing_encashment(voucher_id).await;
            tally(&mut report, SweepStep::MissingEncashments, voucher_id, outcome);
        }

        let cleared: Vec<i64> = checks::Entity::find()
            .filter(checks::Column::Status.eq(db::CheckStatus::Cleared))
            .order_by_asc(checks::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|c| c.id)
            .collect();
        for check_id in cleared {
            let outcome = self.repair_missing_withdrawal(check_id).await;
            tally(&mut report, SweepStep::MissingClearingWithdrawals, check_id, outcome);
        }

        info!(
            repaired = report.repaired_count(),
            checks_created = report.checks_created,
            encashments_applied = report.encashments_applied,
            withdrawals_restored = report.withdrawals_restored,
            failures = report.failures.len(),
            "Reconciliation sweep finished"
        );
        Ok(report)
    }

    /// Issued vouchers of `payment_type` that name a bank.
    async fn candidates(&self, payment_type: db::PaymentType) -> Result<Vec<i64>, LedgerError> {
        Ok(vouchers::Entity::find()
            .filter(vouchers::Column::Status.eq(db::VoucherStatus::Issued))
            .filter(vouchers::Column::PaymentType.eq(payment_type))
            .filter(vouchers::Column::BankName.is_not_null())
            .order_by_asc(vouchers::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|v| v.id)
            .collect())
    }

    async fn repair_missing_check(&self, voucher_id: i64) -> Result<bool, WorkflowError> {
        let voucher = find_voucher(&self.db, voucher_id).await?;
        let has_check = find_by_voucher(&self.db, voucher_id).await?.is_some();
        if !needs_companion_check(
            voucher.status.into(),
            voucher.payment_type.into(),
            voucher.check_number(),
            voucher.bank(),
            has_check,
        ) {
            return Ok(false);
        }
        let account = resolve_bank(&self.db, &voucher).await?;

        let _guard = self.locks.accounts([account]).await;
        let txn = self.db.begin().await.map_err(db_err)?;
        let voucher = find_voucher(&txn, voucher_id).await?;
        let has_check = find_by_voucher(&txn, voucher_id).await?.is_some();
        if !needs_companion_check(
            voucher.status.into(),
            voucher.payment_type.into(),
            voucher.check_number(),
            voucher.bank(),
            has_check,
        ) {
            return Ok(false);
        }

        let check = create_companion(&txn, &voucher, account, CheckStatus::Issued).await?;
        txn.commit().await.map_err(db_err)?;
        checkbook::advance_after_commit(&self.db, voucher_id, account, &check.check_number).await;

        warn!(
            voucher_id,
            check_id = check.id,
            account_id = account,
            "Integrity drift: recreated missing companion check"
        );
        Ok(true)
    }

    async fn repair_missing_encashment(&self, voucher_id: i64) -> Result<bool, WorkflowError> {
        let voucher = find_voucher(&self.db, voucher_id).await?;
        let linked = linked_transactions(&self.db, voucher_id).await?;
        if !needs_encashment_withdrawal(
            voucher.status.into(),
            voucher.payment_type.into(),
            voucher.bank(),
            !linked.is_empty(),
        ) {
            return Ok(false);
        }
        let account = resolve_bank(&self.db, &voucher).await?;

        let _guard = self.locks.accounts([account]).await;
        let txn = self.db.begin().await.map_err(db_err)?;
        let voucher = find_voucher(&txn, voucher_id).await?;
        let linked = linked_transactions(&txn, voucher_id).await?;
        if !needs_encashment_withdrawal(
            voucher.status.into(),
            voucher.payment_type.into(),
            voucher.bank(),
            !linked.is_empty(),
        ) {
            return Ok(false);
        }

        let effect = CheckLifecycle::encashment_withdrawal(
            voucher.payment_type.into(),
            voucher.amount,
            Decimal::ZERO,
        );
        let target = VoucherPosting {
            account_id: account,
            voucher_id,
            check_no: voucher.check_number().map(str::to_string),
            date: Utc::now().date_naive(),
            description: format!("{} - {}", voucher.voucher_no, voucher.payee),
        };
        let posted = apply_effect(&txn, &effect, &target).await?;
        txn.commit().await.map_err(db_err)?;

        warn!(
            voucher_id,
            account_id = account,
            transaction_id = posted.as_ref().map(|p| p.transaction.id),
            "Integrity drift: applied missing encashment withdrawal"
        );
        Ok(posted.is_some())
    }

    async fn repair_missing_withdrawal(&self, check_id: i64) -> Result<bool, WorkflowError> {
        let check = find(&self.db, check_id).await?;
        let account = check.bank_account_id;

        let _guard = self.locks.accounts([account]).await;
        let txn = self.db.begin().await.map_err(db_err)?;
        let check = find(&txn, check_id).await?;
        let voucher = find_voucher(&txn, check.voucher_id).await?;
        let has_withdrawal = has_check_transaction(
            &txn,
            account,
            &check.check_number,
            db::BankTransactionType::Withdrawal,
        )
        .await?;
        if !needs_clearing_withdrawal(
            check.status.into(),
            voucher.payment_type.into(),
            has_withdrawal,
        ) {
            return Ok(false);
        }

        // Inserted as history, then the log is replayed; the running balance
        // is rewritten by the replay.
        let row = bank_transactions::ActiveModel {
            bank_account_id: Set(account),
            voucher_id: Set(Some(voucher.id)),
            transaction_type: Set(db::BankTransactionType::Withdrawal),
            category: Set(Some(category::CHECK_CLEARED.to_string())),
            amount: Set(check.amount),
            description: Set(Some(format!("Check {} - {}", check.check_number, check.payee))),
            check_no: Set(Some(check.check_number.clone())),
            transaction_date: Set(check
                .date_cleared
                .unwrap_or_else(|| Utc::now().date_naive())),
            running_balance: Set(Decimal::ZERO),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        let balance = recalculate(&txn, account).await?;
        txn.commit().await.map_err(db_err)?;

        warn!(
            check_id,
            account_id = account,
            transaction_id = row.id,
            balance = %balance,
            "Integrity drift: restored missing clearing withdrawal"
        );
        Ok(true)
    }
}

async fn resolve_bank<C: ConnectionTrait>(
    conn: &C,
    voucher: &vouchers::Model,
) -> Result<i64, WorkflowError> {
    let name = voucher.bank().unwrap_or_default();
    resolve_account(conn, voucher.company_id, name)
        .await?
        .map(|account| account.id)
        .ok_or_else(|| WorkflowError::Validation(format!("no bank account named '{name}'")))
}

fn tally(
    report: &mut SweepReport,
    step: SweepStep,
    id: i64,
    outcome: Result<bool, WorkflowError>,
) {
    match outcome {
        Ok(true) => report.record_repair(step),
        Ok(false) => {}
        Err(err) => {
            error!(step = step.as_str(), id, error = %err, "Reconciliation repair failed");
            report.record_failure(step, id, err.to_string());
        }
    }
}
