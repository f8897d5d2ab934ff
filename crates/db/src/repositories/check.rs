//! Check repository.
//!
//! Companion checks are created and moved from two places: voucher
//! transitions and direct check status changes. Both go through the
//! connection-generic helpers here so the ledger effect of a check move is
//! computed once, from the voucher's outstanding amount.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vouchledger_core::workflow::{
    CheckLifecycle, CheckStatus, CheckTransition, HistoryEntry, VoucherWorkflow, WorkflowError,
    permissions,
};
use vouchledger_shared::Principal;
use vouchledger_shared::types::CompanyId;

use crate::entities::{checks, sea_orm_active_enums as db, vouchers};
use crate::error::db_err;
use crate::locks::LedgerLocks;
use crate::repositories::history;
use crate::repositories::ledger::{
    PostedTransaction, VoucherPosting, apply_effect, linked_transactions, outstanding_on,
};

/// Optional data carried by a voucher or check status change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusExtra {
    /// Required when voiding.
    pub void_reason: Option<String>,
    /// Name recorded as approver instead of the acting admin.
    pub approved_by: Option<String>,
    /// Locator of a signed approval already uploaded.
    pub approval_attachment: Option<String>,
    /// Who received the check or cash.
    pub received_by: Option<String>,
    /// Clearing date; today when absent.
    pub date_cleared: Option<NaiveDate>,
    /// Free-text note for the history log.
    pub note: Option<String>,
}

impl StatusExtra {
    pub(crate) fn text(value: Option<&String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Result of a check status change.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// The check after the change.
    pub check: checks::Model,
    /// The owning voucher after the change.
    pub voucher: vouchers::Model,
    /// The applied transition; `None` when the check already had the status.
    pub transition: Option<CheckTransition>,
    /// Ledger row written, if any.
    pub posted: Option<PostedTransaction>,
}

impl CheckOutcome {
    /// Returns true when anything was written.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.transition.is_some()
    }

    /// Account balance after the posting, if one was made.
    #[must_use]
    pub fn new_balance(&self) -> Option<Decimal> {
        self.posted.as_ref().map(|p| p.new_balance)
    }
}

/// Repository for checks.
#[derive(Debug, Clone)]
pub struct CheckRepository {
    db: DatabaseConnection,
    locks: LedgerLocks,
}

impl CheckRepository {
    /// Creates a new check repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LedgerLocks) -> Self {
        Self { db, locks }
    }

    /// Gets a check.
    pub async fn get(
        &self,
        principal: &Principal,
        check_id: i64,
    ) -> Result<checks::Model, WorkflowError> {
        let check = find(&self.db, check_id).await?;
        let voucher = find_voucher(&self.db, check.voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;
        Ok(check)
    }

    /// Moves a check to `target`, posting its ledger effect and syncing the
    /// voucher. Re-requesting the current status is a no-op.
    ///
    /// A move the voucher follows needs the same permission as making that
    /// voucher transition directly.
    pub async fn set_status(
        &self,
        principal: &Principal,
        check_id: i64,
        target: CheckStatus,
        extra: StatusExtra,
    ) -> Result<CheckOutcome, WorkflowError> {
        if !permissions::can_change_check(principal.role) {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "change check status",
            ));
        }
        let check = find(&self.db, check_id).await?;
        let voucher = find_voucher(&self.db, check.voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;

        let mut accounts = vec![check.bank_account_id];
        accounts.extend(
            linked_transactions(&self.db, voucher.id)
                .await?
                .iter()
                .map(|row| row.bank_account_id),
        );
        let _guard = self.locks.accounts(accounts).await;

        let txn = self.db.begin().await.map_err(db_err)?;
        let check = find(&txn, check_id).await?;
        let voucher = find_voucher(&txn, check.voucher_id).await?;
        CheckLifecycle::authorize(
            principal.role,
            check.status.into(),
            target,
            voucher.status.into(),
            voucher.payment_type.into(),
        )?;

        let outcome = transition(&txn, check, voucher, target, &extra).await?;
        if let Some(plan) = &outcome.transition {
            history::append(
                &txn,
                outcome.voucher.id,
                &principal.name,
                HistoryEntry::check_status_changed(&outcome.check.check_number, plan.from, plan.to),
            )
            .await?;
        }
        txn.commit().await.map_err(db_err)?;

        if let Some(plan) = &outcome.transition {
            info!(
                check_id,
                voucher_id = outcome.voucher.id,
                from = %plan.from,
                to = %plan.to,
                actor = %principal.name,
                "Check status changed"
            );
        }
        Ok(outcome)
    }
}

pub(crate) async fn find<C: ConnectionTrait>(
    conn: &C,
    check_id: i64,
) -> Result<checks::Model, WorkflowError> {
    checks::Entity::find_by_id(check_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::CheckNotFound(check_id))
}

pub(crate) async fn find_voucher<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
) -> Result<vouchers::Model, WorkflowError> {
    vouchers::Entity::find_by_id(voucher_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(WorkflowError::VoucherNotFound(voucher_id))
}

/// The companion check of a voucher, if one exists.
pub(crate) async fn find_by_voucher<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
) -> Result<Option<checks::Model>, WorkflowError> {
    Ok(checks::Entity::find()
        .filter(checks::Column::VoucherId.eq(voucher_id))
        .one(conn)
        .await
        .map_err(db_err)?)
}

/// Fails with a conflict if `check_number` is taken on the account.
pub(crate) async fn ensure_unique_number<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    check_number: &str,
    except: Option<i64>,
) -> Result<(), WorkflowError> {
    let mut query = checks::Entity::find()
        .filter(checks::Column::BankAccountId.eq(account_id))
        .filter(checks::Column::CheckNumber.eq(check_number));
    if let Some(id) = except {
        query = query.filter(checks::Column::Id.ne(id));
    }
    if query.count(conn).await.map_err(db_err)? > 0 {
        return Err(WorkflowError::DuplicateCheckNumber {
            bank_account_id: account_id,
            check_number: check_number.to_string(),
        });
    }
    Ok(())
}

/// Creates the companion check of `voucher` on `account_id`.
pub(crate) async fn create_companion<C: ConnectionTrait>(
    conn: &C,
    voucher: &vouchers::Model,
    account_id: i64,
    status: CheckStatus,
) -> Result<checks::Model, WorkflowError> {
    let check_number = voucher
        .check_number()
        .ok_or(WorkflowError::MissingField("check_no"))?
        .to_string();
    ensure_unique_number(conn, account_id, &check_number, None).await?;

    let now = Utc::now();
    let date_issued = (status == CheckStatus::Issued)
        .then(|| voucher.check_issued_date.unwrap_or_else(|| now.date_naive()));

    let check = checks::ActiveModel {
        bank_account_id: Set(account_id),
        voucher_id: Set(voucher.id),
        check_number: Set(check_number),
        check_date: Set(voucher.check_date),
        date_issued: Set(date_issued),
        date_cleared: Set(None),
        payee: Set(voucher.payee.clone()),
        description: Set(voucher.description.clone()),
        amount: Set(voucher.amount),
        status: Set(status.into()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    info!(
        check_id = check.id,
        voucher_id = voucher.id,
        account_id,
        check_number = %check.check_number,
        status = %status,
        "Companion check created"
    );
    Ok(check)
}

/// Flips a pending companion check to `Issued` on voucher approval.
pub(crate) async fn issue<C: ConnectionTrait>(
    conn: &C,
    check: checks::Model,
    voucher: &vouchers::Model,
) -> Result<checks::Model, WorkflowError> {
    if CheckLifecycle::issue(check.status.into())?.is_none() {
        return Ok(check);
    }
    let now = Utc::now();
    let mut active: checks::ActiveModel = check.into();
    active.status = Set(db::CheckStatus::Issued);
    active.date_issued = Set(Some(
        voucher.check_issued_date.unwrap_or_else(|| now.date_naive()),
    ));
    active.updated_at = Set(now);
    Ok(active.update(conn).await.map_err(db_err)?)
}

/// Moves a check and carries out the ledger effect and voucher sync.
///
/// Does not write history; callers record one row per operation.
pub(crate) async fn transition<C: ConnectionTrait>(
    conn: &C,
    check: checks::Model,
    voucher: vouchers::Model,
    target: CheckStatus,
    extra: &StatusExtra,
) -> Result<CheckOutcome, WorkflowError> {
    let linked = linked_transactions(conn, voucher.id).await?;
    let outstanding = outstanding_on(&linked, check.bank_account_id);

    let Some(plan) = CheckLifecycle::plan(check.status.into(), target, check.amount, outstanding)?
    else {
        return Ok(CheckOutcome {
            check,
            voucher,
            transition: None,
            posted: None,
        });
    };

    let today = Utc::now().date_naive();
    let cleared_on = extra.date_cleared.unwrap_or(today);
    let posting = VoucherPosting {
        account_id: check.bank_account_id,
        voucher_id: voucher.id,
        check_no: Some(check.check_number.clone()),
        date: if plan.stamps_date_cleared { cleared_on } else { today },
        description: format!("Check {} - {}", check.check_number, check.payee),
    };

    let mut active: checks::ActiveModel = check.into();
    active.status = Set(plan.to.into());
    if plan.stamps_date_cleared {
        active.date_cleared = Set(Some(cleared_on));
    }
    active.updated_at = Set(Utc::now());
    let check = active.update(conn).await.map_err(db_err)?;

    let posted = apply_effect(conn, &plan.effect, &posting).await?;
    let voucher = sync_voucher(conn, voucher, &plan, extra).await?;

    Ok(CheckOutcome {
        check,
        voucher,
        transition: Some(plan),
        posted,
    })
}

/// Moves the voucher along with its check.
async fn sync_voucher<C: ConnectionTrait>(
    conn: &C,
    voucher: vouchers::Model,
    plan: &CheckTransition,
    extra: &StatusExtra,
) -> Result<vouchers::Model, WorkflowError> {
    let Some(status) = plan.voucher_status else {
        return Ok(voucher);
    };
    let received_by = StatusExtra::text(extra.received_by.as_ref());
    let void_reason = StatusExtra::text(extra.void_reason.as_ref());
    let current = voucher.status;
    let target: db::VoucherStatus = status.into();

    if current == target && received_by.is_none() {
        return Ok(voucher);
    }
    if current != target && current.is_terminal() {
        warn!(
            voucher_id = voucher.id,
            status = ?current,
            "Voucher is closed; check moved without it"
        );
        return Ok(voucher);
    }

    let mut active: vouchers::ActiveModel = voucher.into();
    active.status = Set(target);
    if let Some(name) = received_by {
        active.received_by = Set(Some(name));
    }
    if let Some(reason) = void_reason.filter(|_| target == db::VoucherStatus::Voided) {
        active.void_reason = Set(Some(reason));
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await.map_err(db_err)?)
}
