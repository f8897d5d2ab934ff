//! Voucher repository.
//!
//! Executes the voucher lifecycle planned by
//! [`VoucherWorkflow`](vouchledger_core::workflow::VoucherWorkflow): every
//! operation takes its locks, opens one database transaction, writes the
//! voucher, runs the planned side effects in order and appends one history
//! row before committing. Only the checkbook frontier moves after the commit.

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};
use vouchledger_core::ledger::LedgerError;
use vouchledger_core::storage::{AttachmentKind, BlobStore, attachment_key};
use vouchledger_core::workflow::numbering::{
    format_voucher_no, next_sequence, renumber_plan, temporary_number,
};
use vouchledger_core::workflow::{
    CheckLifecycle, CheckUpdate, HistoryEntry, Stamp, VoucherEffect, VoucherFacts, VoucherFields,
    VoucherPatch, VoucherStatus, VoucherWorkflow, WorkflowError, authorize_edit,
};
use vouchledger_shared::types::{CompanyId, UserId};
use vouchledger_shared::{Principal, Role};

use crate::entities::{
    bank_transactions, checks, companies, sea_orm_active_enums as db, voucher_history, vouchers,
};
use crate::error::db_err;
use crate::locks::LedgerLocks;
use crate::repositories::check::{self, StatusExtra};
use crate::repositories::ledger::{
    self, PostedTransaction, VoucherPosting, apply_effect, linked_transactions, outstanding_on,
    resolve_account,
};
use crate::repositories::{checkbook, history};

/// Input for creating a voucher.
#[derive(Debug, Clone)]
pub struct CreateVoucherInput {
    /// Owning company.
    pub company_id: i64,
    /// Voucher fields.
    pub fields: VoucherFields,
}

/// A freshly created voucher.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedVoucher {
    /// Voucher id.
    pub id: i64,
    /// Assigned number.
    pub voucher_no: String,
    /// Initial status.
    pub status: VoucherStatus,
}

/// Result of a field edit.
#[derive(Debug, Clone, Serialize)]
pub struct VoucherUpdate {
    /// False when no field differed and nothing was written.
    pub changed: bool,
    /// The voucher after the edit.
    pub voucher: vouchers::Model,
}

/// Result of a voucher status change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    /// Status before.
    pub from: VoucherStatus,
    /// Status after.
    pub to: VoucherStatus,
    /// The voucher after the change.
    pub voucher: vouchers::Model,
    /// The companion check after the change.
    pub check: Option<checks::Model>,
    /// Ledger rows written.
    pub postings: Vec<PostedTransaction>,
}

/// A voucher with its check and history.
#[derive(Debug, Clone, Serialize)]
pub struct VoucherDetails {
    /// The voucher.
    pub voucher: vouchers::Model,
    /// Its companion check.
    pub check: Option<checks::Model>,
    /// Transactions posted on its behalf.
    pub transactions: Vec<bank_transactions::Model>,
    /// History, oldest first.
    pub history: Vec<voucher_history::Model>,
}

/// What a force delete removed.
#[derive(Debug, Clone, Serialize)]
pub struct ForceDeleteReport {
    /// Deleted voucher id.
    pub voucher_id: i64,
    /// Deleted voucher number.
    pub voucher_no: String,
    /// Whether a companion check was removed.
    pub check_removed: bool,
    /// Number of bank transactions removed.
    pub transactions_removed: u64,
    /// Accounts replayed afterwards, with their new balances.
    pub balances: Vec<(i64, Decimal)>,
}

/// Result of an attachment upload.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentOutcome {
    /// False when the blob store failed; the voucher is then unchanged.
    pub stored: bool,
    /// Locator stamped on the voucher.
    pub locator: Option<String>,
}

/// Repository for vouchers.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    db: DatabaseConnection,
    locks: LedgerLocks,
}

impl VoucherRepository {
    /// Creates a new voucher repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LedgerLocks) -> Self {
        Self { db, locks }
    }

    /// Creates a voucher in the creator's initial status.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateVoucherInput,
    ) -> Result<CreatedVoucher, WorkflowError> {
        let company_id = input.company_id;
        VoucherWorkflow::authorize_company(principal, CompanyId(company_id))?;
        let fields = normalize(input.fields);
        fields.validate()?;

        let company = companies::Entity::find_by_id(company_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::CompanyNotFound(company_id))?;

        let status = VoucherWorkflow::initial_status(principal.role, fields.payment_type);
        let mut accounts = Vec::new();
        if let Some(name) = fields.bank_name.as_deref() {
            accounts.extend(resolve_account(&self.db, company_id, name).await?.map(|a| a.id));
        }
        let _guard = self.locks.company_and_accounts(company_id, accounts).await;

        let txn = self.db.begin().await.map_err(db_err)?;
        let voucher_no = next_voucher_no(&txn, &company).await?;
        let stamp_name = Some(principal.name.clone());
        let (certified_by, approved_by) = match VoucherWorkflow::creation_stamp(principal.role) {
            Stamp::CertifiedBy => (stamp_name, None),
            Stamp::ApprovedBy => (None, stamp_name),
            Stamp::None => (None, None),
        };

        let now = Utc::now();
        let voucher = vouchers::ActiveModel {
            company_id: Set(company_id),
            voucher_no: Set(voucher_no.clone()),
            date: Set(fields.date),
            payee: Set(fields.payee),
            description: Set(fields.description),
            amount: Set(fields.amount),
            payment_type: Set(fields.payment_type.into()),
            check_no: Set(fields.check_no),
            bank_name: Set(fields.bank_name),
            category: Set(fields.category),
            status: Set(status.into()),
            created_by: Set(principal.id.into_inner()),
            urgency: Set(fields.urgency),
            deadline_date: Set(fields.deadline_date),
            is_pdc: Set(fields.is_pdc),
            check_date: Set(fields.check_date),
            check_issued_date: Set(fields.check_issued_date),
            attachment: Set(None),
            void_reason: Set(None),
            certified_by: Set(certified_by),
            approved_by: Set(approved_by),
            received_by: Set(None),
            approval_attachment: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|err| match db_err(err) {
            LedgerError::Conflict(_) => WorkflowError::DuplicateVoucherNumber(voucher_no.clone()),
            other => other.into(),
        })?;

        let effects = VoucherWorkflow::entry_effects(&facts(&voucher, None), status)?;
        let effects = run_effects(&txn, &voucher, &effects, &StatusExtra::default()).await?;
        history::append(
            &txn,
            voucher.id,
            &principal.name,
            HistoryEntry::created(&voucher_no, status),
        )
        .await?;
        txn.commit().await.map_err(db_err)?;
        effects.advance_checkbook(&self.db).await;

        info!(
            voucher_id = voucher.id,
            voucher_no = %voucher_no,
            company_id,
            status = %status,
            check_created = effects.check.is_some(),
            actor = %principal.name,
            "Voucher created"
        );
        Ok(CreatedVoucher {
            id: voucher.id,
            voucher_no,
            status,
        })
    }

    /// Gets a voucher with its check, transactions and history.
    pub async fn get(
        &self,
        principal: &Principal,
        voucher_id: i64,
    ) -> Result<VoucherDetails, WorkflowError> {
        let voucher = check::find_voucher(&self.db, voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;
        Ok(VoucherDetails {
            check: check::find_by_voucher(&self.db, voucher_id).await?,
            transactions: linked_transactions(&self.db, voucher_id).await?,
            history: history::list(&self.db, voucher_id).await?,
            voucher,
        })
    }

    /// Applies a field edit. Writes nothing when no field differs.
    pub async fn update(
        &self,
        principal: &Principal,
        voucher_id: i64,
        patch: VoucherPatch,
    ) -> Result<VoucherUpdate, WorkflowError> {
        let voucher = check::find_voucher(&self.db, voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;
        authorize_edit(principal, UserId(voucher.created_by), voucher.status.into(), &patch)?;
        if patch.apply(&voucher.fields())?.is_empty() {
            return Ok(VoucherUpdate {
                changed: false,
                voucher,
            });
        }

        let _guard = self
            .locks
            .accounts(involved_accounts(&self.db, &voucher).await?)
            .await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let voucher = check::find_voucher(&txn, voucher_id).await?;
        authorize_edit(principal, UserId(voucher.created_by), voucher.status.into(), &patch)?;
        let changes = patch.apply(&voucher.fields())?;
        if changes.is_empty() {
            return Ok(VoucherUpdate {
                changed: false,
                voucher,
            });
        }

        let fields = changes.updated.clone();
        let mut active: vouchers::ActiveModel = voucher.into();
        active.date = Set(fields.date);
        active.payee = Set(fields.payee);
        active.description = Set(fields.description);
        active.amount = Set(fields.amount);
        active.payment_type = Set(fields.payment_type.into());
        active.check_no = Set(fields.check_no);
        active.bank_name = Set(fields.bank_name);
        active.category = Set(fields.category);
        active.urgency = Set(fields.urgency);
        active.deadline_date = Set(fields.deadline_date);
        active.is_pdc = Set(fields.is_pdc);
        active.check_date = Set(fields.check_date);
        active.check_issued_date = Set(fields.check_issued_date);
        active.updated_at = Set(Utc::now());
        let voucher = active.update(&txn).await.map_err(db_err)?;

        let update = changes.check_update();
        match check::find_by_voucher(&txn, voucher_id).await? {
            Some(check) => propagate_to_check(&txn, check, &update).await?,
            None => {
                if let Some(amount) = update.amount {
                    resize_outstanding(&txn, voucher_id, amount).await?;
                }
            }
        }

        history::append(
            &txn,
            voucher_id,
            &principal.name,
            HistoryEntry::updated(changes.summary()),
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            voucher_id,
            fields = changes.changes.len(),
            actor = %principal.name,
            "Voucher updated"
        );
        Ok(VoucherUpdate {
            changed: true,
            voucher,
        })
    }

    /// Moves a voucher to `requested` and runs the planned side effects.
    pub async fn set_status(
        &self,
        principal: &Principal,
        voucher_id: i64,
        requested: VoucherStatus,
        extra: StatusExtra,
    ) -> Result<StatusChange, WorkflowError> {
        let voucher = check::find_voucher(&self.db, voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;

        let _guard = self
            .locks
            .accounts(involved_accounts(&self.db, &voucher).await?)
            .await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let voucher = check::find_voucher(&txn, voucher_id).await?;
        let companion = check::find_by_voucher(&txn, voucher_id).await?;
        let plan = VoucherWorkflow::plan(
            principal.role,
            &facts(&voucher, companion.as_ref()),
            requested,
            extra.void_reason.as_deref(),
        )?;

        let mut active: vouchers::ActiveModel = voucher.into();
        active.status = Set(plan.to.into());
        match plan.stamp {
            Stamp::CertifiedBy => active.certified_by = Set(Some(principal.name.clone())),
            Stamp::ApprovedBy => {
                let name = StatusExtra::text(extra.approved_by.as_ref())
                    .unwrap_or_else(|| principal.name.clone());
                active.approved_by = Set(Some(name));
                if let Some(locator) = StatusExtra::text(extra.approval_attachment.as_ref()) {
                    active.approval_attachment = Set(Some(locator));
                }
            }
            Stamp::None => {}
        }
        let void_reason = StatusExtra::text(extra.void_reason.as_ref());
        if plan.to == VoucherStatus::Voided {
            active.void_reason = Set(void_reason.clone());
        }
        let received_by = StatusExtra::text(extra.received_by.as_ref())
            .filter(|_| matches!(plan.to, VoucherStatus::Claimed | VoucherStatus::Cleared));
        if received_by.is_some() {
            active.received_by = Set(received_by);
        }
        active.updated_at = Set(Utc::now());
        let voucher = active.update(&txn).await.map_err(db_err)?;

        let outcome = run_effects(&txn, &voucher, &plan.effects, &extra).await?;
        let note = void_reason.or_else(|| StatusExtra::text(extra.note.as_ref()));
        history::append(
            &txn,
            voucher_id,
            &principal.name,
            HistoryEntry::status_changed(plan.from, plan.to, note.as_deref()),
        )
        .await?;
        txn.commit().await.map_err(db_err)?;
        outcome.advance_checkbook(&self.db).await;

        info!(
            voucher_id,
            from = %plan.from,
            to = %plan.to,
            postings = outcome.postings.len(),
            actor = %principal.name,
            "Voucher status changed"
        );
        Ok(StatusChange {
            from: plan.from,
            to: plan.to,
            voucher: outcome.voucher,
            check: outcome.check,
            postings: outcome.postings,
        })
    }

    /// Removes a voucher with its check and bank transactions. Admin only.
    pub async fn force_delete(
        &self,
        principal: &Principal,
        voucher_id: i64,
    ) -> Result<ForceDeleteReport, WorkflowError> {
        if principal.role != Role::Admin {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "force delete vouchers",
            ));
        }
        let voucher = check::find_voucher(&self.db, voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;

        let _guard = self
            .locks
            .accounts(involved_accounts(&self.db, &voucher).await?)
            .await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let voucher = check::find_voucher(&txn, voucher_id).await?;
        let linked = linked_transactions(&txn, voucher_id).await?;
        let touched: BTreeSet<i64> = linked.iter().map(|row| row.bank_account_id).collect();

        let removed = bank_transactions::Entity::delete_many()
            .filter(bank_transactions::Column::VoucherId.eq(voucher_id))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;
        let check_removed = checks::Entity::delete_many()
            .filter(checks::Column::VoucherId.eq(voucher_id))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected
            > 0;

        history::append(
            &txn,
            voucher_id,
            &principal.name,
            HistoryEntry::force_deleted(&voucher.voucher_no, removed),
        )
        .await?;
        vouchers::Entity::delete_by_id(voucher_id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let mut balances = Vec::with_capacity(touched.len());
        for account_id in touched {
            balances.push((account_id, ledger::recalculate(&txn, account_id).await?));
        }
        txn.commit().await.map_err(db_err)?;

        warn!(
            voucher_id,
            voucher_no = %voucher.voucher_no,
            transactions_removed = removed,
            check_removed,
            actor = %principal.name,
            "Voucher force deleted"
        );
        Ok(ForceDeleteReport {
            voucher_id,
            voucher_no: voucher.voucher_no,
            check_removed,
            transactions_removed: removed,
            balances,
        })
    }

    /// Stores a file and stamps its locator on the voucher.
    ///
    /// A storage failure is logged and reported with `stored = false`; the
    /// voucher is left unchanged and the call still succeeds.
    #[allow(clippy::too_many_arguments)]
    pub async fn attach_file(
        &self,
        principal: &Principal,
        voucher_id: i64,
        kind: AttachmentKind,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
        store: &dyn BlobStore,
    ) -> Result<AttachmentOutcome, WorkflowError> {
        let voucher = check::find_voucher(&self.db, voucher_id).await?;
        VoucherWorkflow::authorize_company(principal, CompanyId(voucher.company_id))?;
        if principal.role.is_preparer() && voucher.created_by != principal.id.into_inner() {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "attach files to vouchers created by someone else",
            ));
        }
        if kind == AttachmentKind::Approval && principal.role != Role::Admin {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "attach approval documents",
            ));
        }

        let key = attachment_key(voucher_id, kind, filename);
        let locator = match store.store(&key, bytes, content_type).await {
            Ok(locator) => locator,
            Err(err) => {
                warn!(voucher_id, key = %key, error = %err, "Attachment storage failed");
                return Ok(AttachmentOutcome {
                    stored: false,
                    locator: None,
                });
            }
        };

        let txn = self.db.begin().await.map_err(db_err)?;
        let voucher = check::find_voucher(&txn, voucher_id).await?;
        let mut active: vouchers::ActiveModel = voucher.into();
        match kind {
            AttachmentKind::Supporting => active.attachment = Set(Some(locator.clone())),
            AttachmentKind::Approval => active.approval_attachment = Set(Some(locator.clone())),
        }
        active.updated_at = Set(Utc::now());
        active.update(&txn).await.map_err(db_err)?;
        history::append(
            &txn,
            voucher_id,
            &principal.name,
            HistoryEntry::attachment_added(kind, filename),
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(voucher_id, kind = kind.as_str(), locator = %locator, "Attachment stored");
        Ok(AttachmentOutcome {
            stored: true,
            locator: Some(locator),
        })
    }

    /// Rewrites a company's voucher numbers sequentially by ascending id.
    ///
    /// Returns the number of vouchers whose number changed. Admin only.
    pub async fn renumber(
        &self,
        principal: &Principal,
        company_id: i64,
    ) -> Result<usize, WorkflowError> {
        if principal.role != Role::Admin {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "renumber vouchers",
            ));
        }
        VoucherWorkflow::authorize_company(principal, CompanyId(company_id))?;
        let company = companies::Entity::find_by_id(company_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::CompanyNotFound(company_id))?;

        let _guard = self.locks.company(company_id).await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let current: Vec<(i64, String)> = vouchers::Entity::find()
            .filter(vouchers::Column::CompanyId.eq(company_id))
            .order_by_asc(vouchers::Column::Id)
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|v| (v.id, v.voucher_no))
            .collect();
        let plan = renumber_plan(&company.prefix, &current);

        // Park every moving voucher first so no new number collides with an
        // old one still in place.
        for (id, _) in &plan {
            set_voucher_no(&txn, *id, temporary_number(*id)).await?;
        }
        for (id, number) in &plan {
            set_voucher_no(&txn, *id, number.clone()).await?;
            let old = current
                .iter()
                .find(|(voucher_id, _)| voucher_id == id)
                .map_or("", |(_, no)| no.as_str());
            history::append(&txn, *id, &principal.name, HistoryEntry::renumbered(old, number))
                .await?;
        }
        txn.commit().await.map_err(db_err)?;

        info!(company_id, renumbered = plan.len(), "Vouchers renumbered");
        Ok(plan.len())
    }
}

/// Trims text fields and drops blank optional ones.
fn normalize(mut fields: VoucherFields) -> VoucherFields {
    fn blank_to_none(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
    fields.payee = fields.payee.trim().to_string();
    fields.description = blank_to_none(fields.description);
    fields.check_no = blank_to_none(fields.check_no);
    fields.bank_name = blank_to_none(fields.bank_name);
    fields.category = blank_to_none(fields.category);
    fields.urgency = blank_to_none(fields.urgency);
    fields
}

fn facts(voucher: &vouchers::Model, companion: Option<&checks::Model>) -> VoucherFacts {
    VoucherFacts {
        id: voucher.id,
        status: voucher.status.into(),
        payment_type: voucher.payment_type.into(),
        has_check_number: voucher.check_number().is_some(),
        has_bank_name: voucher.bank().is_some(),
        check_status: companion.map(|c| c.status.into()),
    }
}

/// Accounts a voucher operation may post to: the companion check's, the one
/// its bank name resolves to and every account it already has rows on.
pub(crate) async fn involved_accounts<C: ConnectionTrait>(
    conn: &C,
    voucher: &vouchers::Model,
) -> Result<Vec<i64>, WorkflowError> {
    let mut ids = Vec::new();
    if let Some(companion) = check::find_by_voucher(conn, voucher.id).await? {
        ids.push(companion.bank_account_id);
    }
    if let Some(name) = voucher.bank() {
        ids.extend(resolve_account(conn, voucher.company_id, name).await?.map(|a| a.id));
    }
    ids.extend(
        linked_transactions(conn, voucher.id)
            .await?
            .iter()
            .map(|row| row.bank_account_id),
    );
    Ok(ids)
}

/// Lowest free number at or above `count + 1`.
async fn next_voucher_no<C: ConnectionTrait>(
    conn: &C,
    company: &companies::Model,
) -> Result<String, WorkflowError> {
    let count = vouchers::Entity::find()
        .filter(vouchers::Column::CompanyId.eq(company.id))
        .count(conn)
        .await
        .map_err(db_err)?;

    let mut sequence = next_sequence(count);
    loop {
        let candidate = format_voucher_no(&company.prefix, sequence);
        let taken = vouchers::Entity::find()
            .filter(vouchers::Column::CompanyId.eq(company.id))
            .filter(vouchers::Column::VoucherNo.eq(candidate.as_str()))
            .count(conn)
            .await
            .map_err(db_err)?;
        if taken == 0 {
            return Ok(candidate);
        }
        sequence = sequence
            .checked_add(1)
            .ok_or_else(|| WorkflowError::DuplicateVoucherNumber(candidate.clone()))?;
    }
}

async fn set_voucher_no<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
    voucher_no: String,
) -> Result<(), WorkflowError> {
    vouchers::ActiveModel {
        id: Set(voucher_id),
        voucher_no: Set(voucher_no),
        ..Default::default()
    }
    .update(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Carries field edits over to a companion check that is still open.
async fn propagate_to_check<C: ConnectionTrait>(
    conn: &C,
    companion: checks::Model,
    update: &CheckUpdate,
) -> Result<(), WorkflowError> {
    if update.is_empty() || companion.status.is_terminal() {
        return Ok(());
    }
    if let Some(number) = &update.check_number {
        check::ensure_unique_number(conn, companion.bank_account_id, number, Some(companion.id))
            .await?;
    }

    let account_id = companion.bank_account_id;
    let voucher_id = companion.voucher_id;
    let old_number = companion.check_number.clone();

    let mut active: checks::ActiveModel = companion.into();
    if let Some(amount) = update.amount {
        active.amount = Set(amount);
    }
    if let Some(payee) = &update.payee {
        active.payee = Set(payee.clone());
    }
    if let Some(description) = &update.description {
        active.description = Set(description.clone());
    }
    if let Some(check_date) = update.check_date {
        active.check_date = Set(check_date);
    }
    if let Some(number) = &update.check_number {
        active.check_number = Set(number.clone());
    }
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(db_err)?;

    if update.check_number.is_none() && update.amount.is_none() {
        return Ok(());
    }

    // Keep the withdrawal that paid the check in step with it. That is the
    // clearing row for a check payment and the issue-time row for an
    // encashment.
    let rows = bank_transactions::Entity::find()
        .filter(bank_transactions::Column::VoucherId.eq(voucher_id))
        .filter(bank_transactions::Column::BankAccountId.eq(account_id))
        .all(conn)
        .await
        .map_err(db_err)?;
    let mut amount_changed = false;
    for row in rows {
        let renumber = update
            .check_number
            .as_ref()
            .filter(|_| row.check_no.as_deref() == Some(old_number.as_str()));
        let resize = update.amount.filter(|amount| {
            row.transaction_type == db::BankTransactionType::Withdrawal && row.amount != *amount
        });
        if renumber.is_none() && resize.is_none() {
            continue;
        }
        let mut active: bank_transactions::ActiveModel = row.into();
        if let Some(number) = renumber {
            active.check_no = Set(Some(number.clone()));
        }
        if let Some(amount) = resize {
            active.amount = Set(amount);
            amount_changed = true;
        }
        active.update(conn).await.map_err(db_err)?;
    }
    if amount_changed {
        ledger::recalculate(conn, account_id).await?;
    }
    Ok(())
}

/// Resizes the still-outstanding withdrawal of a voucher paid without a
/// companion check. Reversed withdrawals are left alone.
async fn resize_outstanding<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
    amount: Decimal,
) -> Result<(), WorkflowError> {
    let linked = linked_transactions(conn, voucher_id).await?;
    let accounts: BTreeSet<i64> = linked.iter().map(|row| row.bank_account_id).collect();
    for account_id in accounts {
        if outstanding_on(&linked, account_id) <= Decimal::ZERO {
            continue;
        }
        let stale: Vec<_> = linked
            .iter()
            .filter(|row| {
                row.bank_account_id == account_id
                    && row.transaction_type == db::BankTransactionType::Withdrawal
                    && row.amount != amount
            })
            .cloned()
            .collect();
        if stale.is_empty() {
            continue;
        }
        for row in stale {
            let mut active: bank_transactions::ActiveModel = row.into();
            active.amount = Set(amount);
            active.update(conn).await.map_err(db_err)?;
        }
        ledger::recalculate(conn, account_id).await?;
    }
    Ok(())
}

/// What running a voucher's side effects produced.
struct EffectOutcome {
    voucher: vouchers::Model,
    check: Option<checks::Model>,
    postings: Vec<PostedTransaction>,
    /// Checkbook to advance once committed: account id and check number.
    advance: Option<(i64, String)>,
}

impl EffectOutcome {
    async fn advance_checkbook<C: ConnectionTrait>(&self, conn: &C) {
        if let Some((account_id, number)) = &self.advance {
            checkbook::advance_after_commit(conn, self.voucher.id, *account_id, number).await;
        }
    }
}

/// Runs planned side effects in order against the already-updated voucher.
async fn run_effects<C: ConnectionTrait>(
    conn: &C,
    voucher: &vouchers::Model,
    effects: &[VoucherEffect],
    extra: &StatusExtra,
) -> Result<EffectOutcome, WorkflowError> {
    let account = match voucher.bank() {
        Some(name) => resolve_account(conn, voucher.company_id, name).await?,
        None => None,
    };
    let mut companion = check::find_by_voucher(conn, voucher.id).await?;
    let mut current = voucher.clone();
    let mut postings = Vec::new();
    let mut advance = None;

    for effect in effects {
        match *effect {
            VoucherEffect::CreateCheck(status) => match &account {
                Some(account) => {
                    companion =
                        Some(check::create_companion(conn, &current, account.id, status).await?);
                }
                None => warn!(
                    voucher_id = current.id,
                    bank_name = current.bank().unwrap_or_default(),
                    "No bank account matches the voucher's bank; companion check left to the sweep"
                ),
            },
            VoucherEffect::IssueCheck => {
                if let Some(pending) = companion.take() {
                    companion = Some(check::issue(conn, pending, &current).await?);
                }
            }
            VoucherEffect::AdvanceCheckbook => {
                let account_id = companion
                    .as_ref()
                    .map(|c| c.bank_account_id)
                    .or_else(|| account.as_ref().map(|a| a.id));
                if let (Some(account_id), Some(number)) = (account_id, current.check_number()) {
                    advance = Some((account_id, number.to_string()));
                }
            }
            VoucherEffect::RecordEncashment => match &account {
                Some(account) => {
                    let linked = linked_transactions(conn, current.id).await?;
                    let effect = CheckLifecycle::encashment_withdrawal(
                        current.payment_type.into(),
                        current.amount,
                        outstanding_on(&linked, account.id),
                    );
                    let target = posting(&current, account.id);
                    postings.extend(apply_effect(conn, &effect, &target).await?);
                }
                None => warn!(
                    voucher_id = current.id,
                    bank_name = current.bank().unwrap_or_default(),
                    "No bank account matches the voucher's bank; encashment left to the sweep"
                ),
            },
            VoucherEffect::DelegateToCheck(target) => {
                let open = companion
                    .take()
                    .ok_or(WorkflowError::CompanionCheckMissing(current.id))?;
                let outcome = check::transition(conn, open, current, target, extra).await?;
                current = outcome.voucher;
                companion = Some(outcome.check);
                postings.extend(outcome.posted);
            }
            VoucherEffect::ReverseOutstanding => {
                let linked = linked_transactions(conn, current.id).await?;
                let accounts: BTreeSet<i64> =
                    linked.iter().map(|row| row.bank_account_id).collect();
                for account_id in accounts {
                    let effect = CheckLifecycle::reversal_without_check(
                        current.status.into(),
                        outstanding_on(&linked, account_id),
                    );
                    let target = posting(&current, account_id);
                    postings.extend(apply_effect(conn, &effect, &target).await?);
                }
            }
        }
    }

    Ok(EffectOutcome {
        voucher: current,
        check: companion,
        postings,
        advance,
    })
}

fn posting(voucher: &vouchers::Model, account_id: i64) -> VoucherPosting {
    VoucherPosting {
        account_id,
        voucher_id: voucher.id,
        check_no: voucher.check_number().map(str::to_string),
        date: Utc::now().date_naive(),
        description: format!("{} - {}", voucher.voucher_no, voucher.payee),
    }
}
