//! Checkbook repository and the check number allocator.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use vouchledger_core::checkbook::{self, CheckbookState};
use vouchledger_core::ledger::LedgerError;
use vouchledger_shared::types::CompanyId;
use vouchledger_shared::{Principal, Role};

use crate::entities::{checkbooks, sea_orm_active_enums::CheckbookStatus};
use crate::error::db_err;
use crate::locks::LedgerLocks;
use crate::repositories::ledger::find_account;

/// Input for registering a checkbook.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreateCheckbookInput {
    /// First check number of the series.
    pub series_start: i64,
    /// Last check number of the series (inclusive).
    pub series_end: i64,
}

/// Repository for checkbooks.
#[derive(Debug, Clone)]
pub struct CheckbookRepository {
    db: DatabaseConnection,
    locks: LedgerLocks,
}

impl CheckbookRepository {
    /// Creates a new checkbook repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LedgerLocks) -> Self {
        Self { db, locks }
    }

    /// Registers a checkbook on a bank account.
    pub async fn create(
        &self,
        principal: &Principal,
        account_id: i64,
        input: CreateCheckbookInput,
    ) -> Result<checkbooks::Model, LedgerError> {
        checkbook::validate_series(input.series_start, input.series_end)?;
        let account = find_account(&self.db, account_id).await?;
        authorize(principal, account.company_id)?;

        let _guard = self.locks.accounts([account_id]).await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = states(&txn, account_id).await?;
        if let Some(book) = checkbook::overlapping(&existing, input.series_start, input.series_end)
        {
            return Err(LedgerError::SeriesOverlap(book.id));
        }

        let book = checkbooks::ActiveModel {
            bank_account_id: Set(account_id),
            series_start: Set(input.series_start),
            series_end: Set(input.series_end),
            next_check_no: Set(input.series_start),
            status: Set(CheckbookStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            checkbook_id = book.id,
            account_id,
            series_start = book.series_start,
            series_end = book.series_end,
            "Checkbook registered"
        );
        Ok(book)
    }

    /// Closes a checkbook.
    pub async fn close(
        &self,
        principal: &Principal,
        checkbook_id: i64,
    ) -> Result<checkbooks::Model, LedgerError> {
        let book = checkbooks::Entity::find_by_id(checkbook_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::CheckbookNotFound(checkbook_id))?;
        let account = find_account(&self.db, book.bank_account_id).await?;
        authorize(principal, account.company_id)?;

        if book.status == CheckbookStatus::Closed {
            return Ok(book);
        }
        let mut active: checkbooks::ActiveModel = book.into();
        active.status = Set(CheckbookStatus::Closed);
        let book = active.update(&self.db).await.map_err(db_err)?;

        info!(checkbook_id, "Checkbook closed");
        Ok(book)
    }

    /// Checkbooks of an account, oldest first.
    pub async fn list(
        &self,
        principal: &Principal,
        account_id: i64,
    ) -> Result<Vec<checkbooks::Model>, LedgerError> {
        let account = find_account(&self.db, account_id).await?;
        if !principal.can_access_company(CompanyId(account.company_id)) {
            return Err(LedgerError::Forbidden(format!(
                "no access to company {}",
                account.company_id
            )));
        }
        checkbooks::Entity::find()
            .filter(checkbooks::Column::BankAccountId.eq(account_id))
            .order_by_asc(checkbooks::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Next unused check number for an account, zero-padded.
    pub async fn suggest_next(
        &self,
        principal: &Principal,
        account_id: i64,
    ) -> Result<Option<String>, LedgerError> {
        let books: Vec<CheckbookState> = self
            .list(principal, account_id)
            .await?
            .iter()
            .map(checkbooks::Model::state)
            .collect();
        Ok(checkbook::suggest_next(&books))
    }
}

fn authorize(principal: &Principal, company_id: i64) -> Result<(), LedgerError> {
    if !principal.can_access_company(CompanyId(company_id)) {
        return Err(LedgerError::Forbidden(format!(
            "no access to company {company_id}"
        )));
    }
    if !matches!(principal.role, Role::Admin | Role::Liaison) {
        return Err(LedgerError::Forbidden(format!(
            "role {} may not manage checkbooks",
            principal.role
        )));
    }
    Ok(())
}

async fn states<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<Vec<CheckbookState>, LedgerError> {
    Ok(checkbooks::Entity::find()
        .filter(checkbooks::Column::BankAccountId.eq(account_id))
        .order_by_asc(checkbooks::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
        .iter()
        .map(checkbooks::Model::state)
        .collect())
}

/// Moves the frontier of the checkbook holding `check_no` past it.
///
/// Does nothing for numbers outside every active series or behind the
/// frontier. Returns the checkbook id when it moved.
pub(crate) async fn advance<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    check_no: &str,
) -> Result<Option<i64>, LedgerError> {
    let books = states(conn, account_id).await?;
    let Some((checkbook_id, next)) = checkbook::find_advance(&books, check_no) else {
        return Ok(None);
    };

    checkbooks::ActiveModel {
        id: Set(checkbook_id),
        next_check_no: Set(next),
        ..Default::default()
    }
    .update(conn)
    .await
    .map_err(db_err)?;

    debug!(checkbook_id, account_id, check_no, next, "Checkbook advanced");
    Ok(Some(checkbook_id))
}

/// Advances the checkbook after the voucher's own transaction committed.
///
/// A failure leaves the frontier where it was and is only logged.
pub(crate) async fn advance_after_commit<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
    account_id: i64,
    check_no: &str,
) {
    if let Err(err) = advance(conn, account_id, check_no).await {
        warn!(
            voucher_id,
            account_id,
            check_no,
            error = %err,
            "Checkbook advance failed; next check number suggestion is stale"
        );
    }
}
