//! Balance ledger: bank accounts and their transaction log.
//!
//! Every balance mutation goes through [`post`]. It appends a row with the
//! account's next running balance and, for back-dated rows, replays the whole
//! account so stored balances always equal the replay of the log. Callers
//! hold the account lock for the whole database transaction.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vouchledger_core::ledger::{
    self, BankTransactionType, LedgerError, category, is_back_dated, next_balance,
    opening_deposit, validate_posting_amount,
};
use vouchledger_core::workflow::LedgerEffect;
use vouchledger_shared::types::{CompanyId, PageRequest, PageResponse};
use vouchledger_shared::{Principal, Role};

use crate::entities::{bank_accounts, bank_transactions, companies, sea_orm_active_enums as db};
use crate::error::db_err;
use crate::locks::LedgerLocks;

/// Input for opening a bank account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBankAccountInput {
    /// Owning company.
    pub company_id: i64,
    /// Bank name, matched against voucher bank names.
    pub bank_name: String,
    /// Account number.
    pub account_number: String,
    /// Opening balance; recorded as an "Opening Balance" deposit when positive.
    #[serde(default)]
    pub initial_balance: Decimal,
    /// Date of the opening deposit; today when absent.
    #[serde(default)]
    pub opened_on: Option<NaiveDate>,
}

/// A transaction to append to an account's log.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Deposit, withdrawal or bounce marker.
    pub transaction_type: BankTransactionType,
    /// Amount, positive for deposits and withdrawals.
    pub amount: Decimal,
    /// Transaction date; today when absent.
    pub date: Option<NaiveDate>,
    /// Category label.
    pub category: Option<String>,
    /// Free text.
    pub description: Option<String>,
    /// Check number the row belongs to.
    pub check_no: Option<String>,
    /// Voucher the row was posted for.
    pub voucher_id: Option<i64>,
}

impl NewTransaction {
    /// Creates a transaction dated today with no metadata.
    #[must_use]
    pub const fn new(transaction_type: BankTransactionType, amount: Decimal) -> Self {
        Self {
            transaction_type,
            amount,
            date: None,
            category: None,
            description: None,
            check_no: None,
            voucher_id: None,
        }
    }

    /// Sets the date.
    #[must_use]
    pub const fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Links the row to a voucher and, optionally, its check number.
    #[must_use]
    pub fn for_voucher(mut self, voucher_id: i64, check_no: Option<String>) -> Self {
        self.voucher_id = Some(voucher_id);
        self.check_no = check_no;
        self
    }
}

/// Edit of a historical transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
}

/// A stored transaction together with the account balance afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PostedTransaction {
    /// The stored row (running balance already replayed).
    pub transaction: bank_transactions::Model,
    /// Account balance after the posting.
    pub new_balance: Decimal,
}

/// Repository for bank accounts and the balance ledger.
#[derive(Debug, Clone)]
pub struct BankAccountRepository {
    db: DatabaseConnection,
    locks: LedgerLocks,
}

impl BankAccountRepository {
    /// Creates a new bank account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LedgerLocks) -> Self {
        Self { db, locks }
    }

    /// Opens a bank account, recording a positive opening balance as a deposit.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateBankAccountInput,
    ) -> Result<bank_accounts::Model, LedgerError> {
        authorize(principal, input.company_id, true)?;
        let bank_name = input.bank_name.trim().to_string();
        if bank_name.is_empty() {
            return Err(LedgerError::Validation("Bank name is required".into()));
        }
        let opening = opening_deposit(input.initial_balance)?;

        companies::Entity::find_by_id(input.company_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::CompanyNotFound(input.company_id))?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();
        let account = bank_accounts::ActiveModel {
            company_id: Set(input.company_id),
            bank_name: Set(bank_name),
            account_number: Set(input.account_number.trim().to_string()),
            current_balance: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        // Nobody can reference the new id yet, so no lock is needed.
        if let Some(amount) = opening {
            let mut deposit = NewTransaction::new(BankTransactionType::Deposit, amount)
                .category(category::OPENING_BALANCE)
                .description("Opening balance");
            deposit.date = input.opened_on;
            post(&txn, account.id, deposit).await?;
        }

        let account = find_account(&txn, account.id).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            account_id = account.id,
            company_id = account.company_id,
            balance = %account.current_balance,
            "Bank account opened"
        );
        Ok(account)
    }

    /// Gets a bank account.
    pub async fn get(
        &self,
        principal: &Principal,
        account_id: i64,
    ) -> Result<bank_accounts::Model, LedgerError> {
        let account = find_account(&self.db, account_id).await?;
        authorize(principal, account.company_id, false)?;
        Ok(account)
    }

    /// Lists an account's transactions in ledger order.
    pub async fn list_transactions(
        &self,
        principal: &Principal,
        account_id: i64,
        page: &PageRequest,
    ) -> Result<PageResponse<bank_transactions::Model>, LedgerError> {
        self.get(principal, account_id).await?;

        let query = bank_transactions::Entity::find()
            .filter(bank_transactions::Column::BankAccountId.eq(account_id))
            .order_by_asc(bank_transactions::Column::TransactionDate)
            .order_by_asc(bank_transactions::Column::Id);

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Appends a transaction and returns the new balance.
    pub async fn record_transaction(
        &self,
        principal: &Principal,
        account_id: i64,
        input: NewTransaction,
    ) -> Result<PostedTransaction, LedgerError> {
        let account = find_account(&self.db, account_id).await?;
        authorize(principal, account.company_id, true)?;

        let _guard = self.locks.accounts([account_id]).await;
        let txn = self.db.begin().await.map_err(db_err)?;
        let posted = post(&txn, account_id, input).await?;
        txn.commit().await.map_err(db_err)?;

        Ok(posted)
    }

    /// Deposits `amount` back with a reversal category.
    pub async fn reverse(
        &self,
        principal: &Principal,
        account_id: i64,
        amount: Decimal,
        reversal_category: &str,
    ) -> Result<PostedTransaction, LedgerError> {
        self.record_transaction(
            principal,
            account_id,
            NewTransaction::new(BankTransactionType::Deposit, amount).category(reversal_category),
        )
        .await
    }

    /// Replays the account from zero and returns its balance.
    pub async fn recalculate(
        &self,
        principal: &Principal,
        account_id: i64,
    ) -> Result<Decimal, LedgerError> {
        let account = find_account(&self.db, account_id).await?;
        authorize(principal, account.company_id, true)?;

        let _guard = self.locks.accounts([account_id]).await;
        let txn = self.db.begin().await.map_err(db_err)?;
        let balance = recalculate(&txn, account_id).await?;
        txn.commit().await.map_err(db_err)?;

        Ok(balance)
    }

    /// Edits a historical transaction and replays its account.
    pub async fn update_transaction(
        &self,
        principal: &Principal,
        transaction_id: i64,
        patch: TransactionPatch,
    ) -> Result<PostedTransaction, LedgerError> {
        let existing = find_transaction(&self.db, transaction_id).await?;
        let account = find_account(&self.db, existing.bank_account_id).await?;
        authorize(principal, account.company_id, true)?;

        let _guard = self.locks.accounts([account.id]).await;
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = find_transaction(&txn, transaction_id).await?;
        if let Some(amount) = patch.amount {
            validate_posting_amount(existing.transaction_type.into(), amount)?;
        }

        let mut active: bank_transactions::ActiveModel = existing.into();
        if let Some(amount) = patch.amount {
            active.amount = Set(amount);
        }
        if let Some(date) = patch.date {
            active.transaction_date = Set(date);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        active.update(&txn).await.map_err(db_err)?;

        let new_balance = recalculate(&txn, account.id).await?;
        let transaction = find_transaction(&txn, transaction_id).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            transaction_id,
            account_id = account.id,
            balance = %new_balance,
            "Bank transaction edited"
        );
        Ok(PostedTransaction {
            transaction,
            new_balance,
        })
    }
}

/// Company scope and role check for ledger operations.
///
/// `write` additionally rejects voucher preparers.
fn authorize(principal: &Principal, company_id: i64, write: bool) -> Result<(), LedgerError> {
    if !principal.can_access_company(CompanyId(company_id)) {
        return Err(LedgerError::Forbidden(format!(
            "no access to company {company_id}"
        )));
    }
    if write && !matches!(principal.role, Role::Admin | Role::Liaison) {
        return Err(LedgerError::Forbidden(format!(
            "role {} may not change bank accounts",
            principal.role
        )));
    }
    Ok(())
}

pub(crate) async fn find_account<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<bank_accounts::Model, LedgerError> {
    bank_accounts::Entity::find_by_id(account_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::BankAccountNotFound(account_id))
}

async fn find_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
) -> Result<bank_transactions::Model, LedgerError> {
    bank_transactions::Entity::find_by_id(transaction_id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::TransactionNotFound(transaction_id))
}

/// Loads the account row, holding a row lock on PostgreSQL.
async fn lock_account_row<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<bank_accounts::Model, LedgerError> {
    let mut query = bank_accounts::Entity::find_by_id(account_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::BankAccountNotFound(account_id))
}

/// Resolves a voucher's bank name to an account of its company.
///
/// The lowest id wins when several accounts share the name.
pub(crate) async fn resolve_account<C: ConnectionTrait>(
    conn: &C,
    company_id: i64,
    bank_name: &str,
) -> Result<Option<bank_accounts::Model>, LedgerError> {
    bank_accounts::Entity::find()
        .filter(bank_accounts::Column::CompanyId.eq(company_id))
        .filter(bank_accounts::Column::BankName.eq(bank_name.trim()))
        .order_by_asc(bank_accounts::Column::Id)
        .one(conn)
        .await
        .map_err(db_err)
}

/// Appends one transaction to `account_id`.
pub(crate) async fn post<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    input: NewTransaction,
) -> Result<PostedTransaction, LedgerError> {
    validate_posting_amount(input.transaction_type, input.amount)?;
    let account = lock_account_row(conn, account_id).await?;
    let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

    let latest = bank_transactions::Entity::find()
        .filter(bank_transactions::Column::BankAccountId.eq(account_id))
        .order_by_desc(bank_transactions::Column::TransactionDate)
        .order_by_desc(bank_transactions::Column::Id)
        .one(conn)
        .await
        .map_err(db_err)?
        .map(|row| row.transaction_date);

    let running = next_balance(account.current_balance, input.transaction_type, input.amount);
    let now = Utc::now();
    let transaction = bank_transactions::ActiveModel {
        bank_account_id: Set(account_id),
        voucher_id: Set(input.voucher_id),
        transaction_type: Set(input.transaction_type.into()),
        category: Set(input.category),
        amount: Set(input.amount),
        description: Set(input.description),
        check_no: Set(input.check_no),
        transaction_date: Set(date),
        running_balance: Set(running),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    let mut account: bank_accounts::ActiveModel = account.into();
    account.current_balance = Set(running);
    account.updated_at = Set(now);
    account.update(conn).await.map_err(db_err)?;

    if is_back_dated(date, latest) {
        debug!(account_id, %date, "Back-dated transaction, replaying account");
        let new_balance = recalculate(conn, account_id).await?;
        let transaction = find_transaction(conn, transaction.id).await?;
        return Ok(PostedTransaction {
            transaction,
            new_balance,
        });
    }

    debug!(
        account_id,
        transaction_id = transaction.id,
        kind = %input.transaction_type,
        amount = %transaction.amount,
        balance = %running,
        "Bank transaction posted"
    );
    Ok(PostedTransaction {
        transaction,
        new_balance: running,
    })
}

/// Replays `account_id` from zero, rewriting drifted running balances.
pub(crate) async fn recalculate<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
) -> Result<Decimal, LedgerError> {
    let account = lock_account_row(conn, account_id).await?;
    let rows = bank_transactions::Entity::find()
        .filter(bank_transactions::Column::BankAccountId.eq(account_id))
        .order_by_asc(bank_transactions::Column::TransactionDate)
        .order_by_asc(bank_transactions::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;

    let entries: Vec<_> = rows.iter().map(bank_transactions::Model::entry).collect();
    let stored: Vec<_> = rows.iter().map(|row| (row.id, row.running_balance)).collect();
    let replayed = ledger::replay(&entries);

    let changed = replayed.changed(&stored);
    for row in &changed {
        bank_transactions::ActiveModel {
            id: Set(row.id),
            running_balance: Set(row.running_balance),
            ..Default::default()
        }
        .update(conn)
        .await
        .map_err(db_err)?;
    }

    if account.current_balance != replayed.final_balance {
        let mut active: bank_accounts::ActiveModel = account.into();
        active.current_balance = Set(replayed.final_balance);
        active.updated_at = Set(Utc::now());
        active.update(conn).await.map_err(db_err)?;
    }

    debug!(
        account_id,
        rows = rows.len(),
        rewritten = changed.len(),
        balance = %replayed.final_balance,
        "Account recalculated"
    );
    Ok(replayed.final_balance)
}

/// Transactions posted on behalf of a voucher.
pub(crate) async fn linked_transactions<C: ConnectionTrait>(
    conn: &C,
    voucher_id: i64,
) -> Result<Vec<bank_transactions::Model>, LedgerError> {
    bank_transactions::Entity::find()
        .filter(bank_transactions::Column::VoucherId.eq(voucher_id))
        .order_by_asc(bank_transactions::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)
}

/// Net amount still withdrawn for a voucher on one account.
pub(crate) fn outstanding_on(linked: &[bank_transactions::Model], account_id: i64) -> Decimal {
    let pairs: Vec<_> = linked
        .iter()
        .filter(|row| row.bank_account_id == account_id)
        .map(|row| (BankTransactionType::from(row.transaction_type), row.amount))
        .collect();
    ledger::outstanding(&pairs)
}

/// Where a voucher-driven posting lands.
#[derive(Debug, Clone)]
pub(crate) struct VoucherPosting {
    pub account_id: i64,
    pub voucher_id: i64,
    pub check_no: Option<String>,
    pub date: NaiveDate,
    pub description: String,
}

/// Carries out a check or voucher ledger effect.
pub(crate) async fn apply_effect<C: ConnectionTrait>(
    conn: &C,
    effect: &LedgerEffect,
    target: &VoucherPosting,
) -> Result<Option<PostedTransaction>, LedgerError> {
    let (kind, amount, label) = match effect {
        LedgerEffect::None => return Ok(None),
        LedgerEffect::Withdraw { amount, category } => {
            (BankTransactionType::Withdrawal, *amount, *category)
        }
        LedgerEffect::Reverse { amount, category } => {
            (BankTransactionType::Deposit, *amount, *category)
        }
        LedgerEffect::BounceMarker => {
            (BankTransactionType::Bounced, Decimal::ZERO, category::BOUNCE_MARKER)
        }
    };

    let input = NewTransaction::new(kind, amount)
        .on(target.date)
        .category(label)
        .description(target.description.clone())
        .for_voucher(target.voucher_id, target.check_no.clone());
    post(conn, target.account_id, input).await.map(Some)
}

/// Rows of the given type on an account that carry `check_no`.
pub(crate) async fn has_check_transaction<C: ConnectionTrait>(
    conn: &C,
    account_id: i64,
    check_no: &str,
    kind: db::BankTransactionType,
) -> Result<bool, LedgerError> {
    let count = bank_transactions::Entity::find()
        .filter(bank_transactions::Column::BankAccountId.eq(account_id))
        .filter(bank_transactions::Column::CheckNo.eq(check_no))
        .filter(bank_transactions::Column::TransactionType.eq(kind))
        .count(conn)
        .await
        .map_err(db_err)?;
    Ok(count > 0)
}
