//! Bank account, transaction and checkbook routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use vouchledger_core::ledger::BankTransactionType;
use vouchledger_db::entities::{bank_accounts, bank_transactions, checkbooks};
use vouchledger_db::repositories::{
    CreateBankAccountInput, CreateCheckbookInput, NewTransaction, PostedTransaction,
    TransactionPatch,
};
use vouchledger_shared::types::{AmountInput, PageRequest, PageResponse};

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the bank account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bank-accounts", post(create_account))
        .route("/bank-accounts/{account_id}", get(get_account))
        .route(
            "/bank-accounts/{account_id}/transactions",
            get(list_transactions).post(record_transaction),
        )
        .route("/bank-accounts/{account_id}/recalculate", post(recalculate))
        .route("/bank-transactions/{transaction_id}", patch(update_transaction))
        .route(
            "/bank-accounts/{account_id}/checkbooks",
            get(list_checkbooks).post(create_checkbook),
        )
        .route(
            "/bank-accounts/{account_id}/checkbooks/next",
            get(next_check_number),
        )
        .route("/checkbooks/{checkbook_id}/close", post(close_checkbook))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening a bank account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Owning company.
    pub company_id: i64,
    /// Bank name.
    pub bank_name: String,
    /// Account number.
    pub account_number: String,
    /// Opening balance.
    #[serde(default)]
    pub initial_balance: Option<AmountInput>,
    /// Date of the opening deposit.
    #[serde(default)]
    pub opened_on: Option<NaiveDate>,
}

/// Request body for a manual deposit or withdrawal.
#[derive(Debug, Deserialize)]
pub struct RecordTransactionRequest {
    /// `Deposit` or `Withdrawal`.
    pub transaction_type: BankTransactionType,
    /// Positive amount.
    pub amount: AmountInput,
    /// Transaction date; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Related check number.
    #[serde(default)]
    pub check_no: Option<String>,
}

/// Request body for editing a historical transaction.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTransactionRequest {
    amount: Option<AmountInput>,
    date: Option<NaiveDate>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    new_balance: Decimal,
}

#[derive(Debug, Serialize)]
struct NextCheckResponse {
    next_check_no: Option<String>,
}

// ============================================================================
// Accounts and transactions
// ============================================================================

/// POST `/bank-accounts`
async fn create_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<bank_accounts::Model>), ApiError> {
    let initial_balance = payload
        .initial_balance
        .map(|a| a.to_decimal())
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    let input = CreateBankAccountInput {
        company_id: payload.company_id,
        bank_name: payload.bank_name,
        account_number: payload.account_number,
        initial_balance,
        opened_on: payload.opened_on,
    };
    let account = state.bank_accounts().create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/bank-accounts/{account_id}`
async fn get_account(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
) -> Result<Json<bank_accounts::Model>, ApiError> {
    Ok(Json(state.bank_accounts().get(&principal, account_id).await?))
}

/// GET `/bank-accounts/{account_id}/transactions?page=&per_page=`
async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<bank_transactions::Model>>, ApiError> {
    let rows = state
        .bank_accounts()
        .list_transactions(&principal, account_id, &page)
        .await?;
    Ok(Json(rows))
}

/// POST `/bank-accounts/{account_id}/transactions`
async fn record_transaction(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
    Json(payload): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<PostedTransaction>), ApiError> {
    if payload.transaction_type == BankTransactionType::Bounced {
        return Err(ApiError::validation(
            "Only deposits and withdrawals can be recorded manually",
        ));
    }
    let mut input =
        NewTransaction::new(payload.transaction_type, payload.amount.to_decimal()?);
    input.date = payload.date;
    input.category = payload.category;
    input.description = payload.description;
    input.check_no = payload.check_no;

    let posted = state
        .bank_accounts()
        .record_transaction(&principal, account_id, input)
        .await?;
    info!(
        account_id,
        transaction_id = posted.transaction.id,
        "Manual transaction recorded"
    );
    Ok((StatusCode::CREATED, Json(posted)))
}

/// POST `/bank-accounts/{account_id}/recalculate` - Replay the log from zero.
async fn recalculate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let new_balance = state
        .bank_accounts()
        .recalculate(&principal, account_id)
        .await?;
    Ok(Json(BalanceResponse { new_balance }))
}

/// PATCH `/bank-transactions/{transaction_id}`
async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(transaction_id): Path<i64>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Json<PostedTransaction>, ApiError> {
    let patch = TransactionPatch {
        amount: payload.amount.map(|a| a.to_decimal()).transpose()?,
        date: payload.date,
        description: payload.description,
    };
    let posted = state
        .bank_accounts()
        .update_transaction(&principal, transaction_id, patch)
        .await?;
    Ok(Json(posted))
}

// ============================================================================
// Checkbooks
// ============================================================================

/// POST `/bank-accounts/{account_id}/checkbooks`
async fn create_checkbook(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
    Json(payload): Json<CreateCheckbookInput>,
) -> Result<(StatusCode, Json<checkbooks::Model>), ApiError> {
    let book = state
        .checkbooks()
        .create(&principal, account_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET `/bank-accounts/{account_id}/checkbooks`
async fn list_checkbooks(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
) -> Result<Json<Vec<checkbooks::Model>>, ApiError> {
    Ok(Json(state.checkbooks().list(&principal, account_id).await?))
}

/// GET `/bank-accounts/{account_id}/checkbooks/next`
async fn next_check_number(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(account_id): Path<i64>,
) -> Result<Json<NextCheckResponse>, ApiError> {
    let next_check_no = state
        .checkbooks()
        .suggest_next(&principal, account_id)
        .await?;
    Ok(Json(NextCheckResponse { next_check_no }))
}

/// POST `/checkbooks/{checkbook_id}/close`
async fn close_checkbook(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(checkbook_id): Path<i64>,
) -> Result<Json<checkbooks::Model>, ApiError> {
    Ok(Json(
        state.checkbooks().close(&principal, checkbook_id).await?,
    ))
}
