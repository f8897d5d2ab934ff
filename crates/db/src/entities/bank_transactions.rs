//! `SeaORM` Entity for bank_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vouchledger_core::ledger::LedgerEntry;

use super::sea_orm_active_enums::BankTransactionType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bank_account_id: i64,
    pub voucher_id: Option<i64>,
    pub transaction_type: BankTransactionType,
    pub category: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub check_no: Option<String>,
    pub transaction_date: Date,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub running_balance: Decimal,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The replay's view of this row.
    #[must_use]
    pub fn entry(&self) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            transaction_date: self.transaction_date,
            transaction_type: self.transaction_type.into(),
            amount: self.amount,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank_accounts::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_accounts::Column::Id"
    )]
    BankAccounts,
}

impl Related<super::bank_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
