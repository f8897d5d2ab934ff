//! `SeaORM` Entity for checkbooks table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vouchledger_core::checkbook::CheckbookState;

use super::sea_orm_active_enums::CheckbookStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkbooks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub bank_account_id: i64,
    pub series_start: i64,
    pub series_end: i64,
    pub next_check_no: i64,
    pub status: CheckbookStatus,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The allocator's view of this checkbook.
    #[must_use]
    pub fn state(&self) -> CheckbookState {
        CheckbookState {
            id: self.id,
            series_start: self.series_start,
            series_end: self.series_end,
            next_check_no: self.next_check_no,
            status: self.status.into(),
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
