//! `SeaORM` Entity for vouchers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vouchledger_core::workflow::VoucherFields;

use super::sea_orm_active_enums::{PaymentType, VoucherStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub company_id: i64,
    pub voucher_no: String,
    pub date: Date,
    pub payee: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub check_no: Option<String>,
    pub bank_name: Option<String>,
    pub category: Option<String>,
    pub status: VoucherStatus,
    pub created_by: i64,
    pub urgency: Option<String>,
    pub deadline_date: Option<Date>,
    pub is_pdc: bool,
    pub check_date: Option<Date>,
    pub check_issued_date: Option<Date>,
    pub attachment: Option<String>,
    pub void_reason: Option<String>,
    pub certified_by: Option<String>,
    pub approved_by: Option<String>,
    pub received_by: Option<String>,
    pub approval_attachment: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Editable fields of this voucher.
    #[must_use]
    pub fn fields(&self) -> VoucherFields {
        VoucherFields {
            date: self.date,
            payee: self.payee.clone(),
            description: self.description.clone(),
            amount: self.amount,
            payment_type: self.payment_type.into(),
            check_no: self.check_no.clone(),
            bank_name: self.bank_name.clone(),
            category: self.category.clone(),
            urgency: self.urgency.clone(),
            deadline_date: self.deadline_date,
            is_pdc: self.is_pdc,
            check_date: self.check_date,
            check_issued_date: self.check_issued_date,
        }
    }

    /// Check number, if filled in.
    #[must_use]
    pub fn check_number(&self) -> Option<&str> {
        self.check_no.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Bank name, if filled in.
    #[must_use]
    pub fn bank(&self) -> Option<&str> {
        self.bank_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id"
    )]
    Companies,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
