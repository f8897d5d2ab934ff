//! `SeaORM` entity definitions.

pub mod bank_accounts;
pub mod bank_transactions;
pub mod checkbooks;
pub mod checks;
pub mod companies;
pub mod sea_orm_active_enums;
pub mod voucher_history;
pub mod vouchers;
