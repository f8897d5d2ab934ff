//! Shared fixtures for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database migrated with the real
//! migration. The pool is capped at one connection so the whole test sees the
//! same database.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use vouchledger_core::ledger::{self, LedgerEntry};
use vouchledger_core::workflow::{PaymentType, VoucherFields};
use vouchledger_db::entities::{
    bank_accounts, bank_transactions, checkbooks, companies, sea_orm_active_enums as db, vouchers,
};
use vouchledger_db::migration::{Migrator, MigratorTrait};
use vouchledger_db::repositories::{
    CreateBankAccountInput, CreateCheckbookInput, CreateCompanyInput, CreateVoucherInput,
};
use vouchledger_db::{
    BankAccountRepository, CheckRepository, CheckbookRepository, CompanyRepository, LedgerLocks,
    ReconciliationRepository, VoucherRepository,
};
use vouchledger_shared::types::{CompanyId, UserId};
use vouchledger_shared::{Principal, Role};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn admin() -> Principal {
    Principal::new(UserId(1), "Ada Admin", Role::Admin, None)
}

pub fn liaison(company_id: i64) -> Principal {
    Principal::new(UserId(2), "Lee Liaison", Role::Liaison, Some(CompanyId(company_id)))
}

pub fn staff(company_id: i64) -> Principal {
    Principal::new(UserId(3), "Sam Staff", Role::Staff, Some(CompanyId(company_id)))
}

pub async fn connect() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open SQLite database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    db
}

/// A migrated database with one company ("ACME") and one bank account
/// ("BDO", opened on 2024-01-01 with 1000).
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub locks: LedgerLocks,
    pub company: companies::Model,
    pub account: bank_accounts::Model,
}

impl TestEnv {
    pub async fn new() -> Self {
        let db = connect().await;
        let locks = LedgerLocks::new();

        let company = CompanyRepository::new(db.clone())
            .create(
                &admin(),
                CreateCompanyInput {
                    name: "Acme Trading".into(),
                    prefix: "ACME".into(),
                    address: None,
                    contact: None,
                },
            )
            .await
            .unwrap();
        let account = BankAccountRepository::new(db.clone(), locks.clone())
            .create(
                &admin(),
                CreateBankAccountInput {
                    company_id: company.id,
                    bank_name: "BDO".into(),
                    account_number: "001-234-567".into(),
                    initial_balance: dec!(1000),
                    opened_on: Some(date(2024, 1, 1)),
                },
            )
            .await
            .unwrap();

        Self {
            db,
            locks,
            company,
            account,
        }
    }

    pub fn company_id(&self) -> i64 {
        self.company.id
    }

    pub fn vouchers(&self) -> VoucherRepository {
        VoucherRepository::new(self.db.clone(), self.locks.clone())
    }

    pub fn checks(&self) -> CheckRepository {
        CheckRepository::new(self.db.clone(), self.locks.clone())
    }

    pub fn accounts(&self) -> BankAccountRepository {
        BankAccountRepository::new(self.db.clone(), self.locks.clone())
    }

    pub fn checkbooks(&self) -> CheckbookRepository {
        CheckbookRepository::new(self.db.clone(), self.locks.clone())
    }

    pub fn sweep(&self) -> ReconciliationRepository {
        ReconciliationRepository::new(self.db.clone(), self.locks.clone())
    }

    /// Registers checkbook 100-200 on the account.
    pub async fn checkbook(&self) -> checkbooks::Model {
        self.checkbooks()
            .create(
                &admin(),
                self.account.id,
                CreateCheckbookInput {
                    series_start: 100,
                    series_end: 200,
                },
            )
            .await
            .unwrap()
    }

    pub async fn balance(&self) -> Decimal {
        bank_accounts::Entity::find_by_id(self.account.id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .current_balance
    }

    pub async fn transactions(&self) -> Vec<bank_transactions::Model> {
        bank_transactions::Entity::find()
            .filter(bank_transactions::Column::BankAccountId.eq(self.account.id))
            .order_by_asc(bank_transactions::Column::TransactionDate)
            .order_by_asc(bank_transactions::Column::Id)
            .all(&self.db)
            .await
            .unwrap()
    }

    pub async fn voucher(&self, id: i64) -> vouchers::Model {
        vouchers::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn next_check_no(&self, checkbook_id: i64) -> i64 {
        checkbooks::Entity::find_by_id(checkbook_id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
            .next_check_no
    }

    /// Asserts that stored running balances and the account balance equal a
    /// replay of the log.
    pub async fn assert_replay_consistent(&self) {
        let rows = self.transactions().await;
        let entries: Vec<LedgerEntry> = rows.iter().map(bank_transactions::Model::entry).collect();
        let replayed = ledger::replay(&entries);
        for row in &rows {
            assert_eq!(
                Some(row.running_balance),
                replayed.balance_of(row.id),
                "running balance of transaction {} drifted",
                row.id
            );
        }
        assert_eq!(self.balance().await, replayed.final_balance);
    }

    /// Inserts a voucher row directly, bypassing the lifecycle.
    pub async fn insert_raw_voucher(
        &self,
        status: db::VoucherStatus,
        payment_type: db::PaymentType,
        check_no: Option<&str>,
        bank_name: Option<&str>,
        amount: Decimal,
        voucher_no: &str,
    ) -> vouchers::Model {
        let now = Utc::now();
        vouchers::ActiveModel {
            company_id: Set(self.company.id),
            voucher_no: Set(voucher_no.to_string()),
            date: Set(date(2024, 2, 1)),
            payee: Set("Raw Payee".into()),
            description: Set(None),
            amount: Set(amount),
            payment_type: Set(payment_type),
            check_no: Set(check_no.map(str::to_string)),
            bank_name: Set(bank_name.map(str::to_string)),
            category: Set(None),
            status: Set(status),
            created_by: Set(1),
            urgency: Set(None),
            deadline_date: Set(None),
            is_pdc: Set(false),
            check_date: Set(None),
            check_issued_date: Set(None),
            attachment: Set(None),
            void_reason: Set(None),
            certified_by: Set(None),
            approved_by: Set(None),
            received_by: Set(None),
            approval_attachment: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
    }
}

pub fn fields(payment_type: PaymentType, check_no: Option<&str>, amount: Decimal) -> VoucherFields {
    VoucherFields {
        date: date(2024, 2, 1),
        payee: "Juan Dela Cruz".into(),
        description: Some("Office supplies".into()),
        amount,
        payment_type,
        check_no: check_no.map(str::to_string),
        bank_name: Some("BDO".into()),
        category: Some("Supplies".into()),
        urgency: None,
        deadline_date: None,
        is_pdc: false,
        check_date: Some(date(2024, 2, 5)),
        check_issued_date: None,
    }
}

pub fn check_voucher(company_id: i64, check_no: &str, amount: Decimal) -> CreateVoucherInput {
    CreateVoucherInput {
        company_id,
        fields: fields(PaymentType::Check, Some(check_no), amount),
    }
}

pub fn cash_voucher(company_id: i64, amount: Decimal) -> CreateVoucherInput {
    let mut fields = fields(PaymentType::Cash, None, amount);
    fields.bank_name = None;
    CreateVoucherInput { company_id, fields }
}
