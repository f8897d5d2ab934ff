//! Initial schema: companies, bank accounts, checkbooks, vouchers, checks,
//! bank transactions and voucher history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(pk(Companies::Id))
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::Prefix).string_len(16).not_null())
                    .col(ColumnDef::new(Companies::Address).string())
                    .col(ColumnDef::new(Companies::Contact).string())
                    .col(timestamp(Companies::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_companies_prefix")
                    .table(Companies::Table)
                    .col(Companies::Prefix)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(pk(BankAccounts::Id))
                    .col(ColumnDef::new(BankAccounts::CompanyId).big_integer().not_null())
                    .col(ColumnDef::new(BankAccounts::BankName).string().not_null())
                    .col(ColumnDef::new(BankAccounts::AccountNumber).string().not_null())
                    .col(money(BankAccounts::CurrentBalance))
                    .col(timestamp(BankAccounts::CreatedAt))
                    .col(timestamp(BankAccounts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_accounts_company")
                            .from(BankAccounts::Table, BankAccounts::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bank_accounts_company_bank")
                    .table(BankAccounts::Table)
                    .col(BankAccounts::CompanyId)
                    .col(BankAccounts::BankName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Checkbooks::Table)
                    .if_not_exists()
                    .col(pk(Checkbooks::Id))
                    .col(ColumnDef::new(Checkbooks::BankAccountId).big_integer().not_null())
                    .col(ColumnDef::new(Checkbooks::SeriesStart).big_integer().not_null())
                    .col(ColumnDef::new(Checkbooks::SeriesEnd).big_integer().not_null())
                    .col(ColumnDef::new(Checkbooks::NextCheckNo).big_integer().not_null())
                    .col(ColumnDef::new(Checkbooks::Status).string_len(16).not_null())
                    .col(timestamp(Checkbooks::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkbooks_bank_account")
                            .from(Checkbooks::Table, Checkbooks::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vouchers::Table)
                    .if_not_exists()
                    .col(pk(Vouchers::Id))
                    .col(ColumnDef::new(Vouchers::CompanyId).big_integer().not_null())
                    .col(ColumnDef::new(Vouchers::VoucherNo).string_len(64).not_null())
                    .col(ColumnDef::new(Vouchers::Date).date().not_null())
                    .col(ColumnDef::new(Vouchers::Payee).string().not_null())
                    .col(ColumnDef::new(Vouchers::Description).text())
                    .col(money(Vouchers::Amount))
                    .col(ColumnDef::new(Vouchers::PaymentType).string_len(32).not_null())
                    .col(ColumnDef::new(Vouchers::CheckNo).string_len(32))
                    .col(ColumnDef::new(Vouchers::BankName).string())
                    .col(ColumnDef::new(Vouchers::Category).string())
                    .col(ColumnDef::new(Vouchers::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Vouchers::CreatedBy).big_integer().not_null())
                    .col(ColumnDef::new(Vouchers::Urgency).string_len(32))
                    .col(ColumnDef::new(Vouchers::DeadlineDate).date())
                    .col(
                        ColumnDef::new(Vouchers::IsPdc)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Vouchers::CheckDate).date())
                    .col(ColumnDef::new(Vouchers::CheckIssuedDate).date())
                    .col(ColumnDef::new(Vouchers::Attachment).text())
                    .col(ColumnDef::new(Vouchers::VoidReason).text())
                    .col(ColumnDef::new(Vouchers::CertifiedBy).string())
                    .col(ColumnDef::new(Vouchers::ApprovedBy).string())
                    .col(ColumnDef::new(Vouchers::ReceivedBy).string())
                    .col(ColumnDef::new(Vouchers::ApprovalAttachment).text())
                    .col(timestamp(Vouchers::CreatedAt))
                    .col(timestamp(Vouchers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouchers_company")
                            .from(Vouchers::Table, Vouchers::CompanyId)
                            .to(Companies::Table, Companies::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_vouchers_company_number")
                    .table(Vouchers::Table)
                    .col(Vouchers::CompanyId)
                    .col(Vouchers::VoucherNo)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_vouchers_status")
                    .table(Vouchers::Table)
                    .col(Vouchers::Status)
                    .col(Vouchers::PaymentType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Checks::Table)
                    .if_not_exists()
                    .col(pk(Checks::Id))
                    .col(ColumnDef::new(Checks::BankAccountId).big_integer().not_null())
                    .col(ColumnDef::new(Checks::VoucherId).big_integer().not_null())
                    .col(ColumnDef::new(Checks::CheckNumber).string_len(32).not_null())
                    .col(ColumnDef::new(Checks::CheckDate).date())
                    .col(ColumnDef::new(Checks::DateIssued).date())
                    .col(ColumnDef::new(Checks::DateCleared).date())
                    .col(ColumnDef::new(Checks::Payee).string().not_null())
                    .col(ColumnDef::new(Checks::Description).text())
                    .col(money(Checks::Amount))
                    .col(ColumnDef::new(Checks::Status).string_len(32).not_null())
                    .col(timestamp(Checks::CreatedAt))
                    .col(timestamp(Checks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checks_bank_account")
                            .from(Checks::Table, Checks::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checks_voucher")
                            .from(Checks::Table, Checks::VoucherId)
                            .to(Vouchers::Table, Vouchers::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_checks_voucher")
                    .table(Checks::Table)
                    .col(Checks::VoucherId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_checks_account_number")
                    .table(Checks::Table)
                    .col(Checks::BankAccountId)
                    .col(Checks::CheckNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankTransactions::Table)
                    .if_not_exists()
                    .col(pk(BankTransactions::Id))
                    .col(
                        ColumnDef::new(BankTransactions::BankAccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::VoucherId).big_integer())
                    .col(
                        ColumnDef::new(BankTransactions::TransactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(BankTransactions::Category).string())
                    .col(money(BankTransactions::Amount))
                    .col(ColumnDef::new(BankTransactions::Description).text())
                    .col(ColumnDef::new(BankTransactions::CheckNo).string_len(32))
                    .col(
                        ColumnDef::new(BankTransactions::TransactionDate)
                            .date()
                            .not_null(),
                    )
                    .col(money(BankTransactions::RunningBalance))
                    .col(timestamp(BankTransactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bank_transactions_account")
                            .from(BankTransactions::Table, BankTransactions::BankAccountId)
                            .to(BankAccounts::Table, BankAccounts::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bank_transactions_replay")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::BankAccountId)
                    .col(BankTransactions::TransactionDate)
                    .col(BankTransactions::Id)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bank_transactions_voucher")
                    .table(BankTransactions::Table)
                    .col(BankTransactions::VoucherId)
                    .to_owned(),
            )
            .await?;

        // No foreign key: history outlives a force-deleted voucher.
        manager
            .create_table(
                Table::create()
                    .table(VoucherHistory::Table)
                    .if_not_exists()
                    .col(pk(VoucherHistory::Id))
                    .col(ColumnDef::new(VoucherHistory::VoucherId).big_integer().not_null())
                    .col(ColumnDef::new(VoucherHistory::Actor).string().not_null())
                    .col(ColumnDef::new(VoucherHistory::Action).string_len(64).not_null())
                    .col(ColumnDef::new(VoucherHistory::Detail).text())
                    .col(timestamp(VoucherHistory::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_voucher_history_voucher")
                    .table(VoucherHistory::Table)
                    .col(VoucherHistory::VoucherId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VoucherHistory::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankTransactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Checks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vouchers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Checkbooks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankAccounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn money<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name).decimal_len(15, 2).not_null().to_owned()
}

fn timestamp<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    Prefix,
    Address,
    Contact,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BankAccounts {
    Table,
    Id,
    CompanyId,
    BankName,
    AccountNumber,
    CurrentBalance,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Checkbooks {
    Table,
    Id,
    BankAccountId,
    SeriesStart,
    SeriesEnd,
    NextCheckNo,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Vouchers {
    Table,
    Id,
    CompanyId,
    VoucherNo,
    Date,
    Payee,
    Description,
    Amount,
    PaymentType,
    CheckNo,
    BankName,
    Category,
    Status,
    CreatedBy,
    Urgency,
    DeadlineDate,
    IsPdc,
    CheckDate,
    CheckIssuedDate,
    Attachment,
    VoidReason,
    CertifiedBy,
    ApprovedBy,
    ReceivedBy,
    ApprovalAttachment,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Checks {
    Table,
    Id,
    BankAccountId,
    VoucherId,
    CheckNumber,
    CheckDate,
    DateIssued,
    DateCleared,
    Payee,
    Description,
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BankTransactions {
    Table,
    Id,
    BankAccountId,
    VoucherId,
    TransactionType,
    Category,
    Amount,
    Description,
    CheckNo,
    TransactionDate,
    RunningBalance,
    CreatedAt,
}

#[derive(DeriveIden)]
enum VoucherHistory {
    Table,
    Id,
    VoucherId,
    Actor,
    Action,
    Detail,
    CreatedAt,
}
