//! Company repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use tracing::info;
use vouchledger_core::ledger::LedgerError;
use vouchledger_shared::types::CompanyId;
use vouchledger_shared::{Principal, Role};

use crate::entities::companies;
use crate::error::db_err;

/// Input for creating a company.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyInput {
    /// Company name.
    pub name: String,
    /// Voucher number prefix, unique across companies.
    pub prefix: String,
    /// Postal address.
    pub address: Option<String>,
    /// Contact person or number.
    pub contact: Option<String>,
}

/// Repository for companies.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    db: DatabaseConnection,
}

impl CompanyRepository {
    /// Creates a new company repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a company. Admin only.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateCompanyInput,
    ) -> Result<companies::Model, LedgerError> {
        if principal.role != Role::Admin {
            return Err(LedgerError::Forbidden(format!(
                "role {} may not create companies",
                principal.role
            )));
        }
        let name = input.name.trim().to_string();
        let prefix = input.prefix.trim().to_uppercase();
        if name.is_empty() {
            return Err(LedgerError::Validation("Company name is required".into()));
        }
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LedgerError::Validation(
                "Prefix must be non-empty and alphanumeric".into(),
            ));
        }

        let taken = companies::Entity::find()
            .filter(companies::Column::Prefix.eq(prefix.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(LedgerError::DuplicatePrefix(prefix));
        }

        let company = companies::ActiveModel {
            name: Set(name),
            prefix: Set(prefix.clone()),
            address: Set(input.address),
            contact: Set(input.contact),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| match db_err(err) {
            LedgerError::Conflict(_) => LedgerError::DuplicatePrefix(prefix),
            other => other,
        })?;

        info!(company_id = company.id, prefix = %company.prefix, "Company created");
        Ok(company)
    }

    /// Gets a company the principal may see.
    pub async fn get(
        &self,
        principal: &Principal,
        company_id: i64,
    ) -> Result<companies::Model, LedgerError> {
        if !principal.can_access_company(CompanyId(company_id)) {
            return Err(LedgerError::Forbidden(format!(
                "no access to company {company_id}"
            )));
        }
        companies::Entity::find_by_id(company_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::CompanyNotFound(company_id))
    }
}
