//! Router fixtures for the handler integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use tower::ServiceExt;
use vouchledger_core::storage::MemoryBlobStore;
use vouchledger_db::LedgerLocks;
use vouchledger_db::migration::{Migrator, MigratorTrait};
use vouchledger_shared::{JwtConfig, JwtService, Role};

use crate::{AppState, create_router};

/// A migrated in-memory database behind the full router.
pub struct TestApp {
    pub router: Router,
    pub jwt: Arc<JwtService>,
    pub storage: MemoryBlobStore,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let jwt = Arc::new(JwtService::new(JwtConfig::default()));
        let storage = MemoryBlobStore::new();
        let state = AppState {
            db: Arc::new(db),
            jwt_service: jwt.clone(),
            locks: LedgerLocks::new(),
            storage: Arc::new(storage.clone()),
            request_timeout: Duration::from_secs(30),
        };
        Self {
            router: create_router(state),
            jwt,
            storage,
        }
    }

    pub fn token(&self, id: i64, name: &str, role: Role, company: Option<i64>) -> String {
        self.jwt
            .generate_access_token(id, name, role, company)
            .unwrap()
    }

    pub fn admin(&self) -> String {
        self.token(1, "Ada Admin", Role::Admin, None)
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Creates company ACME with a BDO account holding 1000 and a 100..=200
    /// checkbook. Returns `(company_id, account_id)`.
    pub async fn seed(&self) -> (i64, i64) {
        let admin = self.admin();
        let (status, company) = self
            .send(
                "POST",
                "/api/v1/companies",
                Some(&admin),
                Some(serde_json::json!({ "name": "Acme Trading", "prefix": "ACME" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{company}");
        let company_id = company["id"].as_i64().unwrap();

        let (status, account) = self
            .send(
                "POST",
                "/api/v1/bank-accounts",
                Some(&admin),
                Some(serde_json::json!({
                    "company_id": company_id,
                    "bank_name": "BDO",
                    "account_number": "0012-3456",
                    "initial_balance": "1,000.00",
                    "opened_on": "2024-01-01"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{account}");
        let account_id = account["id"].as_i64().unwrap();

        let (status, _) = self
            .send(
                "POST",
                &format!("/api/v1/bank-accounts/{account_id}/checkbooks"),
                Some(&admin),
                Some(serde_json::json!({ "series_start": 100, "series_end": 200 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (company_id, account_id)
    }
}

/// Reads a decimal that serialized as a JSON string.
pub fn dec_of(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
        .parse()
        .unwrap()
}
