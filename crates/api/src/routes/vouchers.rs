//! Voucher lifecycle routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use vouchledger_core::storage::AttachmentKind;
use vouchledger_core::workflow::{PaymentType, VoucherFields, VoucherPatch, VoucherStatus};
use vouchledger_db::repositories::{
    AttachmentOutcome, CreateVoucherInput, CreatedVoucher, ForceDeleteReport, StatusChange,
    StatusExtra, VoucherDetails, VoucherUpdate,
};
use vouchledger_shared::types::AmountInput;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the voucher routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vouchers", post(create_voucher))
        .route(
            "/vouchers/{voucher_id}",
            get(get_voucher).patch(update_voucher).delete(delete_voucher),
        )
        .route("/vouchers/{voucher_id}/status", post(change_status))
        .route("/vouchers/{voucher_id}/attachments", post(upload_attachment))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a voucher.
#[derive(Debug, Deserialize)]
pub struct CreateVoucherRequest {
    /// Owning company.
    pub company_id: i64,
    /// Voucher date.
    pub date: NaiveDate,
    /// Payee.
    pub payee: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Amount, as a number or a comma-formatted string.
    pub amount: AmountInput,
    /// Payment type.
    pub payment_type: PaymentType,
    /// Check number.
    #[serde(default)]
    pub check_no: Option<String>,
    /// Bank name.
    #[serde(default)]
    pub bank_name: Option<String>,
    /// Expense category.
    #[serde(default)]
    pub category: Option<String>,
    /// Urgency label.
    #[serde(default)]
    pub urgency: Option<String>,
    /// Deadline.
    #[serde(default)]
    pub deadline_date: Option<NaiveDate>,
    /// Post-dated check flag.
    #[serde(default)]
    pub is_pdc: bool,
    /// Date printed on the check.
    #[serde(default)]
    pub check_date: Option<NaiveDate>,
    /// Date the check was handed over.
    #[serde(default)]
    pub check_issued_date: Option<NaiveDate>,
}

impl CreateVoucherRequest {
    fn into_input(self) -> Result<CreateVoucherInput, ApiError> {
        Ok(CreateVoucherInput {
            company_id: self.company_id,
            fields: VoucherFields {
                date: self.date,
                payee: self.payee,
                description: self.description,
                amount: self.amount.to_decimal()?,
                payment_type: self.payment_type,
                check_no: self.check_no,
                bank_name: self.bank_name,
                category: self.category,
                urgency: self.urgency,
                deadline_date: self.deadline_date,
                is_pdc: self.is_pdc,
                check_date: self.check_date,
                check_issued_date: self.check_issued_date,
            },
        })
    }
}

/// Request body for editing a voucher. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateVoucherRequest {
    date: Option<NaiveDate>,
    payee: Option<String>,
    description: Option<String>,
    amount: Option<AmountInput>,
    payment_type: Option<PaymentType>,
    check_no: Option<String>,
    bank_name: Option<String>,
    category: Option<String>,
    urgency: Option<String>,
    deadline_date: Option<NaiveDate>,
    is_pdc: Option<bool>,
    check_date: Option<NaiveDate>,
    check_issued_date: Option<NaiveDate>,
}

impl UpdateVoucherRequest {
    fn into_patch(self) -> Result<VoucherPatch, ApiError> {
        Ok(VoucherPatch {
            date: self.date,
            payee: self.payee,
            description: self.description,
            amount: self.amount.map(|a| a.to_decimal()).transpose()?,
            payment_type: self.payment_type,
            check_no: self.check_no,
            bank_name: self.bank_name,
            category: self.category,
            urgency: self.urgency,
            deadline_date: self.deadline_date,
            is_pdc: self.is_pdc,
            check_date: self.check_date,
            check_issued_date: self.check_issued_date,
        })
    }
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Requested status, e.g. `"Pending Admin"`.
    pub status: VoucherStatus,
    /// Reason, approver, receiver and clearing date.
    #[serde(flatten)]
    pub extra: StatusExtra,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/vouchers`
async fn create_voucher(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateVoucherRequest>,
) -> Result<(StatusCode, Json<CreatedVoucher>), ApiError> {
    let created = state
        .vouchers()
        .create(&principal, payload.into_input()?)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET `/vouchers/{voucher_id}` - Voucher with its check, postings and history.
async fn get_voucher(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(voucher_id): Path<i64>,
) -> Result<Json<VoucherDetails>, ApiError> {
    Ok(Json(state.vouchers().get(&principal, voucher_id).await?))
}

/// PATCH `/vouchers/{voucher_id}`
async fn update_voucher(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(voucher_id): Path<i64>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> Result<Json<VoucherUpdate>, ApiError> {
    let patch = payload.into_patch()?;
    Ok(Json(
        state.vouchers().update(&principal, voucher_id, patch).await?,
    ))
}

/// POST `/vouchers/{voucher_id}/status`
async fn change_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(voucher_id): Path<i64>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<StatusChange>, ApiError> {
    let change = state
        .vouchers()
        .set_status(&principal, voucher_id, payload.status, payload.extra)
        .await?;
    Ok(Json(change))
}

/// DELETE `/vouchers/{voucher_id}` - Force delete, admin only.
async fn delete_voucher(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(voucher_id): Path<i64>,
) -> Result<Json<ForceDeleteReport>, ApiError> {
    Ok(Json(
        state.vouchers().force_delete(&principal, voucher_id).await?,
    ))
}

/// POST `/vouchers/{voucher_id}/attachments`
///
/// Multipart form with a `kind` text field (`supporting` or `approval`) and a
/// `file` part.
async fn upload_attachment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(voucher_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentOutcome>, ApiError> {
    let mut kind = AttachmentKind::Supporting;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
    {
        match field.name() {
            Some("kind") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?;
                kind = AttachmentKind::parse(&text).ok_or_else(|| {
                    ApiError::validation(format!("Unknown attachment kind: {text}"))
                })?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::validation("A file part is required"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Uploaded file is empty"));
    }

    let outcome = state
        .vouchers()
        .attach_file(
            &principal,
            voucher_id,
            kind,
            &filename,
            &content_type,
            bytes,
            state.storage.as_ref(),
        )
        .await?;
    info!(voucher_id, stored = outcome.stored, "Attachment upload handled");
    Ok(Json(outcome))
}

#[cfg(test)]
mod integration_tests {
    #![allow(clippy::unwrap_used)]

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use rust_decimal_macros::dec;
    use serde_json::json;
    use vouchledger_shared::Role;

    use crate::test_support::{TestApp, dec_of};

    fn check_voucher(company_id: i64) -> serde_json::Value {
        json!({
            "company_id": company_id,
            "date": "2024-02-01",
            "payee": "Juan Dela Cruz",
            "amount": "500.00",
            "payment_type": "Check",
            "check_no": "123",
            "bank_name": "BDO",
            "check_date": "2024-02-05"
        })
    }

    #[tokio::test]
    async fn test_requests_without_token_are_rejected() {
        let app = TestApp::new().await;
        let (status, body) = app.send("GET", "/api/v1/vouchers/1", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "MISSING_TOKEN");

        let (status, body) = app
            .send("GET", "/api/v1/vouchers/1", Some("not-a-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_check_voucher_lifecycle_over_http() {
        let app = TestApp::new().await;
        let (company_id, account_id) = app.seed().await;
        let staff = app.token(3, "Sam Staff", Role::Staff, Some(company_id));
        let liaison = app.token(2, "Lee Liaison", Role::Liaison, Some(company_id));
        let admin = app.admin();

        let (status, created) = app
            .send("POST", "/api/v1/vouchers", Some(&staff), Some(check_voucher(company_id)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["voucher_no"], "ACME-00001");
        assert_eq!(created["status"], "Pending Liaison");
        let voucher_id = created["id"].as_i64().unwrap();
        let status_uri = format!("/api/v1/vouchers/{voucher_id}/status");

        let (status, body) = app
            .send("POST", &status_uri, Some(&staff), Some(json!({ "status": "Pending Admin" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "NOT_PERMITTED");

        let (status, body) = app
            .send("POST", &status_uri, Some(&liaison), Some(json!({ "status": "Pending Admin" })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["voucher"]["certified_by"], "Lee Liaison");

        let (status, body) = app
            .send("POST", &status_uri, Some(&admin), Some(json!({ "status": "Issued" })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["to"], "Issued");
        assert_eq!(body["check"]["status"], "Issued");
        let check_id = body["check"]["id"].as_i64().unwrap();

        let (status, body) = app
            .send(
                "POST",
                &format!("/api/v1/checks/{check_id}/status"),
                Some(&liaison),
                Some(json!({ "status": "Cleared", "date_cleared": "2024-03-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(dec_of(&body["posted"]["new_balance"]), dec!(500));
        assert_eq!(body["voucher"]["status"], "Cleared");

        let (status, account) = app
            .send("GET", &format!("/api/v1/bank-accounts/{account_id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dec_of(&account["current_balance"]), dec!(500));

        let (status, details) = app
            .send("GET", &format!("/api/v1/vouchers/{voucher_id}"), Some(&staff), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["transactions"].as_array().unwrap().len(), 1);
        assert!(details["history"].as_array().unwrap().len() >= 3);
    }

    #[tokio::test]
    async fn test_void_requires_reason() {
        let app = TestApp::new().await;
        let (company_id, _) = app.seed().await;
        let admin = app.admin();

        let (_, created) = app
            .send("POST", "/api/v1/vouchers", Some(&admin), Some(check_voucher(company_id)))
            .await;
        let uri = format!("/api/v1/vouchers/{}/status", created["id"]);

        let (status, body) = app
            .send("POST", &uri, Some(&admin), Some(json!({ "status": "Voided" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VOID_REASON_REQUIRED");

        let (status, body) = app
            .send(
                "POST",
                &uri,
                Some(&admin),
                Some(json!({ "status": "Voided", "void_reason": "Duplicate request" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["voucher"]["void_reason"], "Duplicate request");
    }

    #[tokio::test]
    async fn test_other_company_cannot_read_voucher() {
        let app = TestApp::new().await;
        let (company_id, _) = app.seed().await;
        let admin = app.admin();
        let (_, created) = app
            .send("POST", "/api/v1/vouchers", Some(&admin), Some(check_voucher(company_id)))
            .await;

        let outsider = app.token(9, "Olga Outsider", Role::Staff, Some(company_id + 1));
        let (status, body) = app
            .send("GET", &format!("/api/v1/vouchers/{}", created["id"]), Some(&outsider), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "COMPANY_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_patch_with_formatted_amount() {
        let app = TestApp::new().await;
        let (company_id, _) = app.seed().await;
        let staff = app.token(3, "Sam Staff", Role::Staff, Some(company_id));
        let (_, created) = app
            .send("POST", "/api/v1/vouchers", Some(&staff), Some(check_voucher(company_id)))
            .await;
        let uri = format!("/api/v1/vouchers/{}", created["id"]);

        let (status, body) = app
            .send("PATCH", &uri, Some(&staff), Some(json!({ "amount": "1,250.50" })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["changed"], true);
        assert_eq!(dec_of(&body["voucher"]["amount"]), dec!(1250.50));

        let (status, body) = app
            .send("PATCH", &uri, Some(&staff), Some(json!({ "amount": "abc" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_supporting_attachment() {
        let app = TestApp::new().await;
        let (company_id, _) = app.seed().await;
        let admin = app.admin();
        let (_, created) = app
            .send("POST", "/api/v1/vouchers", Some(&admin), Some(check_voucher(company_id)))
            .await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"kind\"\r\n\r\nsupporting\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"receipt.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/vouchers/{}/attachments", created["id"]))
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, outcome) = app.dispatch(request).await;
        assert_eq!(status, StatusCode::OK, "{outcome}");
        assert_eq!(outcome["stored"], true);
        assert!(outcome["locator"].as_str().unwrap().starts_with("memory://"));
        assert_eq!(app.storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_force_delete_is_admin_only() {
        let app = TestApp::new().await;
        let (company_id, _) = app.seed().await;
        let liaison = app.token(2, "Lee Liaison", Role::Liaison, Some(company_id));
        let (_, created) = app
            .send("POST", "/api/v1/vouchers", Some(&liaison), Some(check_voucher(company_id)))
            .await;
        let uri = format!("/api/v1/vouchers/{}", created["id"]);

        let (status, _) = app.send("DELETE", &uri, Some(&liaison), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, report) = app.send("DELETE", &uri, Some(&app.admin()), None).await;
        assert_eq!(status, StatusCode::OK, "{report}");
        assert_eq!(report["voucher_no"], "ACME-00001");

        let (status, body) = app.send("GET", &uri, Some(&app.admin()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "VOUCHER_NOT_FOUND");
    }
}
