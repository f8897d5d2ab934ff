//! Voucher field edits.
//!
//! A [`VoucherPatch`] is applied to the current [`VoucherFields`] to produce
//! the updated fields plus a per-field change list. An empty change list
//! means the edit is a no-op and nothing is written.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vouchledger_shared::{Principal, types::UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{PaymentType, VoucherStatus};

/// Editable voucher fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherFields {
    /// Voucher date.
    pub date: NaiveDate,
    /// Payee.
    pub payee: String,
    /// Description.
    pub description: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Payment type.
    pub payment_type: PaymentType,
    /// Check number (text, leading zeros kept).
    pub check_no: Option<String>,
    /// Bank name used to resolve the bank account.
    pub bank_name: Option<String>,
    /// Expense category.
    pub category: Option<String>,
    /// Urgency label.
    pub urgency: Option<String>,
    /// Deadline.
    pub deadline_date: Option<NaiveDate>,
    /// Post-dated check flag.
    pub is_pdc: bool,
    /// Date printed on the check.
    pub check_date: Option<NaiveDate>,
    /// Date the check was handed over.
    pub check_issued_date: Option<NaiveDate>,
}

impl VoucherFields {
    /// Validates fields on creation or after a patch.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.payee.trim().is_empty() {
            return Err(WorkflowError::MissingField("payee"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(WorkflowError::Validation(format!(
                "Amount must be greater than zero, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Partial update of a voucher. `None` leaves a field untouched; an empty
/// string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherPatch {
    /// New date.
    pub date: Option<NaiveDate>,
    /// New payee.
    pub payee: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New payment type.
    pub payment_type: Option<PaymentType>,
    /// New check number.
    pub check_no: Option<String>,
    /// New bank name.
    pub bank_name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New urgency.
    pub urgency: Option<String>,
    /// New deadline.
    pub deadline_date: Option<NaiveDate>,
    /// New post-dated flag.
    pub is_pdc: Option<bool>,
    /// New check date.
    pub check_date: Option<NaiveDate>,
    /// New check issued date.
    pub check_issued_date: Option<NaiveDate>,
}

/// One changed field, rendered for the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Field name.
    pub field: &'static str,
    /// Previous value.
    pub from: String,
    /// New value.
    pub to: String,
}

/// Outcome of applying a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChanges {
    /// Fields after the patch.
    pub updated: VoucherFields,
    /// What changed.
    pub changes: Vec<FieldChange>,
}

/// Changes to carry over to the companion check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckUpdate {
    /// New amount.
    pub amount: Option<Decimal>,
    /// New payee.
    pub payee: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New check date.
    pub check_date: Option<Option<NaiveDate>>,
    /// New check number.
    pub check_number: Option<String>,
}

impl CheckUpdate {
    /// Returns true when the check is unaffected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

fn date_text(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn normalized(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl VoucherPatch {
    /// Returns true if the patch sets the check number or the bank name.
    #[must_use]
    pub const fn touches_check_details(&self) -> bool {
        self.check_no.is_some() || self.bank_name.is_some()
    }

    /// Applies the patch to `current`.
    pub fn apply(&self, current: &VoucherFields) -> Result<FieldChanges, WorkflowError> {
        let mut updated = current.clone();
        let mut changes = Vec::new();

        macro_rules! set {
            ($field:ident, $new:expr, $render:expr) => {{
                let new = $new;
                if new != updated.$field {
                    changes.push(FieldChange {
                        field: stringify!($field),
                        from: $render(&updated.$field),
                        to: $render(&new),
                    });
                    updated.$field = new;
                }
            }};
        }

        if let Some(date) = self.date {
            set!(date, date, |d: &NaiveDate| d.to_string());
        }
        if let Some(payee) = &self.payee {
            set!(payee, payee.trim().to_string(), |s: &String| s.clone());
        }
        if let Some(description) = &self.description {
            set!(description, normalized(description), |s: &Option<String>| text(s.as_ref()));
        }
        if let Some(amount) = self.amount {
            set!(amount, amount, |a: &Decimal| a.to_string());
        }
        if let Some(payment_type) = self.payment_type {
            set!(payment_type, payment_type, |p: &PaymentType| p.to_string());
        }
        if let Some(check_no) = &self.check_no {
            set!(check_no, normalized(check_no), |s: &Option<String>| text(s.as_ref()));
        }
        if let Some(bank_name) = &self.bank_name {
            set!(bank_name, normalized(bank_name), |s: &Option<String>| text(s.as_ref()));
        }
        if let Some(category) = &self.category {
            set!(category, normalized(category), |s: &Option<String>| text(s.as_ref()));
        }
        if let Some(urgency) = &self.urgency {
            set!(urgency, normalized(urgency), |s: &Option<String>| text(s.as_ref()));
        }
        if let Some(deadline_date) = self.deadline_date {
            set!(deadline_date, Some(deadline_date), |d: &Option<NaiveDate>| date_text(*d));
        }
        if let Some(is_pdc) = self.is_pdc {
            set!(is_pdc, is_pdc, |b: &bool| b.to_string());
        }
        if let Some(check_date) = self.check_date {
            set!(check_date, Some(check_date), |d: &Option<NaiveDate>| date_text(*d));
        }
        if let Some(check_issued_date) = self.check_issued_date {
            set!(check_issued_date, Some(check_issued_date), |d: &Option<NaiveDate>| date_text(*d));
        }

        updated.validate()?;
        Ok(FieldChanges { updated, changes })
    }
}

impl FieldChanges {
    /// Returns true when the patch changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns true if `field` changed.
    #[must_use]
    pub fn touches(&self, field: &str) -> bool {
        self.changes.iter().any(|change| change.field == field)
    }

    /// History detail, e.g. `amount: 500 -> 750; payee: A -> B`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.changes
            .iter()
            .map(|change| format!("{}: {} -> {}", change.field, change.from, change.to))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Changes the companion check has to follow.
    #[must_use]
    pub fn check_update(&self) -> CheckUpdate {
        let updated = &self.updated;
        CheckUpdate {
            amount: self.touches("amount").then_some(updated.amount),
            payee: self.touches("payee").then(|| updated.payee.clone()),
            description: self
                .touches("description")
                .then(|| updated.description.clone()),
            check_date: self.touches("check_date").then_some(updated.check_date),
            check_number: if self.touches("check_no") {
                updated.check_no.clone()
            } else {
                None
            },
        }
    }
}

/// Fails unless `principal` may apply `patch` to a voucher.
///
/// Preparers may only edit their own vouchers while `Pending Liaison` and
/// never the check number or bank name. Approvers may edit anything that is
/// not voided or rejected.
pub fn authorize_edit(
    principal: &Principal,
    created_by: UserId,
    status: VoucherStatus,
    patch: &VoucherPatch,
) -> Result<(), WorkflowError> {
    if status.is_terminal() {
        return Err(WorkflowError::NotEditable(status));
    }
    if principal.role.is_preparer() {
        if principal.id != created_by {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "edit vouchers created by someone else",
            ));
        }
        if status != VoucherStatus::PendingLiaison {
            return Err(WorkflowError::NotEditable(status));
        }
        if patch.touches_check_details() {
            return Err(WorkflowError::not_permitted(
                principal.role,
                "change check number or bank name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vouchledger_shared::Role;

    fn fields() -> VoucherFields {
        VoucherFields {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            payee: "Juan Dela Cruz".into(),
            description: Some("Office supplies".into()),
            amount: dec!(500),
            payment_type: PaymentType::Check,
            check_no: Some("00123".into()),
            bank_name: Some("BDO".into()),
            category: None,
            urgency: None,
            deadline_date: None,
            is_pdc: false,
            check_date: None,
            check_issued_date: None,
        }
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let changes = VoucherPatch::default().apply(&fields()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.updated, fields());
    }

    #[test]
    fn test_same_values_change_nothing() {
        let patch = VoucherPatch {
            amount: Some(dec!(500.00)),
            payee: Some(" Juan Dela Cruz ".into()),
            ..VoucherPatch::default()
        };
        assert!(patch.apply(&fields()).unwrap().is_empty());
    }

    #[test]
    fn test_summary_lists_changed_fields() {
        let patch = VoucherPatch {
            amount: Some(dec!(750)),
            payee: Some("Maria".into()),
            ..VoucherPatch::default()
        };
        let changes = patch.apply(&fields()).unwrap();
        assert_eq!(
            changes.summary(),
            "payee: Juan Dela Cruz -> Maria; amount: 500 -> 750"
        );
    }

    #[test]
    fn test_empty_string_clears_optional_text() {
        let patch = VoucherPatch {
            description: Some(String::new()),
            ..VoucherPatch::default()
        };
        let changes = patch.apply(&fields()).unwrap();
        assert_eq!(changes.updated.description, None);
        assert!(changes.touches("description"));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let patch = VoucherPatch {
            amount: Some(dec!(0)),
            ..VoucherPatch::default()
        };
        assert!(matches!(
            patch.apply(&fields()),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn test_check_update() {
        let patch = VoucherPatch {
            amount: Some(dec!(600)),
            check_no: Some("00124".into()),
            category: Some("Travel".into()),
            ..VoucherPatch::default()
        };
        let update = patch.apply(&fields()).unwrap().check_update();
        assert_eq!(update.amount, Some(dec!(600)));
        assert_eq!(update.check_number.as_deref(), Some("00124"));
        assert_eq!(update.payee, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_preparer_edit_rules() {
        let staff = Principal::new(UserId(7), "Sam", Role::Staff, None);
        let patch = VoucherPatch {
            payee: Some("Maria".into()),
            ..VoucherPatch::default()
        };

        assert!(authorize_edit(&staff, UserId(7), VoucherStatus::PendingLiaison, &patch).is_ok());
        assert!(authorize_edit(&staff, UserId(8), VoucherStatus::PendingLiaison, &patch).is_err());
        assert!(matches!(
            authorize_edit(&staff, UserId(7), VoucherStatus::PendingAdmin, &patch),
            Err(WorkflowError::NotEditable(VoucherStatus::PendingAdmin))
        ));

        let check_patch = VoucherPatch {
            check_no: Some("00999".into()),
            ..VoucherPatch::default()
        };
        assert!(matches!(
            authorize_edit(&staff, UserId(7), VoucherStatus::PendingLiaison, &check_patch),
            Err(WorkflowError::NotPermitted { .. })
        ));
    }

    #[test]
    fn test_approver_edit_rules() {
        let liaison = Principal::new(UserId(2), "Lia", Role::Liaison, None);
        let patch = VoucherPatch {
            check_no: Some("00999".into()),
            ..VoucherPatch::default()
        };
        assert!(authorize_edit(&liaison, UserId(7), VoucherStatus::Cleared, &patch).is_ok());
        assert!(authorize_edit(&liaison, UserId(7), VoucherStatus::Voided, &patch).is_err());
        assert!(authorize_edit(&liaison, UserId(7), VoucherStatus::Rejected, &patch).is_err());
    }
}
