//! Voucher lifecycle.
//!
//! [`VoucherWorkflow`] validates a requested status change against the
//! permission table and returns the side effects the persistence layer has
//! to carry out, in order, inside one database transaction.

use serde::Serialize;
use vouchledger_shared::{Principal, Role, types::CompanyId};

use crate::workflow::check::CheckLifecycle;
use crate::workflow::error::WorkflowError;
use crate::workflow::permissions;
use crate::workflow::types::{CheckStatus, PaymentType, VoucherStatus};

/// Approval stamp written on the voucher by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stamp {
    /// No stamp.
    None,
    /// `certified_by` is set to the actor.
    CertifiedBy,
    /// `approved_by` is set to the actor (or a supplied name).
    ApprovedBy,
}

/// Side effect of a voucher entering a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoucherEffect {
    /// Create the companion check with this status.
    CreateCheck(CheckStatus),
    /// Flip the pending companion check to `Issued`.
    IssueCheck,
    /// Move the checkbook frontier past the voucher's check number.
    AdvanceCheckbook,
    /// Withdraw an encashment's amount from its bank account.
    RecordEncashment,
    /// Move the companion check; its lifecycle owns the ledger effect.
    DelegateToCheck(CheckStatus),
    /// Reverse whatever is still withdrawn for the voucher.
    ReverseOutstanding,
}

/// What is known about a voucher when planning a transition.
#[derive(Debug, Clone, Copy)]
pub struct VoucherFacts {
    /// Voucher id.
    pub id: i64,
    /// Current status.
    pub status: VoucherStatus,
    /// Payment type.
    pub payment_type: PaymentType,
    /// Whether a check number is filled in.
    pub has_check_number: bool,
    /// Whether a bank name is filled in.
    pub has_bank_name: bool,
    /// Status of the companion check, if one exists.
    pub check_status: Option<CheckStatus>,
}

impl VoucherFacts {
    fn has_check_details(&self) -> bool {
        self.payment_type.uses_check() && self.has_check_number && self.has_bank_name
    }
}

/// A validated voucher transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoucherTransition {
    /// Status before.
    pub from: VoucherStatus,
    /// Status after; may differ from the requested one for certification.
    pub to: VoucherStatus,
    /// Approval stamp to write.
    pub stamp: Stamp,
    /// Side effects, in execution order.
    pub effects: Vec<VoucherEffect>,
}

/// Stateless voucher state machine.
pub struct VoucherWorkflow;

impl VoucherWorkflow {
    /// Status a new voucher starts in.
    ///
    /// Preparers start at `Pending Liaison`. A liaison's own voucher is
    /// certified on creation, an admin's is approved on creation.
    #[must_use]
    pub const fn initial_status(role: Role, payment_type: PaymentType) -> VoucherStatus {
        match role {
            Role::Staff | Role::Hr => VoucherStatus::PendingLiaison,
            Role::Liaison if payment_type.uses_check() => VoucherStatus::PendingAdmin,
            Role::Liaison | Role::Admin => VoucherStatus::Issued,
        }
    }

    /// Stamp written when `role` creates a voucher.
    #[must_use]
    pub const fn creation_stamp(role: Role) -> Stamp {
        match role {
            Role::Staff | Role::Hr => Stamp::None,
            Role::Liaison => Stamp::CertifiedBy,
            Role::Admin => Stamp::ApprovedBy,
        }
    }

    /// Fails unless `principal` may act on records of `company_id`.
    pub fn authorize_company(
        principal: &Principal,
        company_id: CompanyId,
    ) -> Result<(), WorkflowError> {
        if principal.can_access_company(company_id) {
            Ok(())
        } else {
            Err(WorkflowError::CompanyAccessDenied(company_id.into_inner()))
        }
    }

    /// Effective target for a requested status.
    ///
    /// Certification accepts either `Pending Admin` or `Issued` and lets the
    /// payment type decide.
    #[must_use]
    pub const fn resolve_target(
        current: VoucherStatus,
        requested: VoucherStatus,
        payment_type: PaymentType,
    ) -> VoucherStatus {
        match (current, requested) {
            (
                VoucherStatus::PendingLiaison,
                VoucherStatus::PendingAdmin | VoucherStatus::Issued,
            ) => {
                if payment_type.uses_check() {
                    VoucherStatus::PendingAdmin
                } else {
                    VoucherStatus::Issued
                }
            }
            _ => requested,
        }
    }

    /// Plans a status change requested by `role`.
    pub fn plan(
        role: Role,
        facts: &VoucherFacts,
        requested: VoucherStatus,
        void_reason: Option<&str>,
    ) -> Result<VoucherTransition, WorkflowError> {
        let current = facts.status;
        let to = Self::resolve_target(current, requested, facts.payment_type);

        if current.is_terminal() || current == to {
            return Err(WorkflowError::InvalidTransition { from: current, to });
        }
        permissions::authorize(role, current, to, facts.payment_type)?;
        if to == VoucherStatus::Voided && void_reason.is_none_or(|r| r.trim().is_empty()) {
            return Err(WorkflowError::VoidReasonRequired);
        }

        let stamp = match (current, to) {
            (
                VoucherStatus::PendingLiaison,
                VoucherStatus::PendingAdmin | VoucherStatus::Issued,
            ) => Stamp::CertifiedBy,
            (VoucherStatus::PendingAdmin, VoucherStatus::Issued) => Stamp::ApprovedBy,
            _ => Stamp::None,
        };

        Ok(VoucherTransition {
            from: current,
            to,
            stamp,
            effects: Self::entry_effects(facts, to)?,
        })
    }

    /// Side effects of `facts` entering `to`.
    ///
    /// Also used on creation, where the voucher enters its initial status.
    pub fn entry_effects(
        facts: &VoucherFacts,
        to: VoucherStatus,
    ) -> Result<Vec<VoucherEffect>, WorkflowError> {
        let mut effects = Vec::new();
        let delegated = matches!(
            to,
            VoucherStatus::Claimed
                | VoucherStatus::Cleared
                | VoucherStatus::Bounced
                | VoucherStatus::Voided
        );

        if facts.payment_type.uses_check() && delegated {
            if let (Some(check), Some(target)) = (facts.check_status, to.as_check_status()) {
                if check != target && !CheckLifecycle::is_valid_transition(check, target) {
                    return Err(WorkflowError::InvalidCheckTransition {
                        from: check,
                        to: target,
                    });
                }
                effects.push(VoucherEffect::DelegateToCheck(target));
                return Ok(effects);
            }
            if matches!(to, VoucherStatus::Claimed | VoucherStatus::Cleared) {
                return Err(WorkflowError::CompanionCheckMissing(facts.id));
            }
        }

        match to {
            VoucherStatus::PendingAdmin => {
                if facts.has_check_details() && facts.check_status.is_none() {
                    effects.push(VoucherEffect::CreateCheck(CheckStatus::Pending));
                }
            }
            VoucherStatus::Issued => {
                if facts.has_check_details() {
                    match facts.check_status {
                        None => effects.push(VoucherEffect::CreateCheck(CheckStatus::Issued)),
                        Some(CheckStatus::Pending) => effects.push(VoucherEffect::IssueCheck),
                        Some(_) => {}
                    }
                    effects.push(VoucherEffect::AdvanceCheckbook);
                }
                if facts.payment_type == PaymentType::Encashment && facts.has_bank_name {
                    effects.push(VoucherEffect::RecordEncashment);
                }
            }
            VoucherStatus::Bounced | VoucherStatus::Voided => {
                effects.push(VoucherEffect::ReverseOutstanding);
            }
            _ => {}
        }

        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn facts(status: VoucherStatus, payment_type: PaymentType) -> VoucherFacts {
        VoucherFacts {
            id: 1,
            status,
            payment_type,
            has_check_number: true,
            has_bank_name: true,
            check_status: None,
        }
    }

    #[rstest]
    #[case(Role::Staff, PaymentType::Check, VoucherStatus::PendingLiaison)]
    #[case(Role::Hr, PaymentType::Cash, VoucherStatus::PendingLiaison)]
    #[case(Role::Liaison, PaymentType::Check, VoucherStatus::PendingAdmin)]
    #[case(Role::Liaison, PaymentType::Encashment, VoucherStatus::PendingAdmin)]
    #[case(Role::Liaison, PaymentType::PettyCash, VoucherStatus::Issued)]
    #[case(Role::Admin, PaymentType::Check, VoucherStatus::Issued)]
    fn test_initial_status(
        #[case] role: Role,
        #[case] payment_type: PaymentType,
        #[case] expected: VoucherStatus,
    ) {
        assert_eq!(VoucherWorkflow::initial_status(role, payment_type), expected);
    }

    #[test]
    fn test_liaison_certifies_check_voucher_to_pending_admin() {
        let plan = VoucherWorkflow::plan(
            Role::Liaison,
            &facts(VoucherStatus::PendingLiaison, PaymentType::Check),
            VoucherStatus::Issued,
            None,
        )
        .unwrap();
        assert_eq!(plan.to, VoucherStatus::PendingAdmin);
        assert_eq!(plan.stamp, Stamp::CertifiedBy);
        assert_eq!(
            plan.effects,
            vec![VoucherEffect::CreateCheck(CheckStatus::Pending)]
        );
    }

    #[test]
    fn test_liaison_certifies_cash_voucher_to_issued() {
        let plan = VoucherWorkflow::plan(
            Role::Liaison,
            &facts(VoucherStatus::PendingLiaison, PaymentType::Cash),
            VoucherStatus::PendingAdmin,
            None,
        )
        .unwrap();
        assert_eq!(plan.to, VoucherStatus::Issued);
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_admin_approval_issues_pending_check() {
        let mut voucher = facts(VoucherStatus::PendingAdmin, PaymentType::Check);
        voucher.check_status = Some(CheckStatus::Pending);

        let plan =
            VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Issued, None).unwrap();
        assert_eq!(plan.stamp, Stamp::ApprovedBy);
        assert_eq!(
            plan.effects,
            vec![VoucherEffect::IssueCheck, VoucherEffect::AdvanceCheckbook]
        );
    }

    #[test]
    fn test_encashment_issue_records_withdrawal() {
        let voucher = facts(VoucherStatus::PendingAdmin, PaymentType::Encashment);
        let plan =
            VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Issued, None).unwrap();
        assert_eq!(
            plan.effects,
            vec![
                VoucherEffect::CreateCheck(CheckStatus::Issued),
                VoucherEffect::AdvanceCheckbook,
                VoucherEffect::RecordEncashment,
            ]
        );
    }

    #[test]
    fn test_liaison_cannot_give_final_approval() {
        let err = VoucherWorkflow::plan(
            Role::Liaison,
            &facts(VoucherStatus::PendingAdmin, PaymentType::Check),
            VoucherStatus::Issued,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::NotPermitted { .. }));
    }

    #[test]
    fn test_staff_cannot_certify() {
        let err = VoucherWorkflow::plan(
            Role::Staff,
            &facts(VoucherStatus::PendingLiaison, PaymentType::Cash),
            VoucherStatus::Issued,
            None,
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[rstest]
    #[case(VoucherStatus::Rejected, VoucherStatus::Issued)]
    #[case(VoucherStatus::Voided, VoucherStatus::Bounced)]
    #[case(VoucherStatus::Issued, VoucherStatus::Issued)]
    #[case(VoucherStatus::Cleared, VoucherStatus::PendingLiaison)]
    fn test_invalid_transitions(#[case] from: VoucherStatus, #[case] to: VoucherStatus) {
        let err = VoucherWorkflow::plan(Role::Admin, &facts(from, PaymentType::Cash), to, Some("x"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn test_void_requires_reason() {
        let voucher = facts(VoucherStatus::Issued, PaymentType::Cash);
        let err = VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Voided, Some("  "))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::VoidReasonRequired));

        let plan =
            VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Voided, Some("duplicate"))
                .unwrap();
        assert_eq!(plan.effects, vec![VoucherEffect::ReverseOutstanding]);
    }

    #[test]
    fn test_check_voucher_delegates_to_check() {
        let mut voucher = facts(VoucherStatus::Issued, PaymentType::Check);
        voucher.check_status = Some(CheckStatus::Issued);

        let plan =
            VoucherWorkflow::plan(Role::Liaison, &voucher, VoucherStatus::Cleared, None).unwrap();
        assert_eq!(
            plan.effects,
            vec![VoucherEffect::DelegateToCheck(CheckStatus::Cleared)]
        );
    }

    #[test]
    fn test_check_voucher_without_check_cannot_clear() {
        let mut voucher = facts(VoucherStatus::Issued, PaymentType::Check);
        voucher.has_check_number = false;
        let err = VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Cleared, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CompanionCheckMissing(1)));
    }

    #[test]
    fn test_void_bounced_check_voucher() {
        let mut voucher = facts(VoucherStatus::Bounced, PaymentType::Check);
        voucher.check_status = Some(CheckStatus::Bounced);
        let plan =
            VoucherWorkflow::plan(Role::Admin, &voucher, VoucherStatus::Voided, Some("returned"))
                .unwrap();
        assert_eq!(
            plan.effects,
            vec![VoucherEffect::DelegateToCheck(CheckStatus::Voided)]
        );
    }

    #[test]
    fn test_company_scope() {
        use vouchledger_shared::types::UserId;

        let bound = Principal::new(UserId(1), "Ana", Role::Liaison, Some(CompanyId(1)));
        assert!(VoucherWorkflow::authorize_company(&bound, CompanyId(1)).is_ok());
        assert!(matches!(
            VoucherWorkflow::authorize_company(&bound, CompanyId(2)),
            Err(WorkflowError::CompanyAccessDenied(2))
        ));

        let global_liaison = Principal::new(UserId(2), "Ben", Role::Liaison, None);
        assert!(VoucherWorkflow::authorize_company(&global_liaison, CompanyId(1)).is_err());

        let global_admin = Principal::new(UserId(3), "Cy", Role::Admin, None);
        assert!(VoucherWorkflow::authorize_company(&global_admin, CompanyId(1)).is_ok());
    }
}
