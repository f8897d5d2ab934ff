//! Role-gated transition table.
//!
//! Every voucher transition a role may request is listed once in
//! [`VOUCHER_RULES`]. Both lifecycles consult this table; nothing else in
//! the crate branches on roles for status changes.

use vouchledger_shared::Role;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{PaymentType, VoucherStatus};

/// Which payment types a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentScope {
    /// Every payment type.
    Any,
    /// Check and encashment vouchers.
    CheckOnly,
    /// Every payment type without a companion check.
    NonCheck,
}

impl PaymentScope {
    /// Returns true if the scope covers `payment_type`.
    #[must_use]
    pub const fn covers(self, payment_type: PaymentType) -> bool {
        match self {
            Self::Any => true,
            Self::CheckOnly => payment_type.uses_check(),
            Self::NonCheck => !payment_type.uses_check(),
        }
    }
}

/// One permitted transition.
#[derive(Debug, Clone, Copy)]
pub struct PermissionRule {
    /// Roles allowed to request it.
    pub roles: &'static [Role],
    /// Statuses it may start from.
    pub from: &'static [VoucherStatus],
    /// Status it leads to.
    pub to: VoucherStatus,
    /// Payment types it applies to.
    pub scope: PaymentScope,
}

impl PermissionRule {
    fn matches(&self, from: VoucherStatus, to: VoucherStatus, payment_type: PaymentType) -> bool {
        self.to == to && self.from.contains(&from) && self.scope.covers(payment_type)
    }
}

const APPROVERS: &[Role] = &[Role::Admin, Role::Liaison];
const ADMIN: &[Role] = &[Role::Admin];

use VoucherStatus::{
    Bounced, Claimed, Cleared, Issued, PendingAdmin, PendingLiaison, Rejected, Voided,
};

/// Voucher transition table.
pub const VOUCHER_RULES: &[PermissionRule] = &[
    // Certification
    PermissionRule {
        roles: APPROVERS,
        from: &[PendingLiaison],
        to: PendingAdmin,
        scope: PaymentScope::CheckOnly,
    },
    PermissionRule {
        roles: APPROVERS,
        from: &[PendingLiaison],
        to: Issued,
        scope: PaymentScope::NonCheck,
    },
    PermissionRule {
        roles: APPROVERS,
        from: &[PendingLiaison],
        to: Rejected,
        scope: PaymentScope::Any,
    },
    // Final approval
    PermissionRule {
        roles: ADMIN,
        from: &[PendingAdmin],
        to: Issued,
        scope: PaymentScope::CheckOnly,
    },
    PermissionRule {
        roles: ADMIN,
        from: &[PendingAdmin],
        to: Rejected,
        scope: PaymentScope::Any,
    },
    // Payout; check payments move through their companion check
    PermissionRule {
        roles: APPROVERS,
        from: &[Issued],
        to: Claimed,
        scope: PaymentScope::Any,
    },
    PermissionRule {
        roles: APPROVERS,
        from: &[Issued, Claimed],
        to: Cleared,
        scope: PaymentScope::Any,
    },
    // Cancellation
    PermissionRule {
        roles: APPROVERS,
        from: &[PendingLiaison, PendingAdmin, Issued, Claimed, Cleared, Bounced],
        to: Voided,
        scope: PaymentScope::Any,
    },
    PermissionRule {
        roles: APPROVERS,
        from: &[PendingLiaison, PendingAdmin, Issued, Claimed, Cleared],
        to: Bounced,
        scope: PaymentScope::Any,
    },
];

/// Roles that may change a check's status.
pub const CHECK_ROLES: &[Role] = APPROVERS;

/// Returns true if `role` may move a voucher from `from` to `to`.
#[must_use]
pub fn is_allowed(
    role: Role,
    from: VoucherStatus,
    to: VoucherStatus,
    payment_type: PaymentType,
) -> bool {
    VOUCHER_RULES
        .iter()
        .any(|rule| rule.roles.contains(&role) && rule.matches(from, to, payment_type))
}

/// Returns true if any role may move a voucher from `from` to `to`.
#[must_use]
pub fn is_defined(from: VoucherStatus, to: VoucherStatus, payment_type: PaymentType) -> bool {
    VOUCHER_RULES
        .iter()
        .any(|rule| rule.matches(from, to, payment_type))
}

/// Fails unless `role` may move a voucher from `from` to `to`.
///
/// Transitions no role may make are invalid; the rest are refused as not
/// permitted.
pub fn authorize(
    role: Role,
    from: VoucherStatus,
    to: VoucherStatus,
    payment_type: PaymentType,
) -> Result<(), WorkflowError> {
    if is_allowed(role, from, to, payment_type) {
        return Ok(());
    }
    Err(if is_defined(from, to, payment_type) {
        WorkflowError::not_permitted(role, format!("move vouchers from {from} to {to}"))
    } else {
        WorkflowError::InvalidTransition { from, to }
    })
}

/// Statuses `role` may request from `from`.
#[must_use]
pub fn allowed_targets(
    role: Role,
    from: VoucherStatus,
    payment_type: PaymentType,
) -> Vec<VoucherStatus> {
    VoucherStatus::ALL
        .into_iter()
        .filter(|to| is_allowed(role, from, *to, payment_type))
        .collect()
}

/// Returns true if `role` may change check statuses.
#[must_use]
pub fn can_change_check(role: Role) -> bool {
    CHECK_ROLES.contains(&role)
}
