//! Check lifecycle.
//!
//! A check is created `Pending` or `Issued` by voucher approval and then
//! moves through claiming, clearing, bouncing or voiding. Ledger effects are
//! computed from the voucher's *outstanding* amount: withdrawals linked to the
//! voucher minus the deposits that already reversed them. That keeps every
//! reversal single.

use rust_decimal::Decimal;
use serde::Serialize;
use vouchledger_shared::Role;

use crate::ledger::category;
use crate::workflow::error::WorkflowError;
use crate::workflow::permissions;
use crate::workflow::types::{CheckStatus, PaymentType, VoucherStatus};

/// Balance change a check transition asks the ledger for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LedgerEffect {
    /// Nothing to post.
    None,
    /// Post a withdrawal.
    Withdraw {
        /// Amount to withdraw.
        amount: Decimal,
        /// Category stamped on the row.
        category: &'static str,
    },
    /// Post a deposit that undoes earlier withdrawals.
    Reverse {
        /// Amount to deposit back.
        amount: Decimal,
        /// Category stamped on the row.
        category: &'static str,
    },
    /// Post a zero-amount bounce marker.
    BounceMarker,
}

/// A validated check transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckTransition {
    /// Status before.
    pub from: CheckStatus,
    /// Status after.
    pub to: CheckStatus,
    /// Ledger posting to make.
    pub effect: LedgerEffect,
    /// Whether `date_cleared` gets stamped.
    pub stamps_date_cleared: bool,
    /// Status the owning voucher follows to.
    pub voucher_status: Option<VoucherStatus>,
}

/// Stateless check state machine.
pub struct CheckLifecycle;

impl CheckLifecycle {
    /// Status a companion check is created with for a voucher entering `status`.
    #[must_use]
    pub const fn initial_status(status: VoucherStatus) -> Option<CheckStatus> {
        match status {
            VoucherStatus::PendingAdmin => Some(CheckStatus::Pending),
            VoucherStatus::Issued => Some(CheckStatus::Issued),
            _ => None,
        }
    }

    /// Returns true if a check can move from `from` to `to`.
    ///
    /// `Issued` is only reachable through voucher approval and is not part
    /// of this table; see [`CheckLifecycle::issue`].
    #[must_use]
    pub const fn is_valid_transition(from: CheckStatus, to: CheckStatus) -> bool {
        matches!(
            (from, to),
            (CheckStatus::Pending | CheckStatus::Issued, CheckStatus::Claimed)
                | (
                    CheckStatus::Pending | CheckStatus::Issued | CheckStatus::Claimed,
                    CheckStatus::Cleared
                )
                | (
                    CheckStatus::Pending
                        | CheckStatus::Issued
                        | CheckStatus::Claimed
                        | CheckStatus::Cleared,
                    CheckStatus::Bounced
                )
                | (
                    CheckStatus::Pending
                        | CheckStatus::Issued
                        | CheckStatus::Claimed
                        | CheckStatus::Cleared
                        | CheckStatus::Bounced,
                    CheckStatus::Voided
                )
        )
    }

    /// Fails unless `role` may move a check when its voucher is in `voucher`.
    ///
    /// A move that drags the voucher along is held to the voucher's own
    /// rule for that step. Once the voucher is closed its check may still be
    /// voided, but nothing else.
    pub fn authorize(
        role: Role,
        current: CheckStatus,
        target: CheckStatus,
        voucher: VoucherStatus,
        payment_type: PaymentType,
    ) -> Result<(), WorkflowError> {
        if !permissions::can_change_check(role) {
            return Err(WorkflowError::not_permitted(role, "change check status"));
        }
        if current == target {
            return Ok(());
        }
        if !Self::is_valid_transition(current, target) {
            return Err(WorkflowError::InvalidCheckTransition {
                from: current,
                to: target,
            });
        }
        let Some(follows) = target.as_voucher_status() else {
            return Ok(());
        };
        if follows == voucher {
            return Ok(());
        }
        if voucher.is_terminal() {
            return if target == CheckStatus::Voided {
                Ok(())
            } else {
                Err(WorkflowError::InvalidTransition {
                    from: voucher,
                    to: follows,
                })
            };
        }
        permissions::authorize(role, voucher, follows, payment_type)
    }

    /// Plans the move of a check from `current` to `target`.
    ///
    /// `amount` is the check amount and `outstanding` the voucher's net
    /// withdrawn amount. Returns `Ok(None)` when the check already has the
    /// requested status.
    pub fn plan(
        current: CheckStatus,
        target: CheckStatus,
        amount: Decimal,
        outstanding: Decimal,
    ) -> Result<Option<CheckTransition>, WorkflowError> {
        if current == target {
            return Ok(None);
        }
        if !Self::is_valid_transition(current, target) {
            return Err(WorkflowError::InvalidCheckTransition {
                from: current,
                to: target,
            });
        }

        let effect = match target {
            // Encashments withdrew on issue; nothing more leaves the account.
            CheckStatus::Cleared if outstanding > Decimal::ZERO => LedgerEffect::None,
            CheckStatus::Cleared => LedgerEffect::Withdraw {
                amount,
                category: category::CHECK_CLEARED,
            },
            CheckStatus::Bounced if outstanding > Decimal::ZERO => LedgerEffect::Reverse {
                amount: outstanding,
                category: category::BOUNCE_REVERSAL,
            },
            CheckStatus::Bounced => LedgerEffect::BounceMarker,
            CheckStatus::Voided if outstanding > Decimal::ZERO => LedgerEffect::Reverse {
                amount: outstanding,
                category: category::VOID_REFUND,
            },
            _ => LedgerEffect::None,
        };

        Ok(Some(CheckTransition {
            from: current,
            to: target,
            effect,
            stamps_date_cleared: target == CheckStatus::Cleared,
            voucher_status: target.as_voucher_status(),
        }))
    }

    /// Plans issuing a check as part of voucher approval.
    ///
    /// Only `Pending` checks are issued; an already issued check is left as is.
    pub fn issue(current: CheckStatus) -> Result<Option<CheckTransition>, WorkflowError> {
        match current {
            CheckStatus::Pending => Ok(Some(CheckTransition {
                from: current,
                to: CheckStatus::Issued,
                effect: LedgerEffect::None,
                stamps_date_cleared: false,
                voucher_status: None,
            })),
            CheckStatus::Issued => Ok(None),
            _ => Err(WorkflowError::InvalidCheckTransition {
                from: current,
                to: CheckStatus::Issued,
            }),
        }
    }

    /// Ledger effect of voucher-level voiding or bouncing without a check.
    #[must_use]
    pub fn reversal_without_check(target: VoucherStatus, outstanding: Decimal) -> LedgerEffect {
        if outstanding <= Decimal::ZERO {
            return LedgerEffect::None;
        }
        match target {
            VoucherStatus::Voided => LedgerEffect::Reverse {
                amount: outstanding,
                category: category::VOID_REFUND,
            },
            VoucherStatus::Bounced => LedgerEffect::Reverse {
                amount: outstanding,
                category: category::BOUNCE_REVERSAL,
            },
            _ => LedgerEffect::None,
        }
    }

    /// Withdrawal an encashment records when first issued.
    #[must_use]
    pub fn encashment_withdrawal(
        payment_type: PaymentType,
        amount: Decimal,
        outstanding: Decimal,
    ) -> LedgerEffect {
        if payment_type == PaymentType::Encashment && outstanding <= Decimal::ZERO {
            LedgerEffect::Withdraw {
                amount,
                category: category::ENCASHMENT,
            }
        } else {
            LedgerEffect::None
        }
    }
}
