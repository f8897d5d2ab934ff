//! Reconciliation sweep rules.
//!
//! The sweep looks for derived rows that a partial failure left missing and
//! recreates them. This module holds the selection rules and the report;
//! the database crate runs the passes.

use serde::Serialize;

use crate::workflow::types::{CheckStatus, PaymentType, VoucherStatus};

/// One pass of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStep {
    /// Issued check vouchers without a companion check.
    MissingChecks,
    /// Issued encashments without their withdrawal.
    MissingEncashments,
    /// Cleared checks without their withdrawal.
    MissingClearingWithdrawals,
}

impl SweepStep {
    /// Returns the string representation of the step.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingChecks => "missing_checks",
            Self::MissingEncashments => "missing_encashments",
            Self::MissingClearingWithdrawals => "missing_clearing_withdrawals",
        }
    }
}

/// A row the sweep could not repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    /// Pass that failed.
    pub step: SweepStep,
    /// Voucher or check id.
    pub id: i64,
    /// Why.
    pub reason: String,
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Companion checks created.
    pub checks_created: u64,
    /// Encashment withdrawals applied.
    pub encashments_applied: u64,
    /// Clearing withdrawals restored.
    pub withdrawals_restored: u64,
    /// Rows that could not be repaired.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    /// Total number of repaired rows.
    #[must_use]
    pub const fn repaired_count(&self) -> u64 {
        self.checks_created + self.encashments_applied + self.withdrawals_restored
    }

    /// Counts a repair.
    pub const fn record_repair(&mut self, step: SweepStep) {
        match step {
            SweepStep::MissingChecks => self.checks_created += 1,
            SweepStep::MissingEncashments => self.encashments_applied += 1,
            SweepStep::MissingClearingWithdrawals => self.withdrawals_restored += 1,
        }
    }

    /// Records a row that could not be repaired.
    pub fn record_failure(&mut self, step: SweepStep, id: i64, reason: impl Into<String>) {
        self.failures.push(SweepFailure {
            step,
            id,
            reason: reason.into(),
        });
    }
}

fn filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Issued check voucher with details but no companion check.
#[must_use]
pub fn needs_companion_check(
    status: VoucherStatus,
    payment_type: PaymentType,
    check_no: Option<&str>,
    bank_name: Option<&str>,
    has_check: bool,
) -> bool {
    status == VoucherStatus::Issued
        && payment_type == PaymentType::Check
        && filled(check_no)
        && filled(bank_name)
        && !has_check
}

/// Issued encashment with a bank but no linked transaction.
#[must_use]
pub fn needs_encashment_withdrawal(
    status: VoucherStatus,
    payment_type: PaymentType,
    bank_name: Option<&str>,
    has_transaction: bool,
) -> bool {
    status == VoucherStatus::Issued
        && payment_type == PaymentType::Encashment
        && filled(bank_name)
        && !has_transaction
}

/// Cleared check with no withdrawal on its account for its number.
///
/// Encashment checks never get a clearing withdrawal; their money left on
/// issue.
#[must_use]
pub fn needs_clearing_withdrawal(
    status: CheckStatus,
    payment_type: PaymentType,
    has_withdrawal: bool,
) -> bool {
    status == CheckStatus::Cleared && payment_type != PaymentType::Encashment && !has_withdrawal
}
