//! Checkbook allocator.
//!
//! A checkbook is an inclusive range of check numbers on one bank account.
//! `next_check_no` is the frontier: numbers below it are considered used.
//! Putting a number into use only ever moves the frontier forward, and the
//! frontier never passes `series_end + 1`.
//!
//! Check numbers are free text on vouchers and checks (`"00123"`); the
//! allocator works on their numeric value and ignores anything it cannot
//! parse.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::LedgerError;

#[cfg(test)]
mod props;

/// Checkbook status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckbookStatus {
    /// Numbers may be drawn from this checkbook.
    Active,
    /// Retired; ignored by the allocator.
    Closed,
}

impl CheckbookStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for CheckbookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The allocator's view of a checkbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckbookState {
    /// Checkbook id.
    pub id: i64,
    /// First number of the series.
    pub series_start: i64,
    /// Last number of the series (inclusive).
    pub series_end: i64,
    /// Lowest number not yet used.
    pub next_check_no: i64,
    /// Status.
    pub status: CheckbookStatus,
}

impl CheckbookState {
    /// Returns true if `number` falls inside the series.
    #[must_use]
    pub const fn contains(&self, number: i64) -> bool {
        self.series_start <= number && number <= self.series_end
    }

    /// Returns true once every number of the series has been used.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.next_check_no > self.series_end
    }

    /// Frontier after putting `number` into use, if it moves.
    #[must_use]
    pub const fn advance_to(&self, number: i64) -> Option<i64> {
        if self.contains(number) && number >= self.next_check_no {
            number.checked_add(1)
        } else {
            None
        }
    }
}

/// Parses the numeric value of a check number.
///
/// Surrounding whitespace is ignored and leading zeros are dropped
/// (`"00123"` is 123). Returns `None` for empty or non-numeric text.
#[must_use]
pub fn parse_check_number(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Formats `number` zero-padded to the digit count of `series_end`.
#[must_use]
pub fn format_check_number(number: i64, series_end: i64) -> String {
    let width = series_end.to_string().len();
    format!("{number:0width$}")
}

/// Finds the checkbook whose frontier moves when `check_no` is used.
///
/// Only active checkbooks are considered. Returns the checkbook id and the
/// new `next_check_no`, or `None` when nothing needs to change.
#[must_use]
pub fn find_advance(checkbooks: &[CheckbookState], check_no: &str) -> Option<(i64, i64)> {
    let number = parse_check_number(check_no)?;
    checkbooks
        .iter()
        .filter(|book| book.status == CheckbookStatus::Active)
        .find(|book| book.contains(number))
        .and_then(|book| book.advance_to(number).map(|next| (book.id, next)))
}

/// Suggests the next check number for an account.
///
/// Picks the lowest frontier among active checkbooks that still have numbers
/// left. Returns `None` when every checkbook is exhausted or closed.
#[must_use]
pub fn suggest_next(checkbooks: &[CheckbookState]) -> Option<String> {
    checkbooks
        .iter()
        .filter(|book| book.status == CheckbookStatus::Active && !book.is_exhausted())
        .min_by_key(|book| book.next_check_no)
        .map(|book| format_check_number(book.next_check_no, book.series_end))
}

/// Validates the bounds of a new series.
///
/// `series_end` stays below `i64::MAX` so the exhausted frontier
/// `series_end + 1` is representable.
pub fn validate_series(series_start: i64, series_end: i64) -> Result<(), LedgerError> {
    if series_start < 1 || series_start > series_end || series_end == i64::MAX {
        return Err(LedgerError::InvalidSeries {
            start: series_start,
            end: series_end,
        });
    }
    Ok(())
}

/// Returns the first active checkbook whose series overlaps the new range.
#[must_use]
pub fn overlapping<'a>(
    checkbooks: &'a [CheckbookState],
    series_start: i64,
    series_end: i64,
) -> Option<&'a CheckbookState> {
    checkbooks.iter().find(|book| {
        book.status == CheckbookStatus::Active
            && book.series_start <= series_end
            && series_start <= book.series_end
    })
}
