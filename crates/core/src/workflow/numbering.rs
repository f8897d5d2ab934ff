//! Voucher numbering.
//!
//! Voucher numbers are `{prefix}-{sequence}` with a five-digit, zero-padded
//! sequence scoped to the company.

/// Width of the numeric part.
pub const SEQUENCE_WIDTH: usize = 5;

/// Formats a voucher number.
#[must_use]
pub fn format_voucher_no(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence:0SEQUENCE_WIDTH$}")
}

/// First sequence to try for a company that already has `count` vouchers.
#[must_use]
pub fn next_sequence(count: u64) -> i64 {
    i64::try_from(count).map_or(i64::MAX, |count| count.saturating_add(1))
}

/// Extracts the sequence of a voucher number issued under `prefix`.
#[must_use]
pub fn parse_sequence(prefix: &str, voucher_no: &str) -> Option<i64> {
    voucher_no
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Placeholder number used while renumbering, unique per voucher id.
#[must_use]
pub fn temporary_number(voucher_id: i64) -> String {
    format!("~renumber-{voucher_id}")
}

/// Sequential numbers for `current`, which must be sorted by ascending id.
///
/// Returns only the vouchers whose number actually changes, paired with
/// their new number.
#[must_use]
pub fn renumber_plan(prefix: &str, current: &[(i64, String)]) -> Vec<(i64, String)> {
    current
        .iter()
        .zip(1_i64..)
        .filter_map(|((id, existing), sequence)| {
            let wanted = format_voucher_no(prefix, sequence);
            (*existing != wanted).then_some((*id, wanted))
        })
        .collect()
}
