//! Property-based tests for the checkbook frontier.

use proptest::prelude::*;

use super::{CheckbookState, CheckbookStatus, find_advance};

proptest! {
    /// The frontier never moves backwards and never leaves
    /// `[series_start, series_end + 1]`, whatever numbers are used.
    #[test]
    fn prop_frontier_is_monotonic_and_bounded(
        start in 1i64..1000,
        len in 0i64..200,
        used in prop::collection::vec(0i64..1500, 0..60),
    ) {
        let end = start + len;
        let mut book = CheckbookState {
            id: 1,
            series_start: start,
            series_end: end,
            next_check_no: start,
            status: CheckbookStatus::Active,
        };

        for number in used {
            let before = book.next_check_no;
            let check_no = format!("{number:05}");
            if let Some((id, next)) = find_advance(std::slice::from_ref(&book), &check_no) {
                prop_assert_eq!(id, 1);
                book.next_check_no = next;
            }
            prop_assert!(book.next_check_no >= before);
            prop_assert!(book.next_check_no >= start);
            prop_assert!(book.next_check_no <= end + 1);
        }
    }

    /// Using the same number twice moves the frontier at most once.
    #[test]
    fn prop_advance_is_idempotent(start in 1i64..1000, offset in 0i64..100) {
        let book = CheckbookState {
            id: 9,
            series_start: start,
            series_end: start + 100,
            next_check_no: start,
            status: CheckbookStatus::Active,
        };
        let number = (start + offset).to_string();

        let (_, next) = find_advance(std::slice::from_ref(&book), &number).unwrap();
        let advanced = CheckbookState { next_check_no: next, ..book };
        prop_assert_eq!(find_advance(std::slice::from_ref(&advanced), &number), None);
    }
}
