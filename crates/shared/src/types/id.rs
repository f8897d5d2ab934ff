//! Typed IDs for type-safe entity references.
//!
//! Every table uses an auto-increment integer key so that ties on
//! `transaction_date` are broken by insertion order. Typed wrappers prevent
//! passing a `CheckId` where a `VoucherId` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the inner integer.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user (issued by the identity provider).");
typed_id!(CompanyId, "Unique identifier for a company.");
typed_id!(BankAccountId, "Unique identifier for a bank account.");
typed_id!(CheckbookId, "Unique identifier for a checkbook.");
typed_id!(VoucherId, "Unique identifier for a disbursement voucher.");
typed_id!(CheckId, "Unique identifier for a check.");
typed_id!(BankTransactionId, "Unique identifier for a bank transaction.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_roundtrip() {
        let id = VoucherId::from(42);
        assert_eq!(id.into_inner(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(VoucherId::from_str(" 42 ").unwrap(), id);
        assert!(CheckId::from_str("abc").is_err());
    }

    #[test]
    fn test_typed_id_ordering() {
        assert!(BankTransactionId(1) < BankTransactionId(2));
    }

    #[test]
    fn test_typed_id_serde_transparent() {
        let json = serde_json::to_string(&BankAccountId(9)).unwrap();
        assert_eq!(json, "9");
        let back: BankAccountId = serde_json::from_str("9").unwrap();
        assert_eq!(back, BankAccountId(9));
    }
}
