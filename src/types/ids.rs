//! Identifier newtypes
//!
//! Every record kind gets its own identifier type so an account id can never be
//! passed where a loan id is expected. Identifiers are opaque strings; the
//! [`IdGenerator`](crate::core::ids::IdGenerator) in use decides their shape.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Account identifier
    AccountId
);

string_id!(
    /// Client identifier
    ///
    /// Clients are keyed by their 16-digit card number, which is also the
    /// identifier their user login carries.
    ClientId
);

string_id!(
    /// Ledger entry identifier
    TransactionId
);

string_id!(
    /// Loan identifier
    LoanId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_lexicographically() {
        let mut ids = vec![AccountId::new("b"), AccountId::new("a"), AccountId::new("c")];
        ids.sort();
        assert_eq!(ids, vec![AccountId::new("a"), AccountId::new("b"), AccountId::new("c")]);
    }

    #[test]
    fn test_display_is_raw_value() {
        assert_eq!(ClientId::from("4520000000000001").to_string(), "4520000000000001");
        assert_eq!(LoanId::new("LN-7").as_str(), "LN-7");
    }
}
