//! Identifier generation
//!
//! Production uses random UUIDs; tests and journal replays use
//! [`SequentialIds`] so that generated identifiers are predictable.

use crate::types::{AccountId, LoanId, TransactionId};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn account_id(&self) -> AccountId;
    fn transaction_id(&self) -> TransactionId;
    fn loan_id(&self) -> LoanId;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn account_id(&self) -> AccountId {
        AccountId::new(Uuid::new_v4().to_string())
    }

    fn transaction_id(&self) -> TransactionId {
        TransactionId::new(Uuid::new_v4().to_string())
    }

    fn loan_id(&self) -> LoanId {
        LoanId::new(Uuid::new_v4().to_string())
    }
}

/// Zero-padded counters per record kind (`ACC-000001`, `TXN-000001`, `LN-000001`)
///
/// The padding keeps lexicographic order equal to creation order.
#[derive(Debug, Default)]
pub struct SequentialIds {
    accounts: AtomicU64,
    transactions: AtomicU64,
    loans: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(counter: &AtomicU64, prefix: &str) -> String {
        format!("{}-{:06}", prefix, counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl IdGenerator for SequentialIds {
    fn account_id(&self) -> AccountId {
        AccountId::new(Self::next(&self.accounts, "ACC"))
    }

    fn transaction_id(&self) -> TransactionId {
        TransactionId::new(Self::next(&self.transactions, "TXN"))
    }

    fn loan_id(&self) -> LoanId {
        LoanId::new(Self::next(&self.loans, "LN"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_count_per_kind() {
        let ids = SequentialIds::new();
        assert_eq!(ids.account_id().as_str(), "ACC-000001");
        assert_eq!(ids.account_id().as_str(), "ACC-000002");
        assert_eq!(ids.transaction_id().as_str(), "TXN-000001");
        assert_eq!(ids.loan_id().as_str(), "LN-000001");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.transaction_id(), ids.transaction_id());
        assert_eq!(ids.account_id().as_str().len(), 36);
    }
}
