//! Loan types
//!
//! ```text
//! PENDING ──approve──▶ AWAITING_PAYMENT ──repay to zero──▶ PAID
//!    │
//!    └────deny──────▶ DENIED
//! ```

use super::ids::{ClientId, LoanId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Denied,
    AwaitingPayment,
    Paid,
}

impl LoanStatus {
    /// Whether an admin may still approve or deny the loan
    pub fn is_undecided(self) -> bool {
        self == LoanStatus::Pending
    }

    /// Whether repayments are accepted
    pub fn accepts_payments(self) -> bool {
        self == LoanStatus::AwaitingPayment
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Pending => write!(f, "PENDING"),
            LoanStatus::Denied => write!(f, "DENIED"),
            LoanStatus::AwaitingPayment => write!(f, "AWAITING_PAYMENT"),
            LoanStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// A client's loan
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub loan_id: LoanId,

    /// Card number of the borrowing user
    pub borrower: ClientId,

    pub amount_requested: Decimal,

    /// Remaining debt, never negative
    pub amount_outstanding: Decimal,

    pub status: LoanStatus,

    /// When the loan was requested
    pub loan_date: DateTime<Utc>,

    /// When an admin approved or denied it
    pub decided_at: Option<DateTime<Utc>>,

    /// Card number of the deciding admin
    pub decision_by_admin: Option<ClientId>,

    /// Optimistic concurrency counter
    pub version: u64,
}

impl Loan {
    /// Create a pending loan for the full requested amount
    pub fn new(loan_id: LoanId, borrower: ClientId, amount: Decimal, now: DateTime<Utc>) -> Self {
        Loan {
            loan_id,
            borrower,
            amount_requested: amount,
            amount_outstanding: amount,
            status: LoanStatus::Pending,
            loan_date: now,
            decided_at: None,
            decision_by_admin: None,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(LoanStatus::Pending, true, false)]
    #[case(LoanStatus::Denied, false, false)]
    #[case(LoanStatus::AwaitingPayment, false, true)]
    #[case(LoanStatus::Paid, false, false)]
    fn test_status_permissions(
        #[case] status: LoanStatus,
        #[case] undecided: bool,
        #[case] accepts_payments: bool,
    ) {
        assert_eq!(status.is_undecided(), undecided);
        assert_eq!(status.accepts_payments(), accepts_payments);
    }

    #[test]
    fn test_new_loan_is_pending_for_full_amount() {
        let loan = Loan::new(
            LoanId::new("LN-1"),
            ClientId::new("4520000000000001"),
            dec!(500),
            Utc::now(),
        );
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.amount_outstanding, dec!(500));
        assert!(loan.decided_at.is_none());
        assert_eq!(LoanStatus::AwaitingPayment.to_string(), "AWAITING_PAYMENT");
    }
}
