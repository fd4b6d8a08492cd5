//! Error types for the retail ledger
//!
//! This module defines every error a ledger operation can produce. Each variant
//! carries enough context to explain the rejection to an operator, and
//! [`LedgerError::kind`] collapses the variants into the small taxonomy callers
//! branch on.
//!
//! # Error Categories
//!
//! - **Validation Errors**: non-positive amounts, malformed card/phone numbers, bad account types
//! - **Authorization Errors**: acting on another client's account, paying an admin
//! - **Business Rule Errors**: insufficient funds, illegal loan transitions, protected accounts
//! - **Concurrency Errors**: stale versions and exhausted retries
//! - **Infrastructure Errors**: I/O, CSV parsing, arithmetic overflow, poisoned storage

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
///
/// This is what an outer surface (HTTP layer, CLI report) maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    NotFound,
    Forbidden,
    InsufficientFunds,
    InvalidRequest,
    Conflict,
    Internal,
}

/// Main error type for the ledger
///
/// A rejected operation never leaves partial state behind: every variant is
/// returned before the atomic commit or by the commit itself, which applies
/// nothing when it fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is missing, zero or negative
    #[error("{field} must be greater than zero{}", amount.map(|a| format!(" (got {})", a)).unwrap_or_default())]
    InvalidAmount {
        /// Name of the offending field
        field: String,
        /// The rejected value, `None` when the amount was absent
        amount: Option<Decimal>,
    },

    /// A referenced record does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of record (account, client, loan, ...)
        resource: String,
        /// Identifier that was looked up
        id: String,
    },

    /// The caller is not allowed to perform the operation
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Why the request was refused
        reason: String,
    },

    /// The recipient of a transfer may not receive money
    #[error("Transfers to administrator accounts are not allowed (recipient {phone})")]
    ForbiddenRecipient {
        /// Phone number the sender targeted
        phone: String,
    },

    /// Balance does not cover the requested debit
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Account that would be overdrawn
        account: String,
        /// Current balance
        available: Decimal,
        /// Amount the operation needs (fee included)
        requested: Decimal,
    },

    /// The request is structurally valid but makes no sense
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Description of the problem
        reason: String,
    },

    /// Account type string is neither Chequing nor Savings
    #[error("Invalid account type '{value}': expected Chequing or Savings")]
    InvalidAccountType {
        /// The rejected value
        value: String,
    },

    /// Money cannot move through an inactive account
    #[error("Account {account} is inactive")]
    AccountInactive {
        /// The inactive account
        account: String,
    },

    /// Loan is not in a state that permits the operation
    #[error("Cannot {operation} loan {loan} in status {status}")]
    InvalidLoanState {
        /// Loan identifier
        loan: String,
        /// Current loan status
        status: String,
        /// Operation that was attempted
        operation: String,
    },

    /// A record changed between read and commit
    #[error("Concurrent modification of {resource}: expected version {expected}, found {actual}")]
    Conflict {
        /// Record that changed
        resource: String,
        /// Version the writer read
        expected: u64,
        /// Version found at commit time
        actual: u64,
    },

    /// Every retry of a conflicting operation lost the race
    #[error("{operation} gave up after {attempts} conflicting attempts")]
    RetriesExhausted {
        /// Operation that was retried
        operation: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account affected
        account: String,
    },

    /// Storage is unusable (a lock was poisoned by a panicking writer)
    #[error("Storage failure: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// This is a recoverable error - the malformed record is skipped
    /// and processing continues with the next record.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl LedgerError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Forbidden { .. } | LedgerError::ForbiddenRecipient { .. } => {
                ErrorKind::Forbidden
            }
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InvalidRequest { .. }
            | LedgerError::InvalidAccountType { .. }
            | LedgerError::AccountInactive { .. }
            | LedgerError::InvalidLoanState { .. }
            | LedgerError::ParseError { .. } => ErrorKind::InvalidRequest,
            LedgerError::Conflict { .. } | LedgerError::RetriesExhausted { .. } => {
                ErrorKind::Conflict
            }
            LedgerError::ArithmeticOverflow { .. }
            | LedgerError::Storage { .. }
            | LedgerError::IoError { .. } => ErrorKind::Internal,
        }
    }

    /// Whether retrying the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(field: &str, amount: Option<Decimal>) -> Self {
        LedgerError::InvalidAmount {
            field: field.to_string(),
            amount,
        }
    }

    /// Create a NotFound error
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a Forbidden error
    pub fn forbidden(reason: impl Into<String>) -> Self {
        LedgerError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create a ForbiddenRecipient error
    pub fn forbidden_recipient(phone: &str) -> Self {
        LedgerError::ForbiddenRecipient {
            phone: phone.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        account: impl ToString,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientFunds {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        LedgerError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create an InvalidAccountType error
    pub fn invalid_account_type(value: &str) -> Self {
        LedgerError::InvalidAccountType {
            value: value.to_string(),
        }
    }

    /// Create an AccountInactive error
    pub fn account_inactive(account: impl ToString) -> Self {
        LedgerError::AccountInactive {
            account: account.to_string(),
        }
    }

    /// Create an InvalidLoanState error
    pub fn invalid_loan_state(loan: impl ToString, status: impl ToString, operation: &str) -> Self {
        LedgerError::InvalidLoanState {
            loan: loan.to_string(),
            status: status.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(resource: impl ToString, expected: u64, actual: u64) -> Self {
        LedgerError::Conflict {
            resource: resource.to_string(),
            expected,
            actual,
        }
    }

    /// Create a RetriesExhausted error
    pub fn retries_exhausted(operation: &str, attempts: u32) -> Self {
        LedgerError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: impl ToString) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}
