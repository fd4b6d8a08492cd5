//! Retail Ledger Library
//! # Overview
//!
//! Core of a retail banking ledger: clients hold Chequing and Savings accounts,
//! move money between them or to other clients by phone number, and take out
//! loans decided by administrators. Every balance change is recorded as an
//! immutable ledger entry committed atomically with it.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, Transaction, Loan, errors, ...)
//! - [`core`] - Business logic:
//!   - [`core::validation`] - Request checks
//!   - [`core::engine`] - Deposits, transfers and ledger queries
//!   - [`core::loans`] - Loan request, decision and repayment
//!   - [`core::accounts`] - Opening, renaming and closing accounts
//!   - [`core::memory_store`] - Thread-safe in-memory accounts, ledger and loans
//! - [`io`] - Journal CSV parsing and output
//! - [`strategy`] - Sync and async journal replay
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - tracing subscriber setup
//!
//! # Money rules
//!
//! - Amounts are `rust_decimal::Decimal` and must be positive
//! - A debit never takes a balance below zero; fees count towards the debit
//! - Internal transfers out of Savings pay a 1.5% fee, rounded to cents
//! - Transfers by phone land in the recipient's original account and are free
//!
//! # Example
//!
//! ```
//! use retail_ledger::core::{Ledger, NewClient};
//! use retail_ledger::types::Role;
//! use rust_decimal::Decimal;
//!
//! let ledger = Ledger::builder().build();
//! let (client, account) = ledger
//!     .registrar
//!     .register(NewClient::anonymous("4520111122223333", "4165550101"), Role::Client)
//!     .unwrap();
//! ledger
//!     .engine
//!     .deposit(&client.client_id, &account.account_id, Decimal::new(100, 0))
//!     .unwrap();
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{Ledger, TransactionEngine};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, AccountType, ClientId, LedgerError, Loan, LoanStatus, Transaction,
    TransactionId, TransactionType,
};
