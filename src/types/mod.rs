//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `ids`: Identifier newtypes
//! - `account`: Account record, type and status
//! - `transaction`: Ledger entries
//! - `loan`: Loans and their lifecycle
//! - `party`: Clients, users and roles
//! - `page`: Pagination
//! - `command`: Journal commands replayed by the CLI
//! - `error`: Error types for the ledger

pub mod account;
pub mod command;
pub mod error;
pub mod ids;
pub mod loan;
pub mod page;
pub mod party;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountType};
pub use command::Command;
pub use error::{ErrorKind, LedgerError};
pub use ids::{AccountId, ClientId, LoanId, TransactionId};
pub use loan::{Loan, LoanStatus};
pub use page::{Page, PageRequest, DEFAULT_MAX_PAGE_SIZE};
pub use party::{Capability, Client, Role, User};
pub use transaction::{NewTransaction, Transaction, TransactionType};
