//! Core traits for persistence and external collaborators
//!
//! The engine only talks to storage, the client/user directory and the
//! notification channel through these traits, so an in-memory implementation
//! (used by the CLI and tests) and a database-backed one are interchangeable.
//! All implementations must be `Send + Sync`: one engine instance serves many
//! threads at once.

use crate::core::notify::{Notification, NotificationError};
use crate::types::{
    Account, AccountId, Client, ClientId, LedgerError, Loan, LoanId, LoanStatus, NewTransaction,
    Page, PageRequest, Transaction, TransactionId, User,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// New balance for one account, valid only if the account is still at `expected_version`
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub expected_version: u64,
    pub new_balance: Decimal,
}

/// New state for one loan, valid only if the loan is still at `expected_version`
#[derive(Debug, Clone, PartialEq)]
pub struct LoanChange {
    pub loan: Loan,
    pub expected_version: u64,
}

/// Everything one ledger operation writes
///
/// A change set is applied completely or not at all. Each balance change must
/// be matched by a ledger entry whose post-transaction balance equals the new
/// balance, and every entry must belong to an account whose balance changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Business time of the operation, recorded as the accounts' `updated_at`
    pub at: DateTime<Utc>,
    pub balances: Vec<BalanceChange>,
    /// Entries in the order they should be sequenced
    pub entries: Vec<NewTransaction>,
    pub loan: Option<LoanChange>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new(at: DateTime<Utc>) -> Self {
        ChangeSet {
            at,
            balances: Vec::new(),
            entries: Vec::new(),
            loan: None,
        }
    }

    /// Add a balance change and the entry that records it
    pub fn post(mut self, account: &Account, entry: NewTransaction) -> Self {
        self.balances.push(BalanceChange {
            account_id: account.account_id.clone(),
            expected_version: account.version,
            new_balance: entry.post_transaction_balance,
        });
        self.entries.push(entry);
        self
    }

    /// Attach a loan update
    pub fn with_loan(mut self, loan: Loan, expected_version: u64) -> Self {
        self.loan = Some(LoanChange {
            loan,
            expected_version,
        });
        self
    }
}

/// Account storage
pub trait AccountRepository: Send + Sync {
    /// Look up a live account
    fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError>;

    /// All live accounts of a client, original account first
    fn find_accounts_by_client(&self, client_id: &ClientId) -> Result<Vec<Account>, LedgerError>;

    /// Insert a new account or update an existing account's metadata
    ///
    /// # Errors
    ///
    /// - `Conflict` if the stored version differs from `account.version`
    /// - `InvalidRequest` if the balance of an existing account would change
    fn save_account(&self, account: Account) -> Result<Account, LedgerError>;

    /// Remove an account; its ledger entries are retained
    ///
    /// # Errors
    ///
    /// - `NotFound` if the account is missing or already deleted
    /// - `Conflict` if the stored version differs from `expected_version`
    /// - `InvalidRequest` if the account still holds money
    fn delete_account(
        &self,
        account_id: &AccountId,
        expected_version: u64,
    ) -> Result<(), LedgerError>;
}

/// Ledger storage
pub trait LedgerRepository: Send + Sync {
    /// Atomically apply balance changes, append entries and update a loan
    ///
    /// # Returns
    ///
    /// The committed entries, stamped with their sequence numbers, in input order
    ///
    /// # Errors
    ///
    /// - `NotFound` if an account or the loan does not exist
    /// - `Conflict` if any expected version is stale
    /// - `InsufficientFunds` if a new balance is negative
    /// - `InvalidRequest` if entries and balance changes disagree
    fn commit(&self, changes: ChangeSet) -> Result<Vec<Transaction>, LedgerError>;

    /// One page of an account's entries, ordered by timestamp then sequence
    fn find_entries_by_account(
        &self,
        account_id: &AccountId,
        page: PageRequest,
    ) -> Result<Page<Transaction>, LedgerError>;

    /// Look up a single entry
    fn find_entry(&self, transaction_id: &TransactionId)
        -> Result<Option<Transaction>, LedgerError>;
}

/// Loan storage
///
/// Loan state changes go through [`LedgerRepository::commit`] so that a
/// disbursement or repayment and the loan update land together.
pub trait LoanRepository: Send + Sync {
    fn insert_loan(&self, loan: Loan) -> Result<Loan, LedgerError>;

    fn find_loan(&self, loan_id: &LoanId) -> Result<Option<Loan>, LedgerError>;

    /// Loans of one borrower, oldest first
    fn find_loans_by_borrower(&self, borrower: &ClientId) -> Result<Vec<Loan>, LedgerError>;

    /// Loans in one status, oldest first
    fn find_loans_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>, LedgerError>;
}

/// Read access to client records
pub trait ClientDirectory: Send + Sync {
    fn find_client_by_phone(&self, phone_number: &str) -> Result<Option<Client>, LedgerError>;

    fn find_client(&self, client_id: &ClientId) -> Result<Option<Client>, LedgerError>;
}

/// Read access to user roles
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, identifier: &ClientId) -> Result<Option<User>, LedgerError>;
}

/// Outbound notification channel
///
/// Delivery is best effort: callers log failures and carry on.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}
