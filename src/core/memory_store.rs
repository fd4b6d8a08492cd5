//! Thread-safe in-memory store for accounts, ledger entries and loans
//!
//! # Design
//!
//! Every account lives in its own slot together with its ledger partition:
//!
//! ```text
//! MemoryStore
//!     ├── accounts: DashMap<AccountId, Arc<Mutex<AccountSlot>>>
//!     │       └── AccountSlot { account, entries, closed }
//!     ├── entry_index: DashMap<TransactionId, AccountId>
//!     ├── loans: DashMap<LoanId, Arc<Mutex<Loan>>>
//!     └── sequence: AtomicU64
//! ```
//!
//! `DashMap` only hands out the `Arc` of a slot; the slot's own `Mutex` guards the
//! account and its entries. A commit locks every slot it touches in ascending
//! account id order (then the loan, if any), checks versions, and applies all
//! writes before releasing any lock. Two commits with disjoint account sets never
//! wait on each other, and two commits sharing accounts cannot deadlock.
//!
//! Deleted accounts are tombstoned: the slot stays so the ledger partition
//! survives, but the account is no longer visible.

use crate::core::traits::{AccountRepository, ChangeSet, LedgerRepository, LoanRepository};
use crate::types::{
    Account, AccountId, ClientId, LedgerError, Loan, LoanId, LoanStatus, Page, PageRequest,
    Transaction, TransactionId,
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct AccountSlot {
    account: Account,
    entries: Vec<Transaction>,
    closed: bool,
}

/// In-memory implementation of the account, ledger and loan repositories
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, Arc<Mutex<AccountSlot>>>,
    entry_index: DashMap<TransactionId, AccountId>,
    loans: DashMap<LoanId, Arc<Mutex<Loan>>>,
    sequence: AtomicU64,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, LedgerError> {
    mutex
        .lock()
        .map_err(|_| LedgerError::storage(format!("{} lock poisoned", what)))
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, account_id: &AccountId) -> Option<Arc<Mutex<AccountSlot>>> {
        self.accounts
            .get(account_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn loan_slot(&self, loan_id: &LoanId) -> Option<Arc<Mutex<Loan>>> {
        self.loans.get(loan_id).map(|entry| Arc::clone(entry.value()))
    }

    fn all_slots(&self) -> Vec<Arc<Mutex<AccountSlot>>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn loans_matching<F>(&self, predicate: F) -> Result<Vec<Loan>, LedgerError>
    where
        F: Fn(&Loan) -> bool,
    {
        let slots: Vec<_> = self
            .loans
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut loans = Vec::new();
        for slot in slots {
            let loan = lock(&slot, "loan")?;
            if predicate(&loan) {
                loans.push(loan.clone());
            }
        }
        loans.sort_by(|a, b| (a.loan_date, &a.loan_id).cmp(&(b.loan_date, &b.loan_id)));
        Ok(loans)
    }
}

impl AccountRepository for MemoryStore {
    fn find_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError> {
        let Some(slot) = self.slot(account_id) else {
            return Ok(None);
        };
        let slot = lock(&slot, "account")?;
        Ok((!slot.closed).then(|| slot.account.clone()))
    }

    fn find_accounts_by_client(&self, client_id: &ClientId) -> Result<Vec<Account>, LedgerError> {
        let mut accounts = Vec::new();
        for slot in self.all_slots() {
            let slot = lock(&slot, "account")?;
            if !slot.closed && slot.account.is_owned_by(client_id) {
                accounts.push(slot.account.clone());
            }
        }
        accounts.sort_by(|a, b| a.creation_order().cmp(&b.creation_order()));
        Ok(accounts)
    }

    fn save_account(&self, account: Account) -> Result<Account, LedgerError> {
        let Some(slot) = self.slot(&account.account_id) else {
            self.accounts.insert(
                account.account_id.clone(),
                Arc::new(Mutex::new(AccountSlot {
                    account: account.clone(),
                    entries: Vec::new(),
                    closed: false,
                })),
            );
            return Ok(account);
        };

        let mut slot = lock(&slot, "account")?;
        if slot.closed {
            return Err(LedgerError::not_found("account", &account.account_id));
        }
        if slot.account.version != account.version {
            return Err(LedgerError::conflict(
                format!("account {}", account.account_id),
                account.version,
                slot.account.version,
            ));
        }
        if slot.account.balance != account.balance {
            return Err(LedgerError::invalid_request(format!(
                "balance of account {} can only change through the ledger",
                account.account_id
            )));
        }

        let mut updated = account;
        updated.version += 1;
        slot.account = updated.clone();
        Ok(updated)
    }

    fn delete_account(
        &self,
        account_id: &AccountId,
        expected_version: u64,
    ) -> Result<(), LedgerError> {
        let slot = self
            .slot(account_id)
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        let mut slot = lock(&slot, "account")?;
        if slot.closed {
            return Err(LedgerError::not_found("account", account_id));
        }
        if slot.account.version != expected_version {
            return Err(LedgerError::conflict(
                format!("account {}", account_id),
                expected_version,
                slot.account.version,
            ));
        }
        // A tombstoned account must not take money with it
        if !slot.account.balance.is_zero() {
            return Err(LedgerError::invalid_request(format!(
                "account {} still holds {}",
                account_id, slot.account.balance
            )));
        }
        slot.closed = true;
        slot.account.version += 1;
        Ok(())
    }
}

impl LedgerRepository for MemoryStore {
    fn commit(&self, changes: ChangeSet) -> Result<Vec<Transaction>, LedgerError> {
        let ChangeSet {
            at,
            mut balances,
            entries,
            loan,
        } = changes;

        // Lock order: accounts ascending by id, then the loan
        balances.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        if balances
            .windows(2)
            .any(|pair| pair[0].account_id == pair[1].account_id)
        {
            return Err(LedgerError::invalid_request(
                "change set touches the same account twice",
            ));
        }

        let slots = balances
            .iter()
            .map(|change| {
                self.slot(&change.account_id)
                    .ok_or_else(|| LedgerError::not_found("account", &change.account_id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let loan_slot = match &loan {
            Some(change) => Some(
                self.loan_slot(&change.loan.loan_id)
                    .ok_or_else(|| LedgerError::not_found("loan", &change.loan.loan_id))?,
            ),
            None => None,
        };

        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(lock(slot, "account")?);
        }
        let mut loan_guard = match &loan_slot {
            Some(slot) => Some(lock(slot, "loan")?),
            None => None,
        };

        for (change, slot) in balances.iter().zip(guards.iter()) {
            if slot.closed {
                return Err(LedgerError::not_found("account", &change.account_id));
            }
            if slot.account.version != change.expected_version {
                return Err(LedgerError::conflict(
                    format!("account {}", change.account_id),
                    change.expected_version,
                    slot.account.version,
                ));
            }
            if change.new_balance < Decimal::ZERO {
                return Err(LedgerError::insufficient_funds(
                    &change.account_id,
                    slot.account.balance,
                    slot.account.balance - change.new_balance,
                ));
            }
            let last_entry = entries
                .iter()
                .rev()
                .find(|entry| entry.account_id == change.account_id);
            match last_entry {
                Some(entry) if entry.post_transaction_balance == change.new_balance => {}
                _ => {
                    return Err(LedgerError::invalid_request(format!(
                        "balance change of account {} has no matching ledger entry",
                        change.account_id
                    )))
                }
            }
        }
        if let (Some(change), Some(current)) = (&loan, &loan_guard) {
            if current.version != change.expected_version {
                return Err(LedgerError::conflict(
                    format!("loan {}", change.loan.loan_id),
                    change.expected_version,
                    current.version,
                ));
            }
        }

        let mut positions = Vec::with_capacity(entries.len());
        for entry in &entries {
            let position = balances
                .binary_search_by(|change| change.account_id.cmp(&entry.account_id))
                .map_err(|_| {
                    LedgerError::invalid_request(format!(
                        "ledger entry for account {} without a balance change",
                        entry.account_id
                    ))
                })?;
            positions.push(position);
        }

        // Validation done, nothing below can fail
        for (change, slot) in balances.iter().zip(guards.iter_mut()) {
            slot.account.balance = change.new_balance;
            slot.account.version += 1;
            slot.account.updated_at = at;
        }

        let mut committed = Vec::with_capacity(entries.len());
        for (draft, position) in entries.into_iter().zip(positions) {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let entry = draft.commit(sequence);
            self.entry_index
                .insert(entry.transaction_id.clone(), entry.account_id.clone());
            guards[position].entries.push(entry.clone());
            committed.push(entry);
        }

        if let (Some(change), Some(current)) = (loan, loan_guard.as_mut()) {
            let mut updated = change.loan;
            updated.version = change.expected_version + 1;
            **current = updated;
        }

        Ok(committed)
    }

    fn find_entries_by_account(
        &self,
        account_id: &AccountId,
        page: PageRequest,
    ) -> Result<Page<Transaction>, LedgerError> {
        let slot = self
            .slot(account_id)
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        let mut entries = lock(&slot, "account")?.entries.clone();
        entries.sort_by_key(Transaction::ledger_order);
        Ok(Page::from_ordered(entries, page))
    }

    fn find_entry(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        let Some(account_id) = self
            .entry_index
            .get(transaction_id)
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };
        let Some(slot) = self.slot(&account_id) else {
            return Ok(None);
        };
        let slot = lock(&slot, "account")?;
        Ok(slot
            .entries
            .iter()
            .find(|entry| &entry.transaction_id == transaction_id)
            .cloned())
    }
}

impl LoanRepository for MemoryStore {
    fn insert_loan(&self, loan: Loan) -> Result<Loan, LedgerError> {
        if self.loans.contains_key(&loan.loan_id) {
            return Err(LedgerError::invalid_request(format!(
                "loan {} already exists",
                loan.loan_id
            )));
        }
        self.loans
            .insert(loan.loan_id.clone(), Arc::new(Mutex::new(loan.clone())));
        Ok(loan)
    }

    fn find_loan(&self, loan_id: &LoanId) -> Result<Option<Loan>, LedgerError> {
        match self.loan_slot(loan_id) {
            Some(slot) => Ok(Some(lock(&slot, "loan")?.clone())),
            None => Ok(None),
        }
    }

    fn find_loans_by_borrower(&self, borrower: &ClientId) -> Result<Vec<Loan>, LedgerError> {
        self.loans_matching(|loan| &loan.borrower == borrower)
    }

    fn find_loans_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>, LedgerError> {
        self.loans_matching(|loan| loan.status == status)
    }
}
