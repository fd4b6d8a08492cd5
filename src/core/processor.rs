//! Journal command processor
//!
//! Applies parsed journal [`Command`]s to a [`Ledger`]. Journals name accounts
//! and loans by local keys; the processor remembers which generated identifier
//! each key stands for.
//!
//! # Thread Safety
//!
//! The key maps are `DashMap`s and the ledger is thread-safe, so one processor is
//! shared by every worker of the async strategy. Rows that touch the same
//! accounts must still be applied in order by the caller.

use crate::core::ledger::Ledger;
use crate::core::registration::NewClient;
use crate::core::traits::{AccountRepository, LedgerRepository};
use crate::types::{
    Account, AccountId, Command, LedgerError, LoanId, PageRequest, Transaction,
    DEFAULT_MAX_PAGE_SIZE,
};
use dashmap::DashMap;
use tracing::debug;

/// Final state of one journal account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub key: String,
    pub account: Account,
}

/// One ledger entry of a journal account
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub key: String,
    /// Position of the entry in the account's ledger, starting at 1
    pub entry: usize,
    pub transaction: Transaction,
}

pub struct CommandProcessor {
    ledger: Ledger,
    accounts: DashMap<String, AccountId>,
    loans: DashMap<String, LoanId>,
}

impl CommandProcessor {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            accounts: DashMap::new(),
            loans: DashMap::new(),
        }
    }

    /// Apply a single command
    ///
    /// # Errors
    ///
    /// Whatever the underlying ledger operation rejects, plus `NotFound` for an
    /// unknown key and `InvalidRequest` for a key that is already taken
    pub fn apply(&self, command: &Command) -> Result<(), LedgerError> {
        match command {
            Command::Register {
                card,
                phone,
                account_key,
                role,
            } => {
                self.claimable(account_key)?;
                let (_, account) = self
                    .ledger
                    .registrar
                    .register(NewClient::anonymous(card.as_str(), phone.as_str()), *role)?;
                self.accounts.insert(account_key.clone(), account.account_id);
            }
            Command::Open {
                card,
                account_key,
                account_type,
            } => {
                self.claimable(account_key)?;
                let account = self.ledger.accounts.create_account(
                    card,
                    account_key,
                    &account_type.to_string(),
                )?;
                self.accounts.insert(account_key.clone(), account.account_id);
            }
            Command::Deposit {
                card,
                account_key,
                amount,
            } => {
                self.ledger
                    .engine
                    .deposit(card, &self.account(account_key)?, *amount)?;
            }
            Command::Transfer {
                card,
                from_key,
                to_key,
                amount,
            } => {
                self.ledger.engine.internal_transfer(
                    card,
                    &self.account(from_key)?,
                    &self.account(to_key)?,
                    *amount,
                )?;
            }
            Command::Send {
                card,
                account_key,
                phone,
                amount,
            } => {
                self.ledger.engine.transfer_money(
                    card,
                    &self.account(account_key)?,
                    phone,
                    *amount,
                )?;
            }
            Command::RequestLoan {
                card,
                loan_key,
                amount,
            } => {
                if self.loans.contains_key(loan_key) {
                    return Err(LedgerError::invalid_request(format!(
                        "loan key '{}' is already in use",
                        loan_key
                    )));
                }
                let loan = self.ledger.loans.request_loan(card.as_str(), *amount)?;
                self.loans.insert(loan_key.clone(), loan.loan_id);
            }
            Command::ApproveLoan { admin, loan_key } => {
                self.ledger
                    .loans
                    .approve_loan(&self.loan(loan_key)?, admin.as_str())?;
            }
            Command::DenyLoan { admin, loan_key } => {
                self.ledger
                    .loans
                    .deny_loan(&self.loan(loan_key)?, admin.as_str())?;
            }
            Command::RepayLoan { loan_key, amount } => {
                self.ledger
                    .loans
                    .pay_down_loan(&self.loan(loan_key)?, *amount)?;
            }
            Command::Close { card, account_key } => {
                self.ledger
                    .accounts
                    .delete_account(card, &self.account(account_key)?)?;
            }
        }
        debug!(command = command.name(), "journal row applied");
        Ok(())
    }

    /// Every open journal account, sorted by key
    pub fn accounts_snapshot(&self) -> Result<Vec<AccountRow>, LedgerError> {
        let mut rows = Vec::new();
        for (key, account_id) in self.sorted_keys() {
            // Closed accounts are no longer visible
            if let Some(account) = self.ledger.store.find_account(&account_id)? {
                rows.push(AccountRow { key, account });
            }
        }
        Ok(rows)
    }

    /// Every ledger entry of every journal account, closed ones included
    ///
    /// Rows are grouped by account key and ordered within an account.
    pub fn ledger_snapshot(&self) -> Result<Vec<LedgerRow>, LedgerError> {
        let mut rows = Vec::new();
        for (key, account_id) in self.sorted_keys() {
            let mut page_number = 0;
            let mut entry = 0;
            loop {
                let page = self.ledger.store.find_entries_by_account(
                    &account_id,
                    PageRequest::new(page_number, DEFAULT_MAX_PAGE_SIZE),
                )?;
                let has_next = page.has_next();
                for transaction in page.items {
                    entry += 1;
                    rows.push(LedgerRow {
                        key: key.clone(),
                        entry,
                        transaction,
                    });
                }
                if !has_next {
                    break;
                }
                page_number += 1;
            }
        }
        Ok(rows)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn sorted_keys(&self) -> Vec<(String, AccountId)> {
        let mut keys: Vec<(String, AccountId)> = self
            .accounts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        keys.sort();
        keys
    }

    fn claimable(&self, account_key: &str) -> Result<(), LedgerError> {
        if self.accounts.contains_key(account_key) {
            return Err(LedgerError::invalid_request(format!(
                "account key '{}' is already in use",
                account_key
            )));
        }
        Ok(())
    }

    fn account(&self, key: &str) -> Result<AccountId, LedgerError> {
        self.accounts
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::not_found("account key", key))
    }

    fn loan(&self, key: &str) -> Result<LoanId, LedgerError> {
        self.loans
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::not_found("loan key", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::SequentialIds;
    use crate::types::{AccountStatus, AccountType, ClientId, ErrorKind, Role};
    use rstest::{fixture, rstest};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const ALICE: &str = "4520111122223333";
    const BOB: &str = "4520444455556666";
    const ADMIN: &str = "9000000000000001";

    fn card(value: &str) -> ClientId {
        ClientId::new(value)
    }

    fn deposit(key: &str, card_number: &str, amount: Decimal) -> Command {
        Command::Deposit {
            card: card(card_number),
            account_key: key.to_string(),
            amount,
        }
    }

    #[fixture]
    fn processor() -> CommandProcessor {
        let ledger = Ledger::builder().ids(Arc::new(SequentialIds::new())).build();
        let processor = CommandProcessor::new(ledger);
        for (card_number, phone, key, role) in [
            (ALICE, "4165550101", "alice", Role::Client),
            (BOB, "4165550102", "bob", Role::Client),
            (ADMIN, "4165550199", "admin", Role::Admin),
        ] {
            processor
                .apply(&Command::Register {
                    card: card(card_number),
                    phone: phone.to_string(),
                    account_key: key.to_string(),
                    role,
                })
                .unwrap();
        }
        processor
    }

    fn balance(processor: &CommandProcessor, key: &str) -> Decimal {
        processor
            .accounts_snapshot()
            .unwrap()
            .into_iter()
            .find(|row| row.key == key)
            .map(|row| row.account.balance)
            .unwrap()
    }

    #[rstest]
    fn test_keys_resolve_to_generated_accounts(processor: CommandProcessor) {
        processor
            .apply(&Command::Open {
                card: card(ALICE),
                account_key: "alice-sav".to_string(),
                account_type: AccountType::Savings,
            })
            .unwrap();
        processor.apply(&deposit("alice-sav", ALICE, dec!(1000))).unwrap();
        processor
            .apply(&Command::Transfer {
                card: card(ALICE),
                from_key: "alice-sav".to_string(),
                to_key: "alice".to_string(),
                amount: dec!(100),
            })
            .unwrap();

        let rows = processor.accounts_snapshot().unwrap();
        let keys: Vec<&str> = rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["admin", "alice", "alice-sav", "bob"]);
        assert_eq!(balance(&processor, "alice-sav"), dec!(898.50));
        assert_eq!(balance(&processor, "alice"), dec!(100));
    }

    #[rstest]
    fn test_duplicate_account_key(processor: CommandProcessor) {
        let error = processor
            .apply(&Command::Open {
                card: card(BOB),
                account_key: "alice".to_string(),
                account_type: AccountType::Chequing,
            })
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
    }

    #[rstest]
    fn test_unknown_keys(processor: CommandProcessor) {
        let account = processor.apply(&deposit("nobody", ALICE, dec!(1))).unwrap_err();
        let loan = processor
            .apply(&Command::RepayLoan {
                loan_key: "nothing".to_string(),
                amount: dec!(1),
            })
            .unwrap_err();
        assert_eq!(account.kind(), ErrorKind::NotFound);
        assert_eq!(loan.kind(), ErrorKind::NotFound);
    }

    #[rstest]
    fn test_loan_rows(processor: CommandProcessor) {
        processor
            .apply(&Command::RequestLoan {
                card: card(BOB),
                loan_key: "car".to_string(),
                amount: dec!(500),
            })
            .unwrap();
        processor
            .apply(&Command::ApproveLoan {
                admin: card(ADMIN),
                loan_key: "car".to_string(),
            })
            .unwrap();
        processor
            .apply(&Command::RepayLoan {
                loan_key: "car".to_string(),
                amount: dec!(120),
            })
            .unwrap();

        assert_eq!(balance(&processor, "bob"), dec!(380));
        let loans = processor.ledger().loans.loans_for_user(BOB).unwrap();
        assert_eq!(loans[0].amount_outstanding, dec!(380));
    }

    #[rstest]
    fn test_send_and_close(processor: CommandProcessor) {
        processor
            .apply(&Command::Open {
                card: card(BOB),
                account_key: "bob-2".to_string(),
                account_type: AccountType::Savings,
            })
            .unwrap();
        processor.apply(&deposit("alice", ALICE, dec!(30))).unwrap();
        processor
            .apply(&Command::Send {
                card: card(ALICE),
                account_key: "alice".to_string(),
                phone: "4165550102".to_string(),
                amount: dec!(30),
            })
            .unwrap();
        processor
            .apply(&Command::Close {
                card: card(BOB),
                account_key: "bob-2".to_string(),
            })
            .unwrap();

        let rows = processor.accounts_snapshot().unwrap();
        assert!(rows.iter().all(|row| row.key != "bob-2"));
        assert!(rows.iter().all(|row| row.account.status == AccountStatus::Active));
        assert_eq!(balance(&processor, "bob"), dec!(30));
    }

    #[rstest]
    fn test_ledger_snapshot_numbers_entries_per_account(processor: CommandProcessor) {
        processor.apply(&deposit("alice", ALICE, dec!(10))).unwrap();
        processor.apply(&deposit("bob", BOB, dec!(5))).unwrap();
        processor.apply(&deposit("alice", ALICE, dec!(2))).unwrap();

        let rows = processor.ledger_snapshot().unwrap();
        let summary: Vec<(&str, usize, Decimal)> = rows
            .iter()
            .map(|row| (row.key.as_str(), row.entry, row.transaction.post_transaction_balance))
            .collect();
        assert_eq!(
            summary,
            vec![("alice", 1, dec!(10)), ("alice", 2, dec!(12)), ("bob", 1, dec!(5))]
        );
    }
}
