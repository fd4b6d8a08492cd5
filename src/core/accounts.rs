//! Account administration
//!
//! Opening, renaming, (de)activating and deleting accounts. None of these touch
//! balances; money only moves through the [`TransactionEngine`].
//!
//! A client always keeps at least one account, and never loses the original one
//! (the earliest opened) since incoming phone transfers are routed to it.

use crate::core::engine::TransactionEngine;
use crate::core::validation;
use crate::types::{Account, AccountId, AccountStatus, AccountType, ClientId, LedgerError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Name given to the account opened at registration
pub const DEFAULT_ACCOUNT_NAME: &str = "Chequing";

#[derive(Clone)]
pub struct AccountService {
    engine: Arc<TransactionEngine>,
}

impl AccountService {
    pub fn new(engine: Arc<TransactionEngine>) -> Self {
        Self { engine }
    }

    /// Open the default Chequing account of a newly registered client
    pub fn open_default_account(&self, client_id: &ClientId) -> Result<Account, LedgerError> {
        self.open(client_id, DEFAULT_ACCOUNT_NAME, AccountType::Chequing)
    }

    /// Open an additional account
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty name
    /// - `InvalidAccountType` unless the type is Chequing or Savings
    pub fn create_account(
        &self,
        client_id: &ClientId,
        account_name: &str,
        account_type: &str,
    ) -> Result<Account, LedgerError> {
        validation::not_empty("account name", account_name)?;
        let account_type = validation::valid_account_type(account_type)?;
        self.open(client_id, account_name.trim(), account_type)
    }

    fn open(
        &self,
        client_id: &ClientId,
        account_name: &str,
        account_type: AccountType,
    ) -> Result<Account, LedgerError> {
        let account = Account::new(
            self.engine.ids().account_id(),
            client_id.clone(),
            account_name,
            account_type,
            self.engine.now(),
        );
        let account = self.engine.accounts().save_account(account)?;
        info!(
            client = %client_id,
            account = %account.account_id,
            account_type = %account.account_type,
            "account opened"
        );
        Ok(account)
    }

    /// Change an account's display name
    pub fn rename_account(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
        new_name: &str,
    ) -> Result<Account, LedgerError> {
        validation::not_empty("account name", new_name)?;
        self.modify(client_id, account_id, "rename account", |account| {
            account.account_name = new_name.trim().to_string();
        })
    }

    /// Activate or deactivate an account
    pub fn set_status(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        self.modify(client_id, account_id, "set account status", |account| {
            account.status = status;
        })
    }

    fn modify<F>(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
        operation: &str,
        change: F,
    ) -> Result<Account, LedgerError>
    where
        F: Fn(&mut Account),
    {
        self.engine.retry_policy().run(operation, || {
            let mut account = self.engine.load_account(account_id)?;
            validation::account_ownership(&account, client_id, "Target")?;
            change(&mut account);
            account.updated_at = self.engine.now();
            self.engine.accounts().save_account(account)
        })
    }

    /// Delete an account
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Forbidden` for a missing or foreign account
    /// - `InvalidRequest` for the client's original account, its last remaining
    ///   account, or an account that still holds money
    pub fn delete_account(
        &self,
        client_id: &ClientId,
        account_id: &AccountId,
    ) -> Result<(), LedgerError> {
        // The store re-checks version and balance under the account lock, so a
        // deposit landing between the checks below and the delete forces a retry
        self.engine.retry_policy().run("delete account", || {
            let account = self.engine.load_account(account_id)?;
            validation::account_ownership(&account, client_id, "Target")?;

            let owned = self.engine.accounts().find_accounts_by_client(client_id)?;
            if owned.len() <= 1 {
                return Err(LedgerError::invalid_request(
                    "cannot delete the only remaining account",
                ));
            }
            if owned
                .first()
                .is_some_and(|original| original.account_id == account.account_id)
            {
                return Err(LedgerError::invalid_request(
                    "cannot delete the original account",
                ));
            }
            if account.balance != Decimal::ZERO {
                return Err(LedgerError::invalid_request(format!(
                    "account {} still holds {}",
                    account_id, account.balance
                )));
            }

            self.engine
                .accounts()
                .delete_account(account_id, account.version)
        })?;
        info!(client = %client_id, account = %account_id, "account deleted");
        Ok(())
    }

    /// A client's accounts, original account first
    pub fn accounts_for_client(&self, client_id: &ClientId) -> Result<Vec<Account>, LedgerError> {
        self.engine.accounts().find_accounts_by_client(client_id)
    }
}
